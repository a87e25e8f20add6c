//! High-level AIS decoder and encoder

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::{debug, trace};

use crate::constants::MULTIPART_TIMEOUT;
use crate::core::Channel;
use crate::encoding::SixBitDecoder;
use crate::error::Result;
use crate::message::{AisMessage, PositionReport, StaticVoyageReport};
use crate::protocol::{ReassemblyStats, Reassembler};
use crate::sentence::{Sentence, SentenceEmitter, SequenceIdStrategy, Talker};

/// Stateful AIS sentence decoder
///
/// Single-sentence messages decode immediately. Parts of longer messages
/// are held until every part has arrived or the multipart timeout passes.
/// The decoder is `Sync`; one lock guards the multipart buffer table.
#[derive(Debug)]
pub struct AisDecoder {
    reassembler: Mutex<Reassembler>,
}

impl AisDecoder {
    /// Create a decoder with the default 30 second multipart timeout
    pub fn new() -> Self {
        Self::with_timeout(MULTIPART_TIMEOUT)
    }

    /// Create a decoder with a custom multipart timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        AisDecoder {
            reassembler: Mutex::new(Reassembler::new(timeout)),
        }
    }

    fn reassembler(&self) -> MutexGuard<'_, Reassembler> {
        self.reassembler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Decode one sentence line
    ///
    /// Returns `None` for malformed or unsupported input, for parts of a
    /// message still being reassembled, and for payloads too short for their
    /// type. Nothing is raised for any of these.
    pub fn decode(&self, line: &str) -> Option<AisMessage> {
        self.decode_at(line, Instant::now())
    }

    /// Decode one sentence line as if received at `now`
    pub fn decode_at(&self, line: &str, now: Instant) -> Option<AisMessage> {
        match self.try_decode_at(line, now) {
            Ok(message) => message,
            Err(e) => {
                debug!("dropping sentence {:?}: {}", line.trim(), e);
                None
            }
        }
    }

    /// Decode one sentence line, reporting why it was dropped
    ///
    /// `Ok(None)` means the sentence was accepted as a part of a message that
    /// is not complete yet.
    pub fn try_decode(&self, line: &str) -> Result<Option<AisMessage>> {
        self.try_decode_at(line, Instant::now())
    }

    fn try_decode_at(&self, line: &str, now: Instant) -> Result<Option<AisMessage>> {
        // Every sentence sweeps, so orphans expire under single-part traffic too
        self.reassembler().evict_expired(now);
        let sentence = Sentence::parse(line)?;

        let (payload, fill_bits, channel) = if sentence.is_single_part() {
            (sentence.payload, sentence.fill_bits, sentence.channel)
        } else {
            match self.reassembler().push(&sentence, now) {
                Some(assembled) => (assembled.payload, assembled.fill_bits, assembled.channel),
                None => return Ok(None),
            }
        };

        let bits = SixBitDecoder::decode(&payload, fill_bits)?;
        let message = AisMessage::from_bits(&bits, Some(channel))?;
        trace!("decoded {}", message);
        Ok(Some(message))
    }

    /// Decode every line, keeping the completed messages
    pub fn decode_all<'a, I>(&self, lines: I) -> Vec<AisMessage>
    where
        I: IntoIterator<Item = &'a str>,
    {
        lines
            .into_iter()
            .filter_map(|line| self.decode(line))
            .collect()
    }

    /// Evict incomplete multipart buffers older than the timeout
    pub fn evict_expired(&self) -> usize {
        self.evict_expired_at(Instant::now())
    }

    /// Evict incomplete multipart buffers that have expired by `now`
    pub fn evict_expired_at(&self, now: Instant) -> usize {
        self.reassembler().evict_expired(now)
    }

    /// Number of multipart messages waiting for parts
    ///
    /// Expired buffers are swept first and never counted.
    pub fn pending_count(&self) -> usize {
        let mut reassembler = self.reassembler();
        reassembler.evict_expired(Instant::now());
        reassembler.pending_count()
    }

    /// Reassembly counters, taken after sweeping expired buffers
    pub fn stats(&self) -> ReassemblyStats {
        let mut reassembler = self.reassembler();
        reassembler.evict_expired(Instant::now());
        reassembler.stats()
    }

    /// Multipart timeout in use
    pub fn timeout(&self) -> Duration {
        self.reassembler().timeout()
    }

    /// Drop every pending multipart buffer
    pub fn reset(&self) {
        self.reassembler().clear();
    }
}

impl Default for AisDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Start a thread that evicts expired multipart buffers every `period`
///
/// The thread holds only a weak reference and exits after the decoder is
/// dropped.
pub fn spawn_sweeper(decoder: &Arc<AisDecoder>, period: Duration) -> JoinHandle<()> {
    let weak = Arc::downgrade(decoder);
    std::thread::spawn(move || loop {
        std::thread::sleep(period);
        match weak.upgrade() {
            Some(decoder) => {
                let evicted = decoder.evict_expired();
                if evicted > 0 {
                    debug!("sweeper evicted {} multipart buffers", evicted);
                }
            }
            None => break,
        }
    })
}

/// Builder for [`AisDecoder`]
pub struct DecoderBuilder {
    timeout: Duration,
}

impl DecoderBuilder {
    /// Create a new decoder builder
    pub fn new() -> Self {
        DecoderBuilder {
            timeout: MULTIPART_TIMEOUT,
        }
    }

    /// Set the multipart timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the decoder
    pub fn build(self) -> AisDecoder {
        AisDecoder::with_timeout(self.timeout)
    }
}

impl Default for DecoderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// AIS sentence encoder
#[derive(Debug, Default)]
pub struct AisEncoder {
    emitter: SentenceEmitter,
    default_channel: Option<Channel>,
}

impl AisEncoder {
    /// Create an encoder writing `!AIVDM` lines with random sequence ids
    pub fn new() -> Self {
        Self::default()
    }

    fn channel_for(&self, channel: Option<Channel>) -> Channel {
        channel.or(self.default_channel).unwrap_or(Channel::A)
    }

    /// Encode a position report into sentence lines
    pub fn encode_position(&self, report: &PositionReport) -> Result<Vec<String>> {
        let bits = report.to_bits()?;
        Ok(self
            .emitter
            .emit_lines(&bits, self.channel_for(report.channel)))
    }

    /// Encode a static and voyage report into sentence lines
    pub fn encode_static_voyage(&self, report: &StaticVoyageReport) -> Result<Vec<String>> {
        let bits = report.to_bits()?;
        Ok(self
            .emitter
            .emit_lines(&bits, self.channel_for(report.channel)))
    }

    /// Encode any supported message into sentence lines
    pub fn encode(&self, message: &AisMessage) -> Result<Vec<String>> {
        match message {
            AisMessage::Position(report) => self.encode_position(report),
            AisMessage::StaticVoyage(report) => self.encode_static_voyage(report),
        }
    }
}

/// Builder for [`AisEncoder`]
pub struct EncoderBuilder {
    talker: Talker,
    strategy: SequenceIdStrategy,
    default_channel: Option<Channel>,
}

impl EncoderBuilder {
    /// Create a new encoder builder
    pub fn new() -> Self {
        EncoderBuilder {
            talker: Talker::Aivdm,
            strategy: SequenceIdStrategy::Random,
            default_channel: None,
        }
    }

    /// Set the sentence identifier
    pub fn with_talker(mut self, talker: Talker) -> Self {
        self.talker = talker;
        self
    }

    /// Set how multi-sentence messages choose their sequence id
    pub fn with_sequence_ids(mut self, strategy: SequenceIdStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Channel used for records that carry none (defaults to A)
    pub fn with_default_channel(mut self, channel: Channel) -> Self {
        self.default_channel = Some(channel);
        self
    }

    /// Build the encoder
    pub fn build(self) -> AisEncoder {
        AisEncoder {
            emitter: SentenceEmitter::new(self.talker, self.strategy),
            default_channel: self.default_channel,
        }
    }
}

impl Default for EncoderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode a position report with a default encoder
pub fn encode_position_report(report: &PositionReport) -> Result<Vec<String>> {
    AisEncoder::new().encode_position(report)
}

/// Encode a static and voyage report with a default encoder
pub fn encode_static_voyage_report(report: &StaticVoyageReport) -> Result<Vec<String>> {
    AisEncoder::new().encode_static_voyage(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AisError;

    const POSITION: &str = "!AIVDM,1,1,,A,15M67FC000G?ufbE`FepT@3n00Sa,0*5F";

    fn static_report() -> StaticVoyageReport {
        StaticVoyageReport {
            repeat: Some(0),
            mmsi: 123456789,
            ais_version: Some(0),
            imo: Some(987654321),
            callsign: Some("CALL123".to_string()),
            name: Some("LONGSHIPNAMEEXCEEDIN".to_string()),
            ship_type: Some(70),
            dimension_to_bow: Some(50),
            dimension_to_stern: Some(50),
            dimension_to_port: Some(15),
            dimension_to_starboard: Some(15),
            epfd: Some(1),
            eta_month: Some(12),
            eta_day: Some(31),
            eta_hour: Some(23),
            eta_minute: Some(59),
            draught: Some(7.5),
            destination: Some("DESTINATION20CHARS!!".to_string()),
            dte_available: Some(true),
            channel: Some(Channel::A),
        }
    }

    #[test]
    fn test_decoder_builder() {
        let decoder = DecoderBuilder::new()
            .with_timeout(Duration::from_secs(5))
            .build();
        assert_eq!(decoder.timeout(), Duration::from_secs(5));
        assert_eq!(AisDecoder::new().timeout(), MULTIPART_TIMEOUT);
    }

    #[test]
    fn test_decode_single_sentence() {
        let decoder = AisDecoder::new();
        match decoder.decode(POSITION) {
            Some(AisMessage::Position(report)) => {
                assert_eq!(report.message_type, 1);
                assert_eq!(report.mmsi, 366053209);
                assert_eq!(report.nav_status, Some(3));
                assert_eq!(report.heading, Some(1));
                assert_eq!(report.timestamp, Some(59));
                assert!((report.lon.unwrap() + 122.341618).abs() < 0.0001);
                assert!((report.lat.unwrap() - 37.802118).abs() < 0.0001);
                assert!((report.cog.unwrap() - 219.3).abs() < 0.01);
                assert_eq!(report.channel, Some(Channel::A));
            }
            other => panic!("expected position report, got {:?}", other),
        }
        assert_eq!(decoder.pending_count(), 0);
    }

    #[test]
    fn test_decode_drops_garbage_silently() {
        let decoder = AisDecoder::new();
        assert!(decoder.decode("").is_none());
        assert!(decoder.decode("hello world").is_none());
        assert!(decoder.decode("!AIVDM,1,1,,A,15M67FC000G?ufbE`FepT@3n00Sa,0*5E").is_none());
        assert!(matches!(
            decoder.try_decode("!AIVDM,1,1,,A,15M67FC000G?ufbE`FepT@3n00Sa,0*5E"),
            Err(AisError::ChecksumMismatch(_))
        ));
    }

    #[test]
    fn test_static_multipart_roundtrip() -> Result<()> {
        let encoder = AisEncoder::new();
        let decoder = AisDecoder::new();
        let report = static_report();

        let lines = encoder.encode_static_voyage(&report)?;
        assert_eq!(lines.len(), 2);

        assert!(decoder.decode(&lines[0]).is_none());
        assert_eq!(decoder.pending_count(), 1);
        match decoder.decode(&lines[1]) {
            Some(AisMessage::StaticVoyage(decoded)) => assert_eq!(decoded, report),
            other => panic!("expected static report, got {:?}", other),
        }
        assert_eq!(decoder.pending_count(), 0);
        Ok(())
    }

    #[test]
    fn test_pending_parts_expire() -> Result<()> {
        let decoder = AisDecoder::new();
        let lines = AisEncoder::new().encode_static_voyage(&static_report())?;
        let start = Instant::now();

        assert!(decoder.decode_at(&lines[0], start).is_none());
        assert_eq!(decoder.evict_expired_at(start + Duration::from_secs(10)), 0);
        assert_eq!(decoder.evict_expired_at(start + Duration::from_secs(30)), 1);
        assert_eq!(decoder.pending_count(), 0);
        assert_eq!(decoder.stats().expired, 1);

        // The orphaned second part starts a buffer of its own
        assert!(decoder
            .decode_at(&lines[1], start + Duration::from_secs(31))
            .is_none());
        assert_eq!(decoder.pending_count(), 1);
        Ok(())
    }

    #[test]
    fn test_single_part_traffic_sweeps_orphans() -> Result<()> {
        let decoder = AisDecoder::new();
        let lines = AisEncoder::new().encode_static_voyage(&static_report())?;
        let start = Instant::now();

        assert!(decoder.decode_at(&lines[0], start).is_none());
        assert!(decoder
            .decode_at(POSITION, start + Duration::from_secs(29))
            .is_some());
        assert_eq!(decoder.reassembler().pending_count(), 1);

        assert!(decoder
            .decode_at(POSITION, start + Duration::from_secs(30))
            .is_some());
        assert_eq!(decoder.reassembler().pending_count(), 0);
        assert_eq!(decoder.stats().expired, 1);
        Ok(())
    }

    #[test]
    fn test_pending_count_ignores_expired() {
        let decoder = DecoderBuilder::new()
            .with_timeout(Duration::from_millis(1))
            .build();
        let lines = encode_static_voyage_report(&static_report()).unwrap();
        decoder.decode(&lines[0]);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(decoder.pending_count(), 0);
        assert_eq!(decoder.stats().expired, 1);
    }

    #[test]
    fn test_decode_aivdo_sentence() -> Result<()> {
        let encoder = EncoderBuilder::new().with_talker(Talker::Aivdo).build();
        let report = PositionReport {
            lat: Some(59.3293),
            lon: Some(18.0686),
            heading: Some(270),
            ..PositionReport::new(265547250)
        };
        let lines = encoder.encode_position(&report)?;
        assert_eq!(Sentence::parse(&lines[0])?.talker, Talker::Aivdo);

        match AisDecoder::new().decode(&lines[0]) {
            Some(AisMessage::Position(decoded)) => {
                assert_eq!(decoded.mmsi, 265547250);
                assert_eq!(decoded.heading, Some(270));
                assert!((decoded.lat.unwrap() - 59.3293).abs() < 0.0001);
                assert!((decoded.lon.unwrap() - 18.0686).abs() < 0.0001);
            }
            other => panic!("expected position report, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_encoder_builder_options() -> Result<()> {
        let encoder = EncoderBuilder::new()
            .with_talker(Talker::Aivdo)
            .with_default_channel(Channel::B)
            .with_sequence_ids(SequenceIdStrategy::Rotating)
            .build();

        let lines = encoder.encode_position(&PositionReport::new(1))?;
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("!AIVDO,1,1,,B,"));

        let lines = encoder.encode(&AisMessage::from(static_report()))?;
        // Record channel wins over the default
        assert!(lines[0].starts_with("!AIVDO,2,1,1,A,"));
        Ok(())
    }

    #[test]
    fn test_encode_contract_violation() {
        let report = PositionReport {
            rate_of_turn: Some(200),
            ..PositionReport::new(1)
        };
        assert!(matches!(
            encode_position_report(&report),
            Err(AisError::FieldOutOfRange(_))
        ));
    }

    #[test]
    fn test_sweeper_exits_with_decoder() {
        let decoder = Arc::new(
            DecoderBuilder::new()
                .with_timeout(Duration::from_millis(1))
                .build(),
        );
        let lines = encode_static_voyage_report(&static_report()).unwrap();
        decoder.decode(&lines[0]);
        // Read the table directly; pending_count() would sweep on its own
        assert_eq!(decoder.reassembler().pending_count(), 1);

        let handle = spawn_sweeper(&decoder, Duration::from_millis(5));
        let deadline = Instant::now() + Duration::from_secs(5);
        while decoder.reassembler().pending_count() > 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(decoder.reassembler().pending_count(), 0);
        assert_eq!(decoder.stats().expired, 1);

        drop(decoder);
        handle.join().unwrap();
    }
}
