//! NMEA 0183 `!AIVDM`/`!AIVDO` sentence grammar, checksum and emission

use std::sync::atomic::{AtomicU8, Ordering};

use rand::Rng;

use crate::constants::{MAX_PAYLOAD_CHARS, MAX_SEQUENCE_ID, MIN_SEQUENCE_ID};
use crate::core::{BitBuffer, Channel};
use crate::encoding::SixBitEncoder;
use crate::error::{AisError, Result};

/// Sentence identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Talker {
    /// Reports received from other vessels
    #[default]
    Aivdm,
    /// Own-ship reports
    Aivdo,
}

impl Talker {
    /// Identifier as written after `!`
    pub fn as_str(&self) -> &'static str {
        match self {
            Talker::Aivdm => "AIVDM",
            Talker::Aivdo => "AIVDO",
        }
    }
}

impl std::fmt::Display for Talker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// XOR of every byte in `body`
///
/// `body` is the text strictly between `!` and `*`.
pub fn checksum(body: &str) -> u8 {
    body.bytes().fold(0u8, |acc, b| acc ^ b)
}

/// Check the trailing checksum of a full sentence
///
/// The two hex digits after `*` are compared case-insensitively.
pub fn verify_checksum(line: &str) -> Result<()> {
    let line = line.trim();
    let body_start = line
        .strip_prefix('!')
        .ok_or_else(|| AisError::invalid_sentence("Sentence must start with '!'"))?;
    let star = body_start
        .find('*')
        .ok_or_else(|| AisError::invalid_sentence("Missing '*' checksum delimiter"))?;
    let body = &body_start[..star];
    let digits = body_start
        .get(star + 1..star + 3)
        .filter(|digits| digits.bytes().all(|b| b.is_ascii_hexdigit()))
        .ok_or_else(|| AisError::invalid_sentence("Checksum needs two hex digits"))?;
    let expected = u8::from_str_radix(digits, 16)
        .map_err(|_| AisError::invalid_sentence(format!("Bad checksum digits {:?}", digits)))?;

    let calculated = checksum(body);
    if calculated != expected {
        return Err(AisError::checksum_mismatch(format!(
            "expected {:02X}, calculated {:02X}",
            expected, calculated
        )));
    }
    Ok(())
}

fn parse_number(field: &str, name: &str) -> Result<u8> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AisError::invalid_sentence(format!(
            "{} {:?} is not a number",
            name, field
        )));
    }
    field
        .parse::<u8>()
        .map_err(|_| AisError::invalid_sentence(format!("{} {:?} is too large", name, field)))
}

/// A single parsed AIS sentence
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sentence {
    /// `AIVDM` or `AIVDO`
    pub talker: Talker,
    /// Declared number of sentences in the message
    pub total: u8,
    /// 1-based index of this sentence
    pub part: u8,
    /// Raw sequence id, possibly empty
    pub sequence_id: String,
    /// Radio channel
    pub channel: Channel,
    /// 6-bit armored payload fragment
    pub payload: String,
    /// Fill bits appended to this fragment
    pub fill_bits: u8,
}

impl Sentence {
    /// Parse and checksum-verify one sentence
    ///
    /// Expects `!(AIVDM|AIVDO),<total>,<part>,<seq>,<A|B>,<payload>,<fill>*<hh>`.
    /// Surrounding whitespace is ignored.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let rest = line
            .strip_prefix('!')
            .ok_or_else(|| AisError::invalid_sentence("Sentence must start with '!'"))?;
        let star = rest
            .find('*')
            .ok_or_else(|| AisError::invalid_sentence("Missing '*' checksum delimiter"))?;

        let fields: Vec<&str> = rest[..star].split(',').collect();
        if fields.len() != 7 {
            return Err(AisError::invalid_sentence(format!(
                "Expected 7 fields, got {}",
                fields.len()
            )));
        }

        let talker = match fields[0] {
            "AIVDM" => Talker::Aivdm,
            "AIVDO" => Talker::Aivdo,
            other => {
                return Err(AisError::invalid_sentence(format!(
                    "Unsupported sentence identifier {:?}",
                    other
                )))
            }
        };
        let total = parse_number(fields[1], "total")?;
        let part = parse_number(fields[2], "part")?;
        let channel = match fields[4] {
            "A" => Channel::A,
            "B" => Channel::B,
            other => {
                return Err(AisError::invalid_sentence(format!(
                    "Channel {:?} is not A or B",
                    other
                )))
            }
        };
        let fill_bits = parse_number(fields[6], "fill bits")?;

        if total == 0 || part == 0 || part > total {
            return Err(AisError::invalid_sentence(format!(
                "Part {} of {} is out of range",
                part, total
            )));
        }
        if fill_bits > 7 {
            return Err(AisError::invalid_sentence(format!(
                "Fill bits {} exceed 7",
                fill_bits
            )));
        }

        verify_checksum(line)?;

        Ok(Sentence {
            talker,
            total,
            part,
            sequence_id: fields[3].to_string(),
            channel,
            payload: fields[5].to_string(),
            fill_bits,
        })
    }

    /// Whether the message fits in this one sentence
    pub fn is_single_part(&self) -> bool {
        self.total == 1
    }

    /// Render the sentence with its checksum
    pub fn to_line(&self) -> String {
        let body = format!(
            "{},{},{},{},{},{},{}",
            self.talker, self.total, self.part, self.sequence_id, self.channel, self.payload,
            self.fill_bits
        );
        format!("!{}*{:02X}", body, checksum(&body))
    }
}

impl std::fmt::Display for Sentence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_line())
    }
}

/// How multi-sentence messages pick their shared sequence id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequenceIdStrategy {
    /// Uniformly random in 1..=9
    #[default]
    Random,
    /// Per-emitter counter cycling through 1..=9
    Rotating,
}

/// Splits an encoded bitstream into checksummed sentence lines
#[derive(Debug)]
pub struct SentenceEmitter {
    talker: Talker,
    strategy: SequenceIdStrategy,
    next_id: AtomicU8,
}

impl SentenceEmitter {
    /// Create an emitter
    pub fn new(talker: Talker, strategy: SequenceIdStrategy) -> Self {
        SentenceEmitter {
            talker,
            strategy,
            next_id: AtomicU8::new(MIN_SEQUENCE_ID),
        }
    }

    /// Talker written on every emitted line
    pub fn talker(&self) -> Talker {
        self.talker
    }

    fn next_sequence_id(&self) -> u8 {
        match self.strategy {
            SequenceIdStrategy::Random => {
                rand::thread_rng().gen_range(MIN_SEQUENCE_ID..=MAX_SEQUENCE_ID)
            }
            SequenceIdStrategy::Rotating => {
                let span = MAX_SEQUENCE_ID - MIN_SEQUENCE_ID + 1;
                self.next_id
                    .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |id| {
                        Some(MIN_SEQUENCE_ID + (id - MIN_SEQUENCE_ID + 1) % span)
                    })
                    .unwrap_or(MIN_SEQUENCE_ID)
            }
        }
    }

    /// Fill bits reported for a chunk of `chars` armored characters
    pub fn fill_bits_for(chars: usize) -> u8 {
        ((8 - (chars * 6) % 8) % 8) as u8
    }

    /// Build the sentences carrying `bits` on `channel`
    ///
    /// Payloads longer than 60 characters are split; all parts share one
    /// sequence id. A single-sentence message leaves the sequence id empty.
    pub fn emit(&self, bits: &BitBuffer, channel: Channel) -> Vec<Sentence> {
        let payload = SixBitEncoder::encode(bits);
        let chunks: Vec<&[u8]> = payload.as_bytes().chunks(MAX_PAYLOAD_CHARS).collect();
        let total = chunks.len().max(1) as u8;

        let sequence_id = if total > 1 {
            self.next_sequence_id().to_string()
        } else {
            String::new()
        };

        if chunks.is_empty() {
            return vec![Sentence {
                talker: self.talker,
                total: 1,
                part: 1,
                sequence_id,
                channel,
                payload: String::new(),
                fill_bits: 0,
            }];
        }

        chunks
            .iter()
            .enumerate()
            .map(|(index, chunk)| Sentence {
                talker: self.talker,
                total,
                part: index as u8 + 1,
                sequence_id: sequence_id.clone(),
                channel,
                // Armored payloads are plain ASCII
                payload: chunk.iter().map(|&b| b as char).collect(),
                fill_bits: Self::fill_bits_for(chunk.len()),
            })
            .collect()
    }

    /// Build the sentence lines carrying `bits` on `channel`
    pub fn emit_lines(&self, bits: &BitBuffer, channel: Channel) -> Vec<String> {
        self.emit(bits, channel)
            .iter()
            .map(Sentence::to_line)
            .collect()
    }
}

impl Default for SentenceEmitter {
    fn default() -> Self {
        Self::new(Talker::Aivdm, SequenceIdStrategy::Random)
    }
}
