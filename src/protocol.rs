//! Multipart message reassembly with timeout-based eviction

use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::{debug, trace};

use crate::constants::MULTIPART_TIMEOUT;
use crate::core::Channel;
use crate::sentence::Sentence;

/// Parts of one multi-sentence message collected so far
#[derive(Debug, Clone)]
pub struct MultipartBuffer {
    /// Declared number of parts
    pub total: u8,
    /// Payload fragments keyed by 1-based part index
    pub parts: HashMap<u8, String>,
    /// Fill bits of the final part, once it has arrived
    pub fill_bits: u8,
    /// When the first part arrived
    pub created: Instant,
}

impl MultipartBuffer {
    /// Create an empty buffer for a message of `total` parts
    pub fn new(total: u8, created: Instant) -> Self {
        MultipartBuffer {
            total,
            parts: HashMap::with_capacity(total as usize),
            fill_bits: 0,
            created,
        }
    }

    /// Store a fragment; a repeated index replaces the earlier fragment
    pub fn insert(&mut self, part: u8, payload: &str, fill_bits: u8) {
        self.parts.insert(part, payload.to_string());
        if part == self.total {
            self.fill_bits = fill_bits;
        }
    }

    /// Whether as many distinct parts as declared have arrived
    pub fn is_complete(&self) -> bool {
        self.parts.len() == self.total as usize
    }

    /// Whether the buffer has outlived `timeout` at `now`
    pub fn is_expired(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.created) >= timeout
    }

    /// Concatenate the fragments in index order 1..=total
    ///
    /// Returns `None` if any index is missing.
    pub fn assemble(&self) -> Option<String> {
        let mut payload = String::new();
        for index in 1..=self.total {
            payload.push_str(self.parts.get(&index)?);
        }
        Some(payload)
    }
}

/// A fully reassembled payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPayload {
    /// Concatenated 6-bit armored payload
    pub payload: String,
    /// Fill bits taken from the final part
    pub fill_bits: u8,
    /// Channel of the part that completed the message
    pub channel: Channel,
}

/// Counters describing reassembly activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReassemblyStats {
    /// Messages reassembled successfully
    pub completed: u64,
    /// Buffers discarded on timeout
    pub expired: u64,
    /// Buffers dropped because a new message reused their key
    pub superseded: u64,
    /// Buffers currently waiting for parts
    pub pending: usize,
}

/// Buffer table for multi-sentence messages
///
/// Keyed by sequence id; sentences without one share the `None` key.
/// Expiry is a sweep over the table rather than a timer per buffer, so
/// completion and eviction never race as long as one owner holds the table.
#[derive(Debug)]
pub struct Reassembler {
    buffers: HashMap<Option<String>, MultipartBuffer>,
    timeout: Duration,
    stats: ReassemblyStats,
}

impl Reassembler {
    /// Create a reassembler that evicts incomplete buffers after `timeout`
    pub fn new(timeout: Duration) -> Self {
        Reassembler {
            buffers: HashMap::new(),
            timeout,
            stats: ReassemblyStats::default(),
        }
    }

    /// Eviction timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of buffers waiting for parts
    pub fn pending_count(&self) -> usize {
        self.buffers.len()
    }

    /// Activity counters
    pub fn stats(&self) -> ReassemblyStats {
        ReassemblyStats {
            pending: self.buffers.len(),
            ..self.stats
        }
    }

    /// Drop every buffer older than the timeout; returns how many went
    pub fn evict_expired(&mut self, now: Instant) -> usize {
        let timeout = self.timeout;
        let before = self.buffers.len();
        self.buffers.retain(|key, buffer| {
            let expired = buffer.is_expired(now, timeout);
            if expired {
                debug!(
                    "evicting multipart buffer {:?} with {}/{} parts",
                    key,
                    buffer.parts.len(),
                    buffer.total
                );
            }
            !expired
        });
        let evicted = before - self.buffers.len();
        self.stats.expired += evicted as u64;
        evicted
    }

    /// Feed one part of a multi-sentence message
    ///
    /// Returns the assembled payload once every part is present.
    pub fn push(&mut self, sentence: &Sentence, now: Instant) -> Option<AssembledPayload> {
        let key = if sentence.sequence_id.is_empty() {
            None
        } else {
            Some(sentence.sequence_id.clone())
        };

        let timeout = self.timeout;
        if let Some(buffer) = self.buffers.get(&key) {
            if buffer.is_expired(now, timeout) {
                debug!("multipart buffer {:?} expired before part {}", key, sentence.part);
                self.buffers.remove(&key);
                self.stats.expired += 1;
            } else if buffer.total != sentence.total {
                debug!(
                    "replacing multipart buffer {:?}: {} parts declared, had {}",
                    key, sentence.total, buffer.total
                );
                self.buffers.remove(&key);
                self.stats.superseded += 1;
            }
        }

        let buffer = self
            .buffers
            .entry(key.clone())
            .or_insert_with(|| MultipartBuffer::new(sentence.total, now));
        buffer.insert(sentence.part, &sentence.payload, sentence.fill_bits);
        trace!(
            "multipart {:?}: part {}/{} ({} held)",
            key,
            sentence.part,
            sentence.total,
            buffer.parts.len()
        );

        if !buffer.is_complete() {
            return None;
        }

        let assembled = buffer.assemble();
        let fill_bits = buffer.fill_bits;
        let payload = assembled?;

        self.buffers.remove(&key);
        self.stats.completed += 1;
        Some(AssembledPayload {
            payload,
            fill_bits,
            channel: sentence.channel,
        })
    }

    /// Forget every pending buffer
    pub fn clear(&mut self) {
        self.buffers.clear();
    }
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new(MULTIPART_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentence::Talker;

    fn part(total: u8, part: u8, seq: &str, payload: &str, fill_bits: u8) -> Sentence {
        Sentence {
            talker: Talker::Aivdm,
            total,
            part,
            sequence_id: seq.to_string(),
            channel: Channel::A,
            payload: payload.to_string(),
            fill_bits,
        }
    }

    #[test]
    fn test_in_order_reassembly() {
        let mut reassembler = Reassembler::default();
        let now = Instant::now();

        assert!(reassembler.push(&part(2, 1, "3", "ABC", 0), now).is_none());
        assert_eq!(reassembler.pending_count(), 1);

        let assembled = reassembler.push(&part(2, 2, "3", "DEF", 2), now).unwrap();
        assert_eq!(assembled.payload, "ABCDEF");
        assert_eq!(assembled.fill_bits, 2);
        assert_eq!(reassembler.pending_count(), 0);
        assert_eq!(reassembler.stats().completed, 1);
    }

    #[test]
    fn test_reverse_order_reassembly() {
        let mut reassembler = Reassembler::default();
        let now = Instant::now();

        assert!(reassembler.push(&part(2, 2, "7", "DEF", 4), now).is_none());
        let assembled = reassembler.push(&part(2, 1, "7", "ABC", 0), now).unwrap();
        assert_eq!(assembled.payload, "ABCDEF");
        // Fill bits come from the final part regardless of arrival order
        assert_eq!(assembled.fill_bits, 4);
    }

    #[test]
    fn test_duplicate_part_last_write_wins() {
        let mut reassembler = Reassembler::default();
        let now = Instant::now();

        reassembler.push(&part(3, 1, "1", "AAA", 0), now);
        reassembler.push(&part(3, 1, "1", "XXX", 0), now);
        reassembler.push(&part(3, 2, "1", "BBB", 0), now);
        let assembled = reassembler.push(&part(3, 3, "1", "CCC", 0), now).unwrap();
        assert_eq!(assembled.payload, "XXXBBBCCC");
    }

    #[test]
    fn test_keys_are_independent() {
        let mut reassembler = Reassembler::default();
        let now = Instant::now();

        reassembler.push(&part(2, 1, "1", "AAA", 0), now);
        reassembler.push(&part(2, 1, "", "NNN", 0), now);
        assert_eq!(reassembler.pending_count(), 2);

        let assembled = reassembler.push(&part(2, 2, "", "OOO", 0), now).unwrap();
        assert_eq!(assembled.payload, "NNNOOO");
        assert_eq!(reassembler.pending_count(), 1);
    }

    #[test]
    fn test_timeout_eviction() {
        let mut reassembler = Reassembler::default();
        let start = Instant::now();

        reassembler.push(&part(2, 1, "5", "AAA", 0), start);
        assert_eq!(reassembler.evict_expired(start + Duration::from_secs(29)), 0);
        assert_eq!(reassembler.pending_count(), 1);

        assert_eq!(reassembler.evict_expired(start + MULTIPART_TIMEOUT), 1);
        assert_eq!(reassembler.pending_count(), 0);
        assert_eq!(reassembler.stats().expired, 1);
    }

    #[test]
    fn test_expired_buffer_not_completed() {
        let mut reassembler = Reassembler::default();
        let start = Instant::now();

        reassembler.push(&part(2, 1, "5", "AAA", 0), start);
        let late = start + Duration::from_secs(31);
        // The stale first part must not combine with a late second part
        assert!(reassembler.push(&part(2, 2, "5", "BBB", 0), late).is_none());
        assert_eq!(reassembler.pending_count(), 1);

        let stats = reassembler.stats();
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.superseded, 0);
    }

    #[test]
    fn test_total_mismatch_starts_new_buffer() {
        let mut reassembler = Reassembler::default();
        let now = Instant::now();

        reassembler.push(&part(3, 1, "2", "AAA", 0), now);
        assert!(reassembler.push(&part(2, 1, "2", "XXX", 0), now).is_none());
        let assembled = reassembler.push(&part(2, 2, "2", "YYY", 0), now).unwrap();
        assert_eq!(assembled.payload, "XXXYYY");
        assert_eq!(reassembler.stats().superseded, 1);
        assert_eq!(reassembler.stats().expired, 0);
    }

    #[test]
    fn test_assemble_requires_every_index() {
        let mut buffer = MultipartBuffer::new(2, Instant::now());
        buffer.parts.insert(1, "AAA".to_string());
        buffer.parts.insert(3, "CCC".to_string());
        assert!(buffer.is_complete());
        assert_eq!(buffer.assemble(), None);
    }
}
