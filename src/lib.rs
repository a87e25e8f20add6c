//! # AIS VDM/VDO Codec
//!
//! A Rust library for decoding and encoding AIS (Automatic Identification
//! System) reports carried in NMEA 0183 `!AIVDM` / `!AIVDO` sentences.
//!
//! This library provides:
//!
//! - Sentence parsing and checksum verification
//! - 6-bit ASCII payload armoring and unarmoring
//! - Field codecs for position reports (types 1-3) and static/voyage data (type 5)
//! - Multipart reassembly with timeout-based eviction
//! - Sentence emission, splitting long payloads across sentences
//!
//! ## Features
//!
//! - `serde`: Enable serialization/deserialization support
//!
//! ## Example
//!
//! ```
//! use ais_vdm::{AisDecoder, AisEncoder, AisMessage, PositionReport};
//!
//! let report = PositionReport {
//!     lat: Some(40.7128),
//!     lon: Some(-74.0060),
//!     sog: Some(12.3),
//!     heading: Some(90),
//!     ..PositionReport::new(123456789)
//! };
//!
//! let lines = AisEncoder::new().encode_position(&report)?;
//! assert!(lines[0].starts_with("!AIVDM,1,1,,A,"));
//!
//! let decoder = AisDecoder::new();
//! if let Some(AisMessage::Position(decoded)) = decoder.decode(&lines[0]) {
//!     assert_eq!(decoded.mmsi, 123456789);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod core;
pub mod encoding;
pub mod error;
pub mod message;
pub mod parser;
pub mod protocol;
pub mod sentence;

pub use crate::core::{BitBuffer, Channel};
pub use error::{AisError, Result};
pub use message::{AisMessage, PositionReport, StaticVoyageReport};
pub use parser::{
    encode_position_report, encode_static_voyage_report, spawn_sweeper, AisDecoder, AisEncoder,
    DecoderBuilder, EncoderBuilder,
};
pub use sentence::{SequenceIdStrategy, Talker};

/// AIS and NMEA 0183 protocol constants
pub mod constants {
    use std::time::Duration;

    /// Incomplete multipart messages are discarded after this long
    pub const MULTIPART_TIMEOUT: Duration = Duration::from_millis(30_000);

    /// Maximum armored payload characters per sentence
    pub const MAX_PAYLOAD_CHARS: usize = 60;

    /// Bits needed before the type and MMSI can be read
    pub const MIN_HEADER_BITS: usize = 40;

    /// Length of a position report (types 1-3) in bits
    pub const POSITION_REPORT_BITS: usize = 168;

    /// Length of a static and voyage report (type 5) in bits
    pub const STATIC_VOYAGE_REPORT_BITS: usize = 424;

    /// Smallest sequence id given to a multi-sentence message
    pub const MIN_SEQUENCE_ID: u8 = 1;

    /// Largest sequence id given to a multi-sentence message
    pub const MAX_SEQUENCE_ID: u8 = 9;
}
