//! Error types for AIS sentence decoding and encoding

use thiserror::Error;

/// Result type for AIS operations
pub type Result<T> = std::result::Result<T, AisError>;

/// Error types encountered while decoding or encoding AIS sentences
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AisError {
    /// Sentence does not follow the `!AIVDM`/`!AIVDO` grammar
    #[error("Invalid sentence: {0}")]
    InvalidSentence(String),

    /// Checksum does not match the sentence body
    #[error("Checksum mismatch: {0}")]
    ChecksumMismatch(String),

    /// Payload holds characters outside the 6-bit armor alphabet
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Too few bits for the declared message type
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Message type this crate does not decode
    #[error("Unsupported message type: {0}")]
    UnsupportedMessageType(u8),

    /// Record carries a message type that does not match its kind
    #[error("Invalid message type: {0}")]
    InvalidMessageType(String),

    /// Field value does not fit its bit width
    #[error("Field out of range: {0}")]
    FieldOutOfRange(String),

    /// Channel is not a single `A` or `B`
    #[error("Invalid channel: {0}")]
    InvalidChannel(String),
}

impl AisError {
    /// Create a new InvalidSentence error
    pub fn invalid_sentence(msg: impl Into<String>) -> Self {
        AisError::InvalidSentence(msg.into())
    }

    /// Create a new ChecksumMismatch error
    pub fn checksum_mismatch(msg: impl Into<String>) -> Self {
        AisError::ChecksumMismatch(msg.into())
    }

    /// Create a new InvalidPayload error
    pub fn invalid_payload(msg: impl Into<String>) -> Self {
        AisError::InvalidPayload(msg.into())
    }

    /// Create a new InsufficientData error
    pub fn insufficient_data(msg: impl Into<String>) -> Self {
        AisError::InsufficientData(msg.into())
    }

    /// Create a new InvalidMessageType error
    pub fn invalid_message_type(msg: impl Into<String>) -> Self {
        AisError::InvalidMessageType(msg.into())
    }

    /// Create a new FieldOutOfRange error
    pub fn field_out_of_range(msg: impl Into<String>) -> Self {
        AisError::FieldOutOfRange(msg.into())
    }

    /// Create a new InvalidChannel error
    pub fn invalid_channel(msg: impl Into<String>) -> Self {
        AisError::InvalidChannel(msg.into())
    }

    /// Whether this error stems from malformed input rather than a bad record
    ///
    /// Malformed input is dropped silently by the decoder; everything else is
    /// a caller contract violation surfaced on encode.
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            AisError::InvalidSentence(_)
                | AisError::ChecksumMismatch(_)
                | AisError::InvalidPayload(_)
                | AisError::InsufficientData(_)
                | AisError::UnsupportedMessageType(_)
        )
    }
}
