//! Core types for AIS payload handling: radio channels and flat bit buffers

use crate::encoding::{char_to_sixbit, sixbit_to_char};
use crate::error::{AisError, Result};

/// AIS VHF radio channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Channel {
    /// Channel A (161.975 MHz)
    A,
    /// Channel B (162.025 MHz)
    B,
}

impl Channel {
    /// Character used for this channel on the wire
    pub fn as_char(&self) -> char {
        match self {
            Channel::A => 'A',
            Channel::B => 'B',
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl TryFrom<char> for Channel {
    type Error = AisError;

    fn try_from(value: char) -> Result<Self> {
        match value {
            'A' => Ok(Channel::A),
            'B' => Ok(Channel::B),
            other => Err(AisError::invalid_channel(format!(
                "Unknown channel '{}'",
                other
            ))),
        }
    }
}

impl std::str::FromStr for Channel {
    type Err = AisError;

    fn from_str(s: &str) -> Result<Self> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Channel::try_from(c),
            _ => Err(AisError::invalid_channel(format!(
                "Channel must be exactly one character, got {:?}",
                s
            ))),
        }
    }
}

/// A flat, MSB-first sequence of bits
///
/// Fields are read at fixed offsets and appended in layout order; every
/// offset and width comes from the message layouts in [`crate::message`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitBuffer {
    bits: Vec<bool>,
}

impl BitBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        BitBuffer { bits: Vec::new() }
    }

    /// Create an empty buffer with room for `capacity` bits
    pub fn with_capacity(capacity: usize) -> Self {
        BitBuffer {
            bits: Vec::with_capacity(capacity),
        }
    }

    /// Wrap an existing bit vector
    pub fn from_bits(bits: Vec<bool>) -> Self {
        BitBuffer { bits }
    }

    /// Number of bits held
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Whether the buffer holds no bits
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Borrow the raw bits
    pub fn as_slice(&self) -> &[bool] {
        &self.bits
    }

    /// Drop bits past `len`
    pub fn truncate(&mut self, len: usize) {
        self.bits.truncate(len);
    }

    /// Append zero bits until the length is a multiple of `multiple`
    pub fn pad_to_multiple(&mut self, multiple: usize) {
        let remainder = self.bits.len() % multiple;
        if remainder != 0 {
            let pad = multiple - remainder;
            self.bits.extend(std::iter::repeat(false).take(pad));
        }
    }

    fn slice(&self, start: usize, width: usize) -> Result<&[bool]> {
        self.bits.get(start..start + width).ok_or_else(|| {
            AisError::insufficient_data(format!(
                "Field at bit {} (width {}) exceeds {} available bits",
                start,
                width,
                self.bits.len()
            ))
        })
    }

    /// Read an unsigned field, MSB first
    pub fn read_unsigned(&self, start: usize, width: usize) -> Result<u32> {
        let bits = self.slice(start, width)?;
        Ok(bits
            .iter()
            .fold(0u32, |acc, &bit| (acc << 1) | u32::from(bit)))
    }

    /// Read a two's-complement signed field
    pub fn read_signed(&self, start: usize, width: usize) -> Result<i32> {
        let bits = self.slice(start, width)?;
        match bits.first() {
            Some(true) => {
                // Invert, add one, negate
                let inverted = bits
                    .iter()
                    .fold(0i64, |acc, &bit| (acc << 1) | i64::from(!bit));
                Ok(-((inverted + 1) as i32))
            }
            _ => Ok(self.read_unsigned(start, width)? as i32),
        }
    }

    /// Read a single-bit flag
    pub fn read_flag(&self, start: usize) -> Result<bool> {
        Ok(self.read_unsigned(start, 1)? == 1)
    }

    /// Read `chars` 6-bit text characters
    ///
    /// Trailing `@` padding is stripped, then surrounding whitespace.
    pub fn read_text(&self, start: usize, chars: usize) -> Result<String> {
        let mut text = String::with_capacity(chars);
        for i in 0..chars {
            let value = self.read_unsigned(start + i * 6, 6)?;
            text.push(sixbit_to_char(value as u8));
        }
        Ok(text.trim_end_matches('@').trim().to_string())
    }

    /// Append an unsigned field, failing if `value` needs more than `width` bits
    pub fn push_unsigned(&mut self, field: &str, value: u64, width: usize) -> Result<()> {
        if width < 64 && value >> width != 0 {
            return Err(AisError::field_out_of_range(format!(
                "{} value {} does not fit in {} unsigned bits",
                field, value, width
            )));
        }
        for i in (0..width).rev() {
            self.bits.push(i < 64 && (value >> i) & 1 == 1);
        }
        Ok(())
    }

    /// Append a two's-complement signed field
    ///
    /// The value must lie in `[-(2^(width-1)), 2^(width-1) - 1]`.
    pub fn push_signed(&mut self, field: &str, value: i64, width: usize) -> Result<()> {
        if width == 0 || width > 63 {
            return Err(AisError::field_out_of_range(format!(
                "{} cannot be packed into {} bits",
                field, width
            )));
        }
        let max = (1i64 << (width - 1)) - 1;
        let min = -(1i64 << (width - 1));
        if value < min || value > max {
            return Err(AisError::field_out_of_range(format!(
                "{} value {} does not fit in {} signed bits [{}, {}]",
                field, value, width, min, max
            )));
        }
        let encoded = if value >= 0 {
            value as u64
        } else {
            ((1i64 << width) + value) as u64
        };
        self.push_unsigned(field, encoded, width)
    }

    /// Append a single-bit flag
    pub fn push_flag(&mut self, value: bool) {
        self.bits.push(value);
    }

    /// Append `text` as exactly `chars` 6-bit characters
    ///
    /// Short text is padded with `@`, long text is truncated, and characters
    /// missing from the AIS table are written as `@`.
    pub fn push_text(&mut self, text: &str, chars: usize) {
        let mut source = text.chars();
        for _ in 0..chars {
            let value = source.next().map(char_to_sixbit).unwrap_or(0);
            for i in (0..6).rev() {
                self.bits.push((value >> i) & 1 == 1);
            }
        }
    }
}

impl std::fmt::Display for BitBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for &bit in &self.bits {
            write!(f, "{}", if bit { '1' } else { '0' })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(s: &str) -> BitBuffer {
        BitBuffer::from_bits(s.chars().map(|c| c == '1').collect())
    }

    #[test]
    fn test_channel_parsing() {
        assert_eq!("A".parse::<Channel>().unwrap(), Channel::A);
        assert_eq!("B".parse::<Channel>().unwrap(), Channel::B);
        assert!("AB".parse::<Channel>().is_err());
        assert!("".parse::<Channel>().is_err());
        assert!("C".parse::<Channel>().is_err());
    }

    #[test]
    fn test_channel_display() {
        assert_eq!(Channel::A.to_string(), "A");
        assert_eq!(Channel::B.as_char(), 'B');
    }

    #[test]
    fn test_read_unsigned() -> Result<()> {
        let buffer = bits("000001101");
        assert_eq!(buffer.read_unsigned(0, 6)?, 1);
        assert_eq!(buffer.read_unsigned(6, 3)?, 5);
        assert!(buffer.read_unsigned(6, 4).is_err());
        Ok(())
    }

    #[test]
    fn test_read_signed() -> Result<()> {
        assert_eq!(bits("10000000").read_signed(0, 8)?, -128);
        assert_eq!(bits("01111111").read_signed(0, 8)?, 127);
        assert_eq!(bits("11111111").read_signed(0, 8)?, -1);
        assert_eq!(bits("00000000").read_signed(0, 8)?, 0);
        Ok(())
    }

    #[test]
    fn test_signed_bounds() -> Result<()> {
        let mut buffer = BitBuffer::new();
        buffer.push_signed("rate of turn", -128, 8)?;
        buffer.push_signed("rate of turn", 127, 8)?;
        assert_eq!(buffer.read_signed(0, 8)?, -128);
        assert_eq!(buffer.read_signed(8, 8)?, 127);

        let err = buffer.push_signed("rate of turn", 128, 8).unwrap_err();
        assert!(matches!(err, AisError::FieldOutOfRange(_)));
        assert!(buffer.push_signed("rate of turn", -129, 8).is_err());
        assert_eq!(buffer.len(), 16);
        Ok(())
    }

    #[test]
    fn test_unsigned_overflow() {
        let mut buffer = BitBuffer::new();
        assert!(buffer.push_unsigned("heading", 511, 9).is_ok());
        assert!(buffer.push_unsigned("heading", 512, 9).is_err());
    }

    #[test]
    fn test_text_padding_and_trim() -> Result<()> {
        let mut buffer = BitBuffer::new();
        buffer.push_text("TEST SHIP", 20);
        assert_eq!(buffer.len(), 120);
        assert_eq!(buffer.read_text(0, 20)?, "TEST SHIP");

        let mut truncated = BitBuffer::new();
        truncated.push_text("CALLSIGN9", 7);
        assert_eq!(truncated.read_text(0, 7)?, "CALLSIG");

        let mut unknown = BitBuffer::new();
        unknown.push_text("ab", 2);
        assert_eq!(unknown.read_text(0, 2)?, "");
        Ok(())
    }

    #[test]
    fn test_pad_to_multiple() {
        let mut buffer = bits("1");
        buffer.pad_to_multiple(6);
        assert_eq!(buffer.to_string(), "100000");
        buffer.pad_to_multiple(6);
        assert_eq!(buffer.len(), 6);
    }
}
