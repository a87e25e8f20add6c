//! 6-bit ASCII payload armoring and the AIS text character table

use crate::core::BitBuffer;
use crate::error::{AisError, Result};

/// AIS 6-bit text table, indexed by 6-bit value
///
/// `@` (value 0) doubles as the padding symbol for fixed-length text fields.
pub const AIS_CHARSET: &[u8; 64] =
    b"@ABCDEFGHIJKLMNOPQRSTUVWXYZ[\\]^_ !\"#$%&'()*+,-./0123456789:;<=>?";

/// Map a 6-bit value to its text character
pub fn sixbit_to_char(value: u8) -> char {
    AIS_CHARSET[(value & 0x3F) as usize] as char
}

/// Map a text character to its 6-bit value; unknown characters become `@` (0)
pub fn char_to_sixbit(c: char) -> u8 {
    AIS_CHARSET
        .iter()
        .position(|&b| b as char == c)
        .map(|index| index as u8)
        .unwrap_or(0)
}

/// Encoder from bits to the armored payload alphabet
pub struct SixBitEncoder;

impl SixBitEncoder {
    /// Armor a single 6-bit value
    ///
    /// Values below 40 map to `'0'..='W'`, the rest to `` '`'..='w' ``.
    ///
    /// # Panics
    ///
    /// Panics if `value` does not fit in 6 bits.
    pub fn encode_value(value: u8) -> char {
        assert!(value < 64, "6-bit value out of range: {}", value);
        if value < 40 {
            (value + 48) as char
        } else {
            (value + 56) as char
        }
    }

    /// Armor a bit buffer, right-padding with zeros to a multiple of 6 bits
    pub fn encode(bits: &BitBuffer) -> String {
        bits.as_slice()
            .chunks(6)
            .map(|group| {
                let value = group
                    .iter()
                    .chain(std::iter::repeat(&false))
                    .take(6)
                    .fold(0u8, |acc, &bit| (acc << 1) | u8::from(bit));
                Self::encode_value(value)
            })
            .collect()
    }
}

/// Decoder from the armored payload alphabet to bits
pub struct SixBitDecoder;

impl SixBitDecoder {
    /// Recover the 6-bit value of an armored character
    pub fn decode_char(c: char) -> Result<u8> {
        match c {
            '0'..='W' | '`'..='w' => {
                let mut code = c as u8 - 48;
                if code > 40 {
                    code -= 8;
                }
                Ok(code)
            }
            _ => Err(AisError::invalid_payload(format!(
                "Character {:?} is outside the 6-bit armor alphabet",
                c
            ))),
        }
    }

    /// Unpack a payload into bits and strip `fill_bits` from the end
    ///
    /// A fill-bit count of exactly 6 is treated as 0, so a whole trailing
    /// character is never discarded.
    pub fn decode(payload: &str, fill_bits: u8) -> Result<BitBuffer> {
        let mut bits = BitBuffer::with_capacity(payload.len() * 6);
        for c in payload.chars() {
            let value = Self::decode_char(c)?;
            for i in (0..6).rev() {
                bits.push_flag((value >> i) & 1 == 1);
            }
        }

        let fill_bits = if fill_bits == 6 { 0 } else { fill_bits as usize };
        if fill_bits > 0 && bits.len() >= fill_bits {
            let len = bits.len() - fill_bits;
            bits.truncate(len);
        }

        Ok(bits)
    }
}
