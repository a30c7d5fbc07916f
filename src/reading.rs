//! Decoding tire readings from TPMS manufacturer data.
//!
//! The sensor family this crate targets puts two little-endian `u32` values in
//! its manufacturer-specific data: pressure at byte 8 and temperature at byte
//! 12, counting from the start of the AD value (company identifier included).
//! Values are passed through as raw integers without unit conversion.

use std::fmt;
use thiserror::Error;

/// Byte offset of the pressure value.
pub const PRESSURE_OFFSET: usize = 8;

/// Byte offset of the temperature value.
pub const TEMPERATURE_OFFSET: usize = 12;

/// Minimum manufacturer data length that holds both values.
pub const MIN_READING_LENGTH: usize = TEMPERATURE_OFFSET + 4;

/// A raw tire reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    pub pressure: u32,
    pub temperature: u32,
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tire pressure: {}, tire temp: {}",
            self.pressure, self.temperature
        )
    }
}

/// Errors returned when manufacturer data cannot be decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("insufficient data: {len} bytes, need at least {}", MIN_READING_LENGTH)]
    InsufficientData { len: usize },
}

/// Decode a [`Reading`] from a manufacturer-specific data value.
pub fn decode_reading(value: &[u8]) -> Result<Reading, DecodeError> {
    let insufficient = || DecodeError::InsufficientData { len: value.len() };
    Ok(Reading {
        pressure: read_u32_le(value, PRESSURE_OFFSET).ok_or_else(insufficient)?,
        temperature: read_u32_le(value, TEMPERATURE_OFFSET).ok_or_else(insufficient)?,
    })
}

fn read_u32_le(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes(bytes.try_into().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_minimal_payload() {
        let mut value = [0u8; 16];
        value[8..12].copy_from_slice(&[0x01, 0x00, 0x00, 0x00]);
        value[12..16].copy_from_slice(&[0x02, 0x00, 0x00, 0x00]);
        assert_eq!(
            decode_reading(&value),
            Ok(Reading {
                pressure: 1,
                temperature: 2
            })
        );
    }

    #[test]
    fn test_fifteen_bytes_is_insufficient() {
        assert_eq!(
            decode_reading(&[0u8; 15]),
            Err(DecodeError::InsufficientData { len: 15 })
        );
    }

    #[test]
    fn test_short_payloads_are_insufficient() {
        for len in 0..MIN_READING_LENGTH {
            let value = vec![0xAB; len];
            assert_eq!(
                decode_reading(&value),
                Err(DecodeError::InsufficientData { len })
            );
        }
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let mut value = vec![0u8; 20];
        value[8..12].copy_from_slice(&220u32.to_le_bytes());
        value[12..16].copy_from_slice(&25u32.to_le_bytes());
        value[16..].copy_from_slice(&[0xFF; 4]);
        assert_eq!(
            decode_reading(&value),
            Ok(Reading {
                pressure: 220,
                temperature: 25
            })
        );
    }

    #[test]
    fn test_little_endian() {
        let mut value = [0u8; 16];
        value[8..12].copy_from_slice(&[0x78, 0x56, 0x34, 0x12]);
        value[12..16].copy_from_slice(&[0xFF, 0xFF, 0xFF, 0xFF]);
        let reading = decode_reading(&value).unwrap();
        assert_eq!(reading.pressure, 0x1234_5678);
        assert_eq!(reading.temperature, u32::MAX);
    }

    #[test]
    fn test_display() {
        let reading = Reading {
            pressure: 220,
            temperature: 25,
        };
        assert_eq!(reading.to_string(), "tire pressure: 220, tire temp: 25");
    }

    #[test]
    fn test_error_display() {
        let err = DecodeError::InsufficientData { len: 3 };
        assert_eq!(err.to_string(), "insufficient data: 3 bytes, need at least 16");
    }
}
