//! Advertising data (AD) structure parsing.
//!
//! An advertisement payload is a sequence of `[length][type][value...]`
//! structures where `length` counts the type byte plus the value bytes. A
//! zero length byte, or running out of bytes exactly on a boundary, ends the
//! sequence. A length that runs past the end of the buffer is reported once as
//! [`ParseError::TruncatedField`] and also ends the sequence.
//!
//! ```
//! use tpms_listener::advertising::{AdType, parse_fields};
//!
//! let payload = [0x02, 0x01, 0x06, 0x05, 0x09, b'T', b'P', b'M', b'S'];
//! let fields: Vec<_> = parse_fields(&payload).collect::<Result<_, _>>().unwrap();
//! assert_eq!(fields.len(), 2);
//! assert_eq!(fields[1].ad_type, AdType::COMPLETE_LOCAL_NAME);
//! assert_eq!(fields[1].value, b"TPMS");
//! ```

use std::iter::FusedIterator;
use thiserror::Error;

/// AD type codes from the Bluetooth assigned numbers registry.
///
/// Only the ones this crate looks at are named; any other `u8` is a valid type.
pub struct AdType;

impl AdType {
    pub const FLAGS: u8 = 0x01;
    pub const SHORTENED_LOCAL_NAME: u8 = 0x08;
    pub const COMPLETE_LOCAL_NAME: u8 = 0x09;
    pub const MANUFACTURER_SPECIFIC_DATA: u8 = 0xFF;
}

/// Largest value a single AD structure can carry (the length byte also
/// covers the type byte).
pub const MAX_FIELD_VALUE_LENGTH: usize = u8::MAX as usize - 1;

/// Errors produced while walking an advertisement payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A structure declared more bytes than remain in the payload.
    #[error("truncated field at offset {offset}: declared {declared} bytes, {available} available")]
    TruncatedField {
        offset: usize,
        declared: usize,
        available: usize,
    },
}

/// Errors produced while encoding an AD structure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("field value of {0} bytes does not fit in one AD structure")]
    ValueTooLong(usize),
}

/// One AD structure, borrowed from the payload it was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdField<'a> {
    pub ad_type: u8,
    pub value: &'a [u8],
}

/// Lazy iterator over the AD structures of a payload.
///
/// Yields at most one `Err`, after which it is exhausted.
#[derive(Debug, Clone)]
pub struct AdFields<'a> {
    data: &'a [u8],
    offset: usize,
    done: bool,
}

/// Walk `data` as a sequence of AD structures.
pub fn parse_fields(data: &[u8]) -> AdFields<'_> {
    AdFields {
        data,
        offset: 0,
        done: false,
    }
}

impl<'a> Iterator for AdFields<'a> {
    type Item = Result<AdField<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let rest = &self.data[self.offset..];
        let Some((&len, body)) = rest.split_first() else {
            self.done = true;
            return None;
        };
        let len = usize::from(len);
        if len == 0 {
            self.done = true;
            return None;
        }

        if body.len() < len {
            self.done = true;
            return Some(Err(ParseError::TruncatedField {
                offset: self.offset,
                declared: len,
                available: body.len(),
            }));
        }

        let field = AdField {
            ad_type: body[0],
            value: &body[1..len],
        };
        self.offset += 1 + len;
        Some(Ok(field))
    }
}

impl FusedIterator for AdFields<'_> {}

/// Append one AD structure carrying `value` to `out`.
pub fn encode_field(out: &mut Vec<u8>, ad_type: u8, value: &[u8]) -> Result<(), EncodeError> {
    if value.len() > MAX_FIELD_VALUE_LENGTH {
        return Err(EncodeError::ValueTooLong(value.len()));
    }
    out.reserve(2 + value.len());
    out.push((value.len() + 1) as u8);
    out.push(ad_type);
    out.extend_from_slice(value);
    Ok(())
}
