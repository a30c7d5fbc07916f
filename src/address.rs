//! Bluetooth LE device addresses.
//!
//! A peer address on LE is six bytes plus a tag saying whether it is a public
//! (IEEE-assigned) or a random address. Two addresses are only equal when both
//! the bytes and the tag match.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Whether an LE address is public or random.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum AddressKind {
    #[default]
    Public,
    Random,
}

impl fmt::Display for AddressKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressKind::Public => write!(f, "public"),
            AddressKind::Random => write!(f, "random"),
        }
    }
}

/// A peer device address: 6 bytes, most significant byte first, and its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct DeviceAddress {
    pub bytes: [u8; 6],
    pub kind: AddressKind,
}

impl DeviceAddress {
    pub const fn new(bytes: [u8; 6], kind: AddressKind) -> Self {
        Self { bytes, kind }
    }

    pub const fn public(bytes: [u8; 6]) -> Self {
        Self::new(bytes, AddressKind::Public)
    }

    pub const fn random(bytes: [u8; 6]) -> Self {
        Self::new(bytes, AddressKind::Random)
    }
}

/// Formats only the address bytes (`AA:BB:CC:DD:EE:FF`); the kind is
/// available separately through [`DeviceAddress::kind`].
impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.bytes;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

/// Errors returned when parsing an address string.
#[derive(Error, Debug, PartialEq)]
pub enum ParseAddressError {
    #[error("invalid address: expected 6 parts, got {0}")]
    InvalidLength(usize),
    #[error("invalid address: part {0} has wrong length")]
    InvalidPartLength(usize),
    #[error("invalid address: '{0}' is not valid hex")]
    InvalidHex(String),
    #[error("invalid address kind '{0}': expected 'public' or 'random'")]
    InvalidKind(String),
}

/// Parse the `AA:BB:CC:DD:EE:FF` form into raw bytes.
pub fn parse_mac(s: &str) -> Result<[u8; 6], ParseAddressError> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 6 {
        return Err(ParseAddressError::InvalidLength(parts.len()));
    }

    let mut bytes = [0u8; 6];
    for (i, part) in parts.iter().enumerate() {
        if part.len() != 2 {
            return Err(ParseAddressError::InvalidPartLength(i));
        }
        bytes[i] = u8::from_str_radix(part, 16)
            .map_err(|_| ParseAddressError::InvalidHex(part.to_string()))?;
    }

    Ok(bytes)
}

/// Accepts `AA:BB:CC:DD:EE:FF` (public) or `AA:BB:CC:DD:EE:FF/random`.
impl FromStr for DeviceAddress {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (mac, kind) = match s.split_once('/') {
            Some((mac, "public")) => (mac, AddressKind::Public),
            Some((mac, "random")) => (mac, AddressKind::Random),
            Some((_, other)) => return Err(ParseAddressError::InvalidKind(other.to_string())),
            None => (s, AddressKind::Public),
        };
        Ok(Self::new(parse_mac(mac)?, kind))
    }
}

#[cfg(feature = "bluer")]
impl From<bluer::AddressType> for AddressKind {
    fn from(kind: bluer::AddressType) -> Self {
        match kind {
            bluer::AddressType::LeRandom => AddressKind::Random,
            _ => AddressKind::Public,
        }
    }
}
