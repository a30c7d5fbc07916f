use crate::address::DeviceAddress;
use crate::advertising::{AdType, encode_field};

/// A stable beacon address for unit tests.
pub const TEST_ADDRESS: DeviceAddress =
    DeviceAddress::random([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x01]);

/// Encode a complete local name AD structure.
pub fn name_field(name: &str) -> Vec<u8> {
    let mut out = Vec::new();
    encode_field(&mut out, AdType::COMPLETE_LOCAL_NAME, name.as_bytes()).unwrap();
    out
}

/// Encode a manufacturer-specific data AD structure.
pub fn manufacturer_field(value: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    encode_field(&mut out, AdType::MANUFACTURER_SPECIFIC_DATA, value).unwrap();
    out
}

/// Manufacturer data value with `pressure` and `temperature` at bytes 8 and 12.
pub fn reading_value(pressure: u32, temperature: u32) -> Vec<u8> {
    let mut value = vec![0x00, 0x01, 0x80, 0xEA, 0xCA, 0x10, 0x00, 0x00];
    value.extend_from_slice(&pressure.to_le_bytes());
    value.extend_from_slice(&temperature.to_le_bytes());
    value
}

/// A payload holding only a reading.
pub fn reading_payload(pressure: u32, temperature: u32) -> Vec<u8> {
    manufacturer_field(&reading_value(pressure, temperature))
}

/// Append a reading to an existing payload.
pub fn with_reading(mut payload: Vec<u8>, pressure: u32, temperature: u32) -> Vec<u8> {
    payload.extend(reading_payload(pressure, temperature));
    payload
}
