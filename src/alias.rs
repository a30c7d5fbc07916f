//! Human-readable names for sensor addresses.
//!
//! Lets the user label each wheel (`--alias AA:BB:CC:DD:EE:01=front-left`)
//! so output identifies sensors by position rather than by address.

use crate::address::{DeviceAddress, parse_mac};
use std::collections::BTreeMap;

/// Address bytes to name. Aliases apply regardless of address kind.
pub type AliasMap = BTreeMap<[u8; 6], String>;

/// A parsed alias mapping an address to a human-readable name.
#[derive(Debug, Clone, PartialEq)]
pub struct Alias {
    pub address: [u8; 6],
    pub name: String,
}

/// Parse an alias from a string in the format "MAC=NAME".
///
/// # Example
/// ```
/// use tpms_listener::alias::parse_alias;
///
/// let alias = parse_alias("AA:BB:CC:DD:EE:01=front-left").unwrap();
/// assert_eq!(alias.address, [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x01]);
/// assert_eq!(alias.name, "front-left");
/// ```
pub fn parse_alias(src: &str) -> Result<Alias, String> {
    let (address, name) = src
        .split_once('=')
        .ok_or_else(|| "invalid alias: expected format MAC=NAME".to_string())?;
    let address = parse_mac(address).map_err(|e| e.to_string())?;
    Ok(Alias {
        address,
        name: name.into(),
    })
}

/// Convert a slice of Alias values into an AliasMap. Later entries win.
pub fn to_map(aliases: &[Alias]) -> AliasMap {
    aliases
        .iter()
        .map(|a| (a.address, a.name.clone()))
        .collect()
}

/// The alias for `address`, or its formatted address when none is set.
pub fn resolve_name(address: &DeviceAddress, aliases: &AliasMap) -> String {
    aliases
        .get(&address.bytes)
        .cloned()
        .unwrap_or_else(|| address.to_string())
}
