//! `tpms-listener` library.
//!
//! The binary (`src/main.rs`) is responsible for CLI parsing and process exit codes.
//! Advertisement handling lives in [`crate::handler`], built on the AD parser in
//! [`crate::advertising`], the name matcher in [`crate::beacon`] and the reading
//! decoder in [`crate::reading`]. The run loop in [`crate::app`] wires it to a
//! scanner and output streams so it can be tested with injected fakes.

pub mod address;
pub mod advertising;
pub mod alias;
pub mod app;
pub mod beacon;
pub mod handler;
pub mod output;
pub mod reading;
pub mod scanner;
pub mod throttle;
pub mod tracker;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types at the crate root
pub use address::{AddressKind, DeviceAddress, ParseAddressError};
pub use advertising::{AdField, AdType, ParseError, parse_fields};
pub use alias::{Alias, AliasMap, parse_alias, resolve_name, to_map};
pub use beacon::{BeaconName, match_beacon};
pub use handler::{AdvertisementHandler, Notification, ScanEvent};
pub use output::OutputFormatter;
pub use output::influxdb::InfluxDbFormatter;
pub use output::text::TextFormatter;
pub use reading::{DecodeError, Reading, decode_reading};
pub use scanner::{Backend, ScanError};
pub use throttle::{Throttle, parse_duration};
pub use tracker::TargetTracker;
