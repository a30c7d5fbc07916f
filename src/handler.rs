//! Per-advertisement orchestration.
//!
//! [`AdvertisementHandler`] owns the [`TargetTracker`] and turns each
//! [`ScanEvent`] into zero or more [`Notification`]s. It does no I/O; the
//! caller decides how notifications are reported.

use crate::address::DeviceAddress;
use crate::advertising::{AdType, ParseError, parse_fields};
use crate::beacon::{BeaconName, match_beacon};
use crate::reading::{DecodeError, Reading, decode_reading};
use crate::tracker::TargetTracker;
use log::debug;

/// An event delivered by a scanner backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// An advertisement (or scan response) and the peer that sent it.
    Advertisement {
        address: DeviceAddress,
        data: Vec<u8>,
    },
    /// The scan window ended.
    Timeout,
}

/// Observable outcome of handling a [`ScanEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    BeaconFound {
        name: BeaconName,
        address: DeviceAddress,
    },
    Reading {
        address: DeviceAddress,
        reading: Reading,
    },
    DecodeFailed {
        address: DeviceAddress,
        reason: DecodeError,
    },
    /// The payload was cut short; fields before the damage were still handled.
    MalformedPayload {
        address: DeviceAddress,
        error: ParseError,
    },
    ScanTimedOut,
}

impl Notification {
    /// The peer this notification concerns, if any.
    pub fn address(&self) -> Option<&DeviceAddress> {
        match self {
            Notification::BeaconFound { address, .. }
            | Notification::Reading { address, .. }
            | Notification::DecodeFailed { address, .. }
            | Notification::MalformedPayload { address, .. } => Some(address),
            Notification::ScanTimedOut => None,
        }
    }
}

/// Correlates beacon names with later manufacturer data from the same peer.
#[derive(Debug, Default)]
pub struct AdvertisementHandler {
    tracker: TargetTracker,
}

impl AdvertisementHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `address` already tracked.
    pub fn with_target(address: DeviceAddress) -> Self {
        let mut tracker = TargetTracker::new();
        tracker.set(address);
        Self { tracker }
    }

    /// Address of the beacon currently tracked, if any.
    pub fn target(&self) -> Option<DeviceAddress> {
        self.tracker.get()
    }

    pub fn handle(&mut self, event: &ScanEvent) -> Vec<Notification> {
        match event {
            ScanEvent::Advertisement { address, data } => {
                self.handle_advertisement(*address, data)
            }
            ScanEvent::Timeout => vec![Notification::ScanTimedOut],
        }
    }

    /// Process one advertisement payload from `address`.
    ///
    /// Fields are handled strictly left to right, so a name earlier in the
    /// payload makes a manufacturer field later in the same payload decodable.
    pub fn handle_advertisement(
        &mut self,
        address: DeviceAddress,
        payload: &[u8],
    ) -> Vec<Notification> {
        let mut notifications = Vec::new();

        for field in parse_fields(payload) {
            let field = match field {
                Ok(field) => field,
                Err(error) => {
                    debug!("{address}: {error}");
                    notifications.push(Notification::MalformedPayload { address, error });
                    break;
                }
            };

            match field.ad_type {
                AdType::COMPLETE_LOCAL_NAME => {
                    if let Some(name) = match_beacon(&field) {
                        self.tracker.set(address);
                        notifications.push(Notification::BeaconFound { name, address });
                    }
                }
                AdType::MANUFACTURER_SPECIFIC_DATA if self.tracker.is_tracking(&address) => {
                    notifications.push(match decode_reading(field.value) {
                        Ok(reading) => Notification::Reading { address, reading },
                        Err(reason) => Notification::DecodeFailed { address, reason },
                    });
                }
                _ => {}
            }
        }

        notifications
    }
}
