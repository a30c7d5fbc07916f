//! Output formatters for notifications.
//!
//! A formatter turns a [`Notification`] into one output line, or `None` when
//! the format has no representation for it (those still reach the log).

pub mod influxdb;
pub mod text;

use crate::handler::Notification;
use std::time::SystemTime;

/// Available output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Format {
    /// Human-readable lines for every notification
    #[default]
    Text,
    /// InfluxDB line protocol, readings only
    Influxdb,
}

/// Trait for formatting notifications into output lines.
pub trait OutputFormatter: Send + Sync {
    /// Format a notification.
    ///
    /// # Arguments
    /// * `notification` - What happened
    /// * `name` - Display name of the device involved (alias or address)
    /// * `timestamp` - When the triggering event was received
    fn format(
        &self,
        notification: &Notification,
        name: &str,
        timestamp: SystemTime,
    ) -> Option<String>;
}
