//! Plain text output, one line per notification.

use crate::handler::Notification;
use crate::output::OutputFormatter;
use std::time::SystemTime;

#[derive(Debug, Default, Clone, Copy)]
pub struct TextFormatter;

impl OutputFormatter for TextFormatter {
    fn format(
        &self,
        notification: &Notification,
        name: &str,
        _timestamp: SystemTime,
    ) -> Option<String> {
        let line = match notification {
            Notification::BeaconFound { name: beacon, address } => {
                format!(
                    "found tpms beacon: {beacon} ({name}, {kind})",
                    kind = address.kind
                )
            }
            Notification::Reading { reading, .. } => format!("{name}: {reading}"),
            Notification::DecodeFailed { reason, .. } => format!("{name}: decode failed: {reason}"),
            Notification::MalformedPayload { error, .. } => {
                format!("{name}: malformed advertisement: {error}")
            }
            Notification::ScanTimedOut => "scan stopped: timeout reached".to_string(),
        };
        Some(line)
    }
}
