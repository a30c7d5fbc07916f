//! InfluxDB line protocol output formatter.

use crate::handler::Notification;
use crate::output::OutputFormatter;
use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

/// Data point in InfluxDB line protocol. All fields are unsigned integers.
#[derive(Debug)]
pub struct DataPoint {
    pub measurement: String,
    pub tag_set: BTreeMap<&'static str, String>,
    pub field_set: BTreeMap<&'static str, u32>,
    pub timestamp: Option<SystemTime>,
}

/// Escape commas, spaces and equals signs in tag values.
fn escape_tag(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ',' | ' ' | '=') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl fmt::Display for DataPoint {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", self.measurement)?;
        for (key, value) in &self.tag_set {
            write!(fmt, ",{}={}", key, escape_tag(value))?;
        }
        for (i, (key, value)) in self.field_set.iter().enumerate() {
            let sep = if i == 0 { ' ' } else { ',' };
            write!(fmt, "{sep}{key}={value}i")?;
        }
        if let Some(nanos) = self
            .timestamp
            .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
        {
            write!(fmt, " {}", nanos.as_nanos())?;
        }
        Ok(())
    }
}

/// InfluxDB line protocol formatter.
///
/// Only readings have a line protocol representation; other notifications
/// format to `None`.
pub struct InfluxDbFormatter {
    measurement_name: String,
}

impl InfluxDbFormatter {
    pub fn new(measurement_name: String) -> Self {
        Self { measurement_name }
    }
}

impl OutputFormatter for InfluxDbFormatter {
    fn format(
        &self,
        notification: &Notification,
        name: &str,
        timestamp: SystemTime,
    ) -> Option<String> {
        let Notification::Reading { address, reading } = notification else {
            return None;
        };

        let data_point = DataPoint {
            measurement: self.measurement_name.clone(),
            tag_set: BTreeMap::from([("mac", address.to_string()), ("name", name.to_string())]),
            field_set: BTreeMap::from([
                ("pressure", reading.pressure),
                ("temperature", reading.temperature),
            ]),
            timestamp: Some(timestamp),
        };
        Some(data_point.to_string())
    }
}
