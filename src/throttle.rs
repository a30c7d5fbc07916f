//! Per-sensor rate limiting of emitted readings.
//!
//! TPMS sensors advertise several times a second while a wheel is turning;
//! most consumers only want a reading every few seconds per tire.

use crate::address::DeviceAddress;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Limits events to at most one per `interval` for each device address.
///
/// The first event for a device is always allowed.
#[derive(Debug)]
pub struct Throttle {
    /// Minimum time between events for each device
    interval: Duration,
    /// Last emitted event time per device
    last_seen: HashMap<DeviceAddress, Instant>,
}

impl Throttle {
    /// Create a new throttle with the specified minimum interval between events.
    ///
    /// # Arguments
    /// * `interval` - Minimum duration between events for each device
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use tpms_listener::throttle::Throttle;
    ///
    /// let throttle = Throttle::new(Duration::from_secs(3));
    /// ```
    pub fn new(interval: Duration) -> Self {
        Throttle {
            interval,
            last_seen: HashMap::new(),
        }
    }

    /// Check if an event from `address` should be allowed.
    ///
    /// Returns `true` if enough time has passed since the last allowed event
    /// from this device, resetting its timer. Blocked events do not reset it.
    pub fn should_emit(&mut self, address: DeviceAddress) -> bool {
        let now = Instant::now();

        match self.last_seen.get(&address) {
            Some(last) if now.duration_since(*last) < self.interval => false,
            _ => {
                self.last_seen.insert(address, now);
                true
            }
        }
    }
}

/// Parse a duration such as `500ms`, `3s`, `1m` or `2h`.
///
/// A bare number is taken as seconds. Used for both `--throttle` and
/// `--duration`.
///
/// ```
/// use tpms_listener::throttle::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("3s").unwrap(), Duration::from_secs(3));
/// assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
/// assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
/// ```
pub fn parse_duration(src: &str) -> Result<Duration, String> {
    let src = src.trim();
    if src.is_empty() {
        return Err("empty duration string".to_string());
    }

    // "ms" must be tried before "m" and "s".
    let seconds: fn(u64) -> Option<Duration> = |n| Some(Duration::from_secs(n));
    let units: [(&str, fn(u64) -> Option<Duration>); 4] = [
        ("ms", |n| Some(Duration::from_millis(n))),
        ("h", |n| n.checked_mul(3600).map(Duration::from_secs)),
        ("m", |n| n.checked_mul(60).map(Duration::from_secs)),
        ("s", seconds),
    ];
    let (num, to_duration) = units
        .iter()
        .find_map(|(suffix, f)| src.strip_suffix(suffix).map(|num| (num, *f)))
        .unwrap_or((src, seconds));

    let n = num
        .trim()
        .parse::<u64>()
        .map_err(|_| format!("invalid duration: {}", src))?;
    to_duration(n).ok_or_else(|| format!("duration too large: {}", src))
}
