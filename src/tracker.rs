//! The one piece of state carried between advertisements.

use crate::address::DeviceAddress;

/// Remembers the address of the most recently recognised beacon.
///
/// Each [`set`](TargetTracker::set) replaces the previous target; there is no
/// history and no way back to "no target".
#[derive(Debug, Default, Clone)]
pub struct TargetTracker {
    target: Option<DeviceAddress>,
}

impl TargetTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, address: DeviceAddress) {
        self.target = Some(address);
    }

    pub fn get(&self) -> Option<DeviceAddress> {
        self.target
    }

    /// True when `address` is the current target.
    pub fn is_tracking(&self, address: &DeviceAddress) -> bool {
        self.target.as_ref() == Some(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: DeviceAddress = DeviceAddress::public([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x01]);
    const B: DeviceAddress = DeviceAddress::public([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x02]);

    #[test]
    fn test_starts_empty() {
        let tracker = TargetTracker::new();
        assert_eq!(tracker.get(), None);
        assert!(!tracker.is_tracking(&A));
    }

    #[test]
    fn test_last_set_wins() {
        let mut tracker = TargetTracker::new();
        tracker.set(A);
        assert_eq!(tracker.get(), Some(A));
        tracker.set(B);
        assert_eq!(tracker.get(), Some(B));
        assert!(tracker.is_tracking(&B));
        assert!(!tracker.is_tracking(&A));
    }

    #[test]
    fn test_kind_is_part_of_identity() {
        let mut tracker = TargetTracker::new();
        tracker.set(A);
        assert!(!tracker.is_tracking(&DeviceAddress::random(A.bytes)));
    }
}
