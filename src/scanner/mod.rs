//! BLE scanner backends.
//!
//! Each backend observes advertisements passively and forwards them as
//! [`ScanEvent`]s over a channel. Backends do no decoding of their own; the
//! payloads they send are plain AD structure sequences for
//! [`AdvertisementHandler`](crate::handler::AdvertisementHandler).

#[cfg(feature = "bluer")]
pub mod bluer;

#[cfg(feature = "hci")]
pub mod hci;

use crate::handler::ScanEvent;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Error type for scanner operations.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Bluetooth/adapter related error
    #[error("Bluetooth error: {0}")]
    Bluetooth(String),
}

/// Channel buffer size for scan events.
pub const EVENT_CHANNEL_BUFFER_SIZE: usize = 100;

/// Available scanner backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Backend {
    /// BlueZ D-Bus backend (requires bluetoothd daemon)
    #[cfg(feature = "bluer")]
    Bluer,
    /// Raw HCI socket backend (direct kernel access, no daemon required)
    #[cfg(feature = "hci")]
    Hci,
}

impl Default for Backend {
    fn default() -> Self {
        #[cfg(feature = "bluer")]
        return Backend::Bluer;
        #[cfg(all(feature = "hci", not(feature = "bluer")))]
        return Backend::Hci;
        #[cfg(not(any(feature = "bluer", feature = "hci")))]
        compile_error!("At least one backend feature must be enabled");
    }
}

/// Completes when the scan window closes, or never when `duration` is `None`.
pub(crate) async fn scan_window(duration: Option<Duration>) {
    match duration {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending().await,
    }
}

/// Start scanning with the given backend.
///
/// With a `duration`, the backend sends [`ScanEvent::Timeout`] once it has
/// elapsed, stops scanning and closes the channel. Without one it runs until
/// the receiver is dropped or the process exits.
pub async fn start_scan(
    backend: Backend,
    duration: Option<Duration>,
) -> Result<mpsc::Receiver<ScanEvent>, ScanError> {
    match backend {
        #[cfg(feature = "bluer")]
        Backend::Bluer => bluer::start_scan(duration).await,
        #[cfg(feature = "hci")]
        Backend::Hci => hci::start_scan(duration).await,
    }
}
