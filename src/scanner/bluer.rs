//! BlueZ D-Bus backend for TPMS scanning.
//!
//! This backend uses the `bluer` crate to communicate with the BlueZ daemon
//! via D-Bus. It requires the `bluetoothd` daemon to be running.
//!
//! BlueZ hands out parsed device properties rather than raw advertisements,
//! so the name and manufacturer data of each device are re-encoded into AD
//! structures before being passed on.

use super::{EVENT_CHANNEL_BUFFER_SIZE, ScanError, scan_window};
use crate::address::DeviceAddress;
use crate::advertising::{AdType, encode_field};
use crate::handler::ScanEvent;
use bluer::{
    Adapter, AdapterEvent, Address, Device, DeviceEvent, DeviceProperty, DiscoveryFilter,
    DiscoveryTransport, Session,
};
use futures::StreamExt;
use log::{debug, warn};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

impl From<bluer::Error> for ScanError {
    fn from(err: bluer::Error) -> Self {
        ScanError::Bluetooth(err.to_string())
    }
}

/// Encode a device name and manufacturer data map as an AD payload.
///
/// Manufacturer entries are written in company identifier order, each as the
/// identifier (little-endian) followed by its data, the same layout the radio
/// carries. Values too long for one AD structure are skipped.
fn encode_properties(name: Option<&str>, manufacturer_data: &HashMap<u16, Vec<u8>>) -> Vec<u8> {
    let mut payload = Vec::new();

    if let Some(name) = name
        && let Err(e) = encode_field(&mut payload, AdType::COMPLETE_LOCAL_NAME, name.as_bytes())
    {
        debug!("skipping name: {e}");
    }

    let mut ids: Vec<_> = manufacturer_data.keys().copied().collect();
    ids.sort_unstable();
    for id in ids {
        let mut value = id.to_le_bytes().to_vec();
        value.extend_from_slice(&manufacturer_data[&id]);
        if let Err(e) = encode_field(&mut payload, AdType::MANUFACTURER_SPECIFIC_DATA, &value) {
            debug!("skipping manufacturer data {id:#06x}: {e}");
        }
    }

    payload
}

/// Snapshot the advertised properties of `device` as a scan event.
async fn advertisement(device: &Device) -> Result<Option<ScanEvent>, ScanError> {
    let address = DeviceAddress::new(device.address().0, device.address_type().await?.into());
    let name = device.name().await?;
    let manufacturer_data = device.manufacturer_data().await?.unwrap_or_default();

    let data = encode_properties(name.as_deref(), &manufacturer_data);
    if data.is_empty() {
        return Ok(None);
    }
    Ok(Some(ScanEvent::Advertisement { address, data }))
}

async fn send_advertisement(device: &Device, tx: &mpsc::Sender<ScanEvent>) {
    match advertisement(device).await {
        Ok(Some(event)) => {
            let _ = tx.send(event).await;
        }
        Ok(None) => {}
        Err(e) => debug!("{}: {e}", device.address()),
    }
}

/// Whether a device snapshot should be forwarded.
///
/// `property` is `None` for the snapshot taken when a device is first
/// reported. BlueZ also reports devices cached from earlier scans, and only
/// those heard in the current discovery carry an RSSI, so the first snapshot
/// waits for one. Later snapshots follow advertised property changes.
fn should_forward(rssi: Option<i16>, property: Option<&DeviceProperty>) -> bool {
    match property {
        None => rssi.is_some(),
        Some(
            DeviceProperty::Name(_) | DeviceProperty::ManufacturerData(_) | DeviceProperty::Rssi(_),
        ) => true,
        Some(_) => false,
    }
}

/// Forward a device's properties once it is heard, and on every later
/// advertised change.
async fn watch_device(
    adapter: &Adapter,
    address: Address,
    tx: mpsc::Sender<ScanEvent>,
) -> Result<(), ScanError> {
    let device = adapter.device(address)?;
    let mut events = device.events().await?;

    if should_forward(device.rssi().await?, None) {
        send_advertisement(&device, &tx).await;
    } else {
        debug!("{address}: cached, waiting for an advertisement");
    }

    while let Some(event) = events.next().await {
        let DeviceEvent::PropertyChanged(property) = event;
        if should_forward(None, Some(&property)) {
            send_advertisement(&device, &tx).await;
        }
        if tx.is_closed() {
            break;
        }
    }

    Ok(())
}

/// Start LE discovery through BlueZ and forward advertisements.
pub async fn start_scan(duration: Option<Duration>) -> Result<mpsc::Receiver<ScanEvent>, ScanError> {
    let session = Session::new().await?;
    let adapter = session.default_adapter().await?;
    adapter.set_powered(true).await?;
    adapter
        .set_discovery_filter(DiscoveryFilter {
            transport: DiscoveryTransport::Le,
            duplicate_data: true,
            ..Default::default()
        })
        .await?;

    let discover = adapter.discover_devices().await?;
    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_BUFFER_SIZE);

    // Spawn a task that owns all Bluetooth state and runs the event loop
    tokio::spawn(async move {
        let _session = session;
        let mut discover = Box::pin(discover);
        let mut watchers: Vec<JoinHandle<()>> = Vec::new();
        let window = scan_window(duration);
        tokio::pin!(window);

        loop {
            tokio::select! {
                _ = &mut window => {
                    let _ = tx.send(ScanEvent::Timeout).await;
                    break;
                }
                event = discover.next() => match event {
                    Some(AdapterEvent::DeviceAdded(address)) => {
                        let adapter = adapter.clone();
                        let tx = tx.clone();
                        watchers.retain(|w| !w.is_finished());
                        watchers.push(tokio::spawn(async move {
                            if let Err(e) = watch_device(&adapter, address, tx).await {
                                warn!("{address}: {e}");
                            }
                        }));
                    }
                    Some(_) => {}
                    None => break,
                },
            }
        }

        // Dropping the watchers' senders closes the channel.
        for watcher in watchers {
            watcher.abort();
        }
    });

    Ok(rx)
}
