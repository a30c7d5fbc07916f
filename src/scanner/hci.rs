//! Raw HCI socket backend for TPMS scanning.
//!
//! This backend uses raw Linux HCI sockets to receive LE advertising reports
//! without requiring the BlueZ daemon. It requires CAP_NET_RAW and
//! CAP_NET_ADMIN capabilities or root privileges.

use super::{EVENT_CHANNEL_BUFFER_SIZE, ScanError, scan_window};
use crate::address::{AddressKind, DeviceAddress};
use crate::handler::ScanEvent;
use libc::{AF_BLUETOOTH, SOCK_CLOEXEC, SOCK_RAW, c_int, c_void, sockaddr, socklen_t};
use log::{debug, warn};
use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::time::Duration;
use tokio::io::unix::AsyncFd;
use tokio::sync::mpsc;

// HCI protocol constants
const BTPROTO_HCI: c_int = 1;
const HCI_FILTER: c_int = 2;
const SOL_HCI: c_int = 0;
const HCI_CHANNEL_RAW: u16 = 0;
const HCI_DEV: u16 = 0;

// HCI packet types
const HCI_COMMAND_PKT: u8 = 0x01;
const HCI_EVENT_PKT: u8 = 0x04;

// HCI events
const EVT_LE_META_EVENT: u8 = 0x3E;
const EVT_LE_ADVERTISING_REPORT: u8 = 0x02;

// HCI commands
const OGF_LE_CTL: u16 = 0x08;
const OCF_LE_SET_SCAN_PARAMETERS: u16 = 0x000B;
const OCF_LE_SET_SCAN_ENABLE: u16 = 0x000C;

// Scan configuration: active scanning so scan responses (which often carry
// the device name) are requested. Interval and window in 0.625ms units.
const LE_SCAN_ACTIVE: u8 = 0x01;
const SCAN_INTERVAL: u16 = 200;
const SCAN_WINDOW: u16 = 100;
const LE_PUBLIC_ADDRESS: u8 = 0x00;
const FILTER_POLICY_ACCEPT_ALL: u8 = 0x00;

/// Max HCI event size: header plus 255 parameter bytes.
const HCI_MAX_EVENT_SIZE: usize = 260;

/// HCI socket address structure
#[repr(C)]
struct SockaddrHci {
    hci_family: u16,
    hci_dev: u16,
    hci_channel: u16,
}

/// HCI filter structure for raw sockets
#[repr(C)]
struct HciFilter {
    type_mask: u32,
    event_mask: [u32; 2],
    opcode: u16,
}

impl HciFilter {
    fn new() -> Self {
        Self {
            type_mask: 0,
            event_mask: [0, 0],
            opcode: 0,
        }
    }

    fn set_ptype(&mut self, ptype: u8) {
        self.type_mask |= 1 << (ptype as u32);
    }

    fn set_event(&mut self, event: u8) {
        let bit = event as usize;
        self.event_mask[bit / 32] |= 1 << (bit % 32);
    }
}

/// LE Set Scan Parameters command parameters.
struct ScanParameters {
    scan_type: u8,
    interval: u16,
    window: u16,
    own_address_type: u8,
    filter_policy: u8,
}

impl ScanParameters {
    fn to_bytes(&self) -> [u8; 7] {
        let [i0, i1] = self.interval.to_le_bytes();
        let [w0, w1] = self.window.to_le_bytes();
        [
            self.scan_type,
            i0,
            i1,
            w0,
            w1,
            self.own_address_type,
            self.filter_policy,
        ]
    }
}

/// Create an HCI command packet
fn hci_command_packet(ogf: u16, ocf: u16, params: &[u8]) -> Vec<u8> {
    let opcode = (ogf << 10) | ocf;
    let mut packet = Vec::with_capacity(4 + params.len());
    packet.push(HCI_COMMAND_PKT);
    packet.extend_from_slice(&opcode.to_le_bytes());
    packet.push(params.len() as u8);
    packet.extend_from_slice(params);
    packet
}

fn last_os_error(what: &str) -> ScanError {
    ScanError::Bluetooth(format!("{what}: {}", io::Error::last_os_error()))
}

/// Open a non-blocking raw HCI socket
fn open_hci_socket() -> Result<OwnedFd, ScanError> {
    let fd = unsafe {
        libc::socket(
            AF_BLUETOOTH,
            SOCK_RAW | SOCK_CLOEXEC | libc::SOCK_NONBLOCK,
            BTPROTO_HCI,
        )
    };

    if fd < 0 {
        return Err(last_os_error("Failed to create HCI socket"));
    }

    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

/// Bind HCI socket to a device
fn bind_hci_socket(fd: &OwnedFd, dev_id: u16) -> Result<(), ScanError> {
    let addr = SockaddrHci {
        hci_family: AF_BLUETOOTH as u16,
        hci_dev: dev_id,
        hci_channel: HCI_CHANNEL_RAW,
    };

    let ret = unsafe {
        libc::bind(
            fd.as_raw_fd(),
            &addr as *const SockaddrHci as *const sockaddr,
            mem::size_of::<SockaddrHci>() as socklen_t,
        )
    };

    if ret < 0 {
        return Err(last_os_error("Failed to bind HCI socket"));
    }

    Ok(())
}

/// Only let LE meta events through
fn set_hci_filter(fd: &OwnedFd) -> Result<(), ScanError> {
    let mut filter = HciFilter::new();
    filter.set_ptype(HCI_EVENT_PKT);
    filter.set_event(EVT_LE_META_EVENT);

    let ret = unsafe {
        libc::setsockopt(
            fd.as_raw_fd(),
            SOL_HCI,
            HCI_FILTER,
            &filter as *const HciFilter as *const c_void,
            mem::size_of::<HciFilter>() as socklen_t,
        )
    };

    if ret < 0 {
        return Err(last_os_error("Failed to set HCI filter"));
    }

    Ok(())
}

fn send_hci_command(fd: &OwnedFd, packet: &[u8]) -> Result<(), ScanError> {
    let ret = unsafe {
        libc::write(
            fd.as_raw_fd(),
            packet.as_ptr() as *const c_void,
            packet.len(),
        )
    };

    if ret < 0 {
        return Err(last_os_error("Failed to send HCI command"));
    }

    Ok(())
}

fn configure_le_scan(fd: &OwnedFd) -> Result<(), ScanError> {
    let params = ScanParameters {
        scan_type: LE_SCAN_ACTIVE,
        interval: SCAN_INTERVAL,
        window: SCAN_WINDOW,
        own_address_type: LE_PUBLIC_ADDRESS,
        filter_policy: FILTER_POLICY_ACCEPT_ALL,
    };
    let packet = hci_command_packet(OGF_LE_CTL, OCF_LE_SET_SCAN_PARAMETERS, &params.to_bytes());
    send_hci_command(fd, &packet)?;
    set_scan_enable(fd, true)
}

fn set_scan_enable(fd: &OwnedFd, enable: bool) -> Result<(), ScanError> {
    // Second byte: don't filter duplicates, every advertisement may carry a
    // fresh reading.
    let packet = hci_command_packet(OGF_LE_CTL, OCF_LE_SET_SCAN_ENABLE, &[enable as u8, 0x00]);
    send_hci_command(fd, &packet)
}

fn address_kind(addr_type: u8) -> AddressKind {
    // 0x00/0x02 are (identity) public, 0x01/0x03 (identity) random.
    if addr_type & 0x01 == 0 {
        AddressKind::Public
    } else {
        AddressKind::Random
    }
}

/// Split an LE advertising report event into one [`ScanEvent`] per report.
///
/// `packet` starts with the HCI packet type byte. Reports that run past the
/// end of the packet are dropped along with everything after them.
fn parse_advertising_reports(packet: &[u8]) -> Vec<ScanEvent> {
    let mut events = Vec::new();

    // packet type, event code, parameter length, subevent
    let Some(report) = packet.get(4..) else {
        return events;
    };
    let Some((&num_reports, mut rest)) = report.split_first() else {
        return events;
    };

    for _ in 0..num_reports {
        // event type(1) + address type(1) + address(6) + data length(1)
        let Some(header) = rest.get(..9) else {
            debug!("advertising report header truncated");
            break;
        };
        let data_len = usize::from(header[8]);
        let Some(data) = rest.get(9..9 + data_len) else {
            debug!("advertising report data truncated");
            break;
        };

        let mut bytes = [0u8; 6];
        bytes.copy_from_slice(&header[2..8]);
        bytes.reverse(); // HCI sends addresses least significant byte first

        events.push(ScanEvent::Advertisement {
            address: DeviceAddress::new(bytes, address_kind(header[1])),
            data: data.to_vec(),
        });

        // skip the trailing RSSI byte
        rest = rest.get(9 + data_len + 1..).unwrap_or_default();
    }

    events
}

fn read_packet(fd: &OwnedFd, buf: &mut [u8]) -> io::Result<usize> {
    let ret = unsafe { libc::read(fd.as_raw_fd(), buf.as_mut_ptr() as *mut c_void, buf.len()) };
    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret as usize)
    }
}

/// Start scanning for advertisements using raw HCI sockets on hci0.
///
/// # Requirements
/// - CAP_NET_RAW and CAP_NET_ADMIN capabilities or root privileges
/// - An available HCI device (typically hci0)
pub async fn start_scan(duration: Option<Duration>) -> Result<mpsc::Receiver<ScanEvent>, ScanError> {
    let fd = open_hci_socket()?;
    bind_hci_socket(&fd, HCI_DEV)?;
    set_hci_filter(&fd)?;

    // Commands go through a second socket so the filter on the first one
    // only has to let events through.
    let cmd_fd = open_hci_socket()?;
    bind_hci_socket(&cmd_fd, HCI_DEV)?;
    configure_le_scan(&cmd_fd)?;

    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_BUFFER_SIZE);

    let async_fd = AsyncFd::new(fd)
        .map_err(|e| ScanError::Bluetooth(format!("Failed to create async fd: {}", e)))?;

    tokio::spawn(async move {
        let mut buf = [0u8; HCI_MAX_EVENT_SIZE];
        let window = scan_window(duration);
        tokio::pin!(window);

        'scan: loop {
            let mut guard = tokio::select! {
                _ = &mut window => {
                    let _ = tx.send(ScanEvent::Timeout).await;
                    break 'scan;
                }
                guard = async_fd.readable() => match guard {
                    Ok(guard) => guard,
                    Err(e) => {
                        warn!("HCI socket error: {e}");
                        break 'scan;
                    }
                },
            };

            // Drain all available packets before waiting again
            loop {
                let n = match guard.try_io(|inner| read_packet(inner.get_ref(), &mut buf)) {
                    Ok(Ok(n)) if n > 0 => n,
                    Ok(Ok(_)) => break,
                    Ok(Err(e)) => {
                        warn!("HCI read error: {e}");
                        break;
                    }
                    Err(_would_block) => break,
                };

                if n >= 4
                    && buf[0] == HCI_EVENT_PKT
                    && buf[1] == EVT_LE_META_EVENT
                    && buf[3] == EVT_LE_ADVERTISING_REPORT
                {
                    for event in parse_advertising_reports(&buf[..n]) {
                        if tx.send(event).await.is_err() {
                            break 'scan;
                        }
                    }
                }
            }
        }

        if let Err(e) = set_scan_enable(&cmd_fd, false) {
            warn!("{e}");
        }
    });

    Ok(rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_packet(reports: &[(u8, [u8; 6], Vec<u8>)]) -> Vec<u8> {
        let mut params = vec![EVT_LE_ADVERTISING_REPORT, reports.len() as u8];
        for (addr_type, addr, data) in reports {
            params.push(0x00); // ADV_IND
            params.push(*addr_type);
            params.extend(addr.iter().rev());
            params.push(data.len() as u8);
            params.extend_from_slice(data);
            params.push(0xC5); // RSSI
        }
        let mut packet = vec![HCI_EVENT_PKT, EVT_LE_META_EVENT, params.len() as u8];
        packet.extend(params);
        packet
    }

    #[test]
    fn test_hci_filter_setup() {
        let mut filter = HciFilter::new();
        filter.set_ptype(HCI_EVENT_PKT);
        filter.set_event(EVT_LE_META_EVENT);

        assert_eq!(filter.type_mask, 1 << HCI_EVENT_PKT);
        // EVT_LE_META_EVENT (0x3E = 62) sets bit 30 in event_mask[1]
        assert_eq!(filter.event_mask[1], 1 << (EVT_LE_META_EVENT % 32));
    }

    #[test]
    fn test_hci_command_packet() {
        let packet = hci_command_packet(OGF_LE_CTL, OCF_LE_SET_SCAN_ENABLE, &[0x01, 0x00]);
        assert_eq!(packet, vec![0x01, 0x0C, 0x20, 0x02, 0x01, 0x00]);
    }

    #[test]
    fn test_scan_parameters_bytes() {
        let params = ScanParameters {
            scan_type: LE_SCAN_ACTIVE,
            interval: SCAN_INTERVAL,
            window: SCAN_WINDOW,
            own_address_type: LE_PUBLIC_ADDRESS,
            filter_policy: FILTER_POLICY_ACCEPT_ALL,
        };
        assert_eq!(params.to_bytes(), [0x01, 0xC8, 0x00, 0x64, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_parse_single_report() {
        let addr = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x01];
        let data = [0x05, 0x09, b'T', b'P', b'M', b'S'];
        let events = parse_advertising_reports(&report_packet(&[(0x01, addr, data.to_vec())]));

        assert_eq!(
            events,
            vec![ScanEvent::Advertisement {
                address: DeviceAddress::random(addr),
                data: data.to_vec(),
            }]
        );
    }

    #[test]
    fn test_parse_multiple_reports() {
        let a = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x01];
        let b = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66];
        let events = parse_advertising_reports(&report_packet(&[
            (0x00, a, vec![0x02, 0x01, 0x06]),
            (0x03, b, vec![]),
        ]));

        assert_eq!(events.len(), 2);
        assert_eq!(
            events[1],
            ScanEvent::Advertisement {
                address: DeviceAddress::random(b),
                data: vec![],
            }
        );
        assert!(matches!(
            &events[0],
            ScanEvent::Advertisement { address, .. } if *address == DeviceAddress::public(a)
        ));
    }

    #[test]
    fn test_parse_truncated_report() {
        let addr = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x01];
        let mut packet = report_packet(&[(0x00, addr, vec![0x02, 0x01, 0x06])]);
        packet.truncate(packet.len() - 3);
        assert!(parse_advertising_reports(&packet).is_empty());

        assert!(parse_advertising_reports(&[HCI_EVENT_PKT, EVT_LE_META_EVENT]).is_empty());
    }
}
