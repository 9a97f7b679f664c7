//! Raw HCI socket radio backend.
//!
//! This backend talks to the controller through raw Linux HCI sockets,
//! without the BlueZ daemon. It requires CAP_NET_RAW and CAP_NET_ADMIN
//! capabilities or root privileges.
//!
//! Scanning is active: a Tempo Disk splits its manufacturer data between the
//! advertisement and the scan response, and the two are joined per device
//! before a packet is forwarded.

use super::{EVENT_CHANNEL_BUFFER_SIZE, RadioConnection, ScanError};
use crate::peripheral_id::PeripheralId;
use crate::radio::{BroadcastPacket, RadioEvent, RadioStack, RadioState, ScanRequest};
use libc::{AF_BLUETOOTH, SOCK_CLOEXEC, SOCK_NONBLOCK, SOCK_RAW, c_int, c_void, sockaddr, socklen_t};
use log::{debug, warn};
use std::collections::HashMap;
use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use tokio::io::unix::AsyncFd;
use tokio::sync::mpsc;

const BTPROTO_HCI: c_int = 1;
const SOL_HCI: c_int = 0;
const HCI_FILTER: c_int = 2;
const HCI_CHANNEL_RAW: u16 = 0;

/// First controller, `hci0`.
const HCI_DEV_ID: u16 = 0;

const HCI_COMMAND_PKT: u8 = 0x01;
const HCI_EVENT_PKT: u8 = 0x04;

const EVT_LE_META_EVENT: u8 = 0x3E;
const EVT_LE_ADVERTISING_REPORT: u8 = 0x02;

const OGF_LE_CTL: u16 = 0x08;
const OCF_LE_SET_SCAN_PARAMETERS: u16 = 0x000B;
const OCF_LE_SET_SCAN_ENABLE: u16 = 0x000C;

const LE_SCAN_ACTIVE: u8 = 0x01;
const LE_PUBLIC_ADDRESS: u8 = 0x00;
const FILTER_POLICY_ACCEPT_ALL: u8 = 0x00;

/// Scan interval and window, in 0.625 ms units (10 ms).
const SCAN_INTERVAL: u16 = 0x0010;
const SCAN_WINDOW: u16 = 0x0010;

const AD_TYPE_MANUFACTURER_DATA: u8 = 0xFF;

// Advertising report event types
const ADV_IND: u8 = 0x00;
const ADV_SCAN_IND: u8 = 0x02;
const SCAN_RSP: u8 = 0x04;

/// Scannable advertisements still waiting for their scan response.
const MAX_PENDING_ADVERTISEMENTS: usize = 1024;

/// Largest HCI event: 2 byte header, 255 byte parameters, packet type.
const MAX_EVENT_SIZE: usize = 258;

#[repr(C)]
struct SockaddrHci {
    hci_family: u16,
    hci_dev: u16,
    hci_channel: u16,
}

/// Kernel-side filter selecting which packets a raw socket receives.
#[repr(C)]
struct HciFilter {
    type_mask: u32,
    event_mask: [u32; 2],
    opcode: u16,
}

impl HciFilter {
    /// Only LE meta events.
    fn le_meta_events() -> Self {
        let mut filter = Self {
            type_mask: 0,
            event_mask: [0, 0],
            opcode: 0,
        };
        filter.type_mask |= 1 << u32::from(HCI_EVENT_PKT);
        let bit = usize::from(EVT_LE_META_EVENT);
        filter.event_mask[bit / 32] |= 1 << (bit % 32);
        filter
    }
}

/// Build an HCI command packet.
fn command_packet(ogf: u16, ocf: u16, params: &[u8]) -> Vec<u8> {
    let opcode = (ogf << 10) | ocf;
    let mut packet = Vec::with_capacity(4 + params.len());
    packet.push(HCI_COMMAND_PKT);
    packet.extend_from_slice(&opcode.to_le_bytes());
    packet.push(params.len() as u8);
    packet.extend_from_slice(params);
    packet
}

/// LE Set Scan Parameters: active scan over all advertisers.
fn scan_parameters_command() -> Vec<u8> {
    let mut params = Vec::with_capacity(7);
    params.push(LE_SCAN_ACTIVE);
    params.extend_from_slice(&SCAN_INTERVAL.to_le_bytes());
    params.extend_from_slice(&SCAN_WINDOW.to_le_bytes());
    params.push(LE_PUBLIC_ADDRESS);
    params.push(FILTER_POLICY_ACCEPT_ALL);
    command_packet(OGF_LE_CTL, OCF_LE_SET_SCAN_PARAMETERS, &params)
}

/// LE Set Scan Enable. With duplicates allowed the controller reports every
/// advertisement instead of one per device.
fn scan_enable_command(allow_duplicates: bool) -> Vec<u8> {
    let filter_duplicates = u8::from(!allow_duplicates);
    command_packet(OGF_LE_CTL, OCF_LE_SET_SCAN_ENABLE, &[0x01, filter_duplicates])
}

fn os_error(what: &str) -> ScanError {
    ScanError::Bluetooth(format!("{what}: {}", io::Error::last_os_error()))
}

/// A raw, non-blocking HCI socket bound to one controller.
#[derive(Debug)]
struct HciSocket {
    fd: OwnedFd,
}

impl HciSocket {
    fn open(dev_id: u16) -> Result<Self, ScanError> {
        // nix has no BTPROTO_HCI support; AsyncFd needs SOCK_NONBLOCK
        let fd = unsafe {
            libc::socket(
                AF_BLUETOOTH,
                SOCK_RAW | SOCK_CLOEXEC | SOCK_NONBLOCK,
                BTPROTO_HCI,
            )
        };
        if fd < 0 {
            return Err(os_error("Failed to create HCI socket"));
        }
        let socket = Self {
            fd: unsafe { OwnedFd::from_raw_fd(fd) },
        };

        let addr = SockaddrHci {
            hci_family: AF_BLUETOOTH as u16,
            hci_dev: dev_id,
            hci_channel: HCI_CHANNEL_RAW,
        };
        let ret = unsafe {
            libc::bind(
                socket.fd.as_raw_fd(),
                &addr as *const SockaddrHci as *const sockaddr,
                mem::size_of::<SockaddrHci>() as socklen_t,
            )
        };
        if ret < 0 {
            return Err(os_error(&format!("Failed to bind HCI socket to hci{dev_id}")));
        }

        Ok(socket)
    }

    fn set_filter(&self, filter: &HciFilter) -> Result<(), ScanError> {
        let ret = unsafe {
            libc::setsockopt(
                self.fd.as_raw_fd(),
                SOL_HCI,
                HCI_FILTER,
                filter as *const HciFilter as *const c_void,
                mem::size_of::<HciFilter>() as socklen_t,
            )
        };
        if ret < 0 {
            return Err(os_error("Failed to set HCI filter"));
        }
        Ok(())
    }

    fn send(&self, packet: &[u8]) -> Result<(), ScanError> {
        let ret = unsafe {
            libc::write(
                self.fd.as_raw_fd(),
                packet.as_ptr() as *const c_void,
                packet.len(),
            )
        };
        if ret < 0 {
            return Err(os_error("Failed to send HCI command"));
        }
        Ok(())
    }
}

/// Command handle for the HCI backend.
#[derive(Debug)]
struct HciRadio {
    commands: HciSocket,
}

impl RadioStack for HciRadio {
    fn start_scanning(&mut self, request: &ScanRequest) -> Result<(), ScanError> {
        if !request.service_uuids.is_empty() {
            warn!("hci backend cannot filter by service, scanning all advertisers");
        }
        self.commands.send(&scan_parameters_command())?;
        self.commands.send(&scan_enable_command(request.allow_duplicates))
    }
}

/// Join the content of every manufacturer-data AD structure, company id
/// included, in the order they appear.
fn manufacturer_data(mut ad_data: &[u8]) -> Option<Vec<u8>> {
    let mut found: Option<Vec<u8>> = None;
    while let Some((&len, rest)) = ad_data.split_first() {
        let len = usize::from(len);
        if len == 0 || len > rest.len() {
            break;
        }
        let (structure, tail) = rest.split_at(len);
        if structure[0] == AD_TYPE_MANUFACTURER_DATA {
            found.get_or_insert_with(Vec::new).extend_from_slice(&structure[1..]);
        }
        ad_data = tail;
    }
    found
}

/// One report of an LE Advertising Report event.
#[derive(Debug, Clone, PartialEq)]
struct AdvertisingReport {
    event_type: u8,
    id: PeripheralId,
    manufacturer_data: Option<Vec<u8>>,
}

impl AdvertisingReport {
    /// An active scan follows these with a scan request.
    fn is_scannable(&self) -> bool {
        matches!(self.event_type, ADV_IND | ADV_SCAN_IND)
    }
}

/// Parse an LE Advertising Report event. An event may carry several reports.
fn parse_advertising_report(event: &[u8]) -> Vec<AdvertisingReport> {
    let mut parsed = Vec::new();

    // packet type, event code, parameter length, subevent
    let Some((&num_reports, mut reports)) = event.get(4..).and_then(<[u8]>::split_first) else {
        return parsed;
    };

    for _ in 0..num_reports {
        // event type, address type, address (6, reversed), data length
        if reports.len() < 9 {
            break;
        }
        let mut addr = [0u8; 6];
        addr.copy_from_slice(&reports[2..8]);
        addr.reverse();

        let data_len = usize::from(reports[8]);
        let Some(ad_data) = reports.get(9..9 + data_len) else {
            break;
        };

        parsed.push(AdvertisingReport {
            event_type: reports[0],
            id: PeripheralId(addr),
            manufacturer_data: manufacturer_data(ad_data),
        });

        // skip data and the trailing RSSI byte
        reports = reports.get(9 + data_len + 1..).unwrap_or_default();
    }

    parsed
}

fn join(first: Option<Vec<u8>>, second: Option<Vec<u8>>) -> Option<Vec<u8>> {
    match (first, second) {
        (Some(mut first), Some(second)) => {
            first.extend(second);
            Some(first)
        }
        (first, second) => first.or(second),
    }
}

/// Turns advertising reports into broadcast packets.
///
/// A scannable advertisement is held back until its scan response arrives,
/// and the response's manufacturer data is appended to the advertised one.
/// Other advertisements are forwarded as they are.
#[derive(Debug, Default)]
struct ReportAssembler {
    pending: HashMap<PeripheralId, Option<Vec<u8>>>,
}

impl ReportAssembler {
    fn push(&mut self, report: AdvertisingReport) -> Option<BroadcastPacket> {
        if report.event_type == SCAN_RSP {
            let advertised = self.pending.remove(&report.id).flatten();
            return Some(BroadcastPacket {
                id: report.id,
                manufacturer_data: join(advertised, report.manufacturer_data),
            });
        }

        if report.is_scannable() {
            if self.pending.len() >= MAX_PENDING_ADVERTISEMENTS
                && !self.pending.contains_key(&report.id)
            {
                debug!("dropping {} advertisements without scan response", self.pending.len());
                self.pending.clear();
            }
            self.pending.insert(report.id, report.manufacturer_data);
            return None;
        }

        Some(BroadcastPacket {
            id: report.id,
            manufacturer_data: report.manufacturer_data,
        })
    }
}

/// Open `hci0` for LE advertising reports.
///
/// The controller is reported as powered on once both sockets are bound;
/// scanning is enabled by [`RadioStack::start_scanning`].
pub async fn open() -> Result<RadioConnection, ScanError> {
    let events = HciSocket::open(HCI_DEV_ID)?;
    events.set_filter(&HciFilter::le_meta_events())?;
    let commands = HciSocket::open(HCI_DEV_ID)?;

    let async_fd = AsyncFd::new(events.fd)
        .map_err(|e| ScanError::Bluetooth(format!("Failed to create async fd: {e}")))?;

    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_BUFFER_SIZE);
    let _ = tx.send(RadioEvent::StateChange(RadioState::PoweredOn)).await;

    tokio::spawn(async move {
        if let Err(e) = read_events(async_fd, &tx).await {
            warn!("HCI socket closed: {e}");
            let _ = tx.send(RadioEvent::StateChange(RadioState::Unknown)).await;
        }
    });

    Ok(RadioConnection {
        stack: Box::new(HciRadio { commands }),
        events: rx,
    })
}

/// Read HCI events until the socket fails or the receiver goes away.
async fn read_events(async_fd: AsyncFd<OwnedFd>, tx: &mpsc::Sender<RadioEvent>) -> io::Result<()> {
    let mut buf = [0u8; MAX_EVENT_SIZE];
    let mut assembler = ReportAssembler::default();

    loop {
        let mut guard = async_fd.readable().await?;

        // Drain all available packets before waiting again
        loop {
            let n = match guard.try_io(|inner| {
                let ret = unsafe {
                    libc::read(
                        inner.as_raw_fd(),
                        buf.as_mut_ptr() as *mut c_void,
                        buf.len(),
                    )
                };
                if ret < 0 {
                    Err(io::Error::last_os_error())
                } else {
                    Ok(ret as usize)
                }
            }) {
                Ok(Ok(n)) if n > 0 => n,
                Ok(Ok(_)) => return Ok(()),
                Ok(Err(e)) => return Err(e),
                Err(_would_block) => break,
            };

            let is_advertising_report = n >= 4
                && buf[0] == HCI_EVENT_PKT
                && buf[1] == EVT_LE_META_EVENT
                && buf[3] == EVT_LE_ADVERTISING_REPORT;
            if !is_advertising_report {
                continue;
            }

            for report in parse_advertising_report(&buf[..n]) {
                let Some(packet) = assembler.push(report) else {
                    continue;
                };
                if tx.send(RadioEvent::Discover(packet)).await.is_err() {
                    debug!("radio event receiver dropped");
                    return Ok(());
                }
            }
        }
    }
}
