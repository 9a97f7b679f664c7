//! BlueZ D-Bus radio backend.
//!
//! This backend uses the `bluer` crate to communicate with the BlueZ daemon
//! via D-Bus. It requires the `bluetoothd` daemon to be running. BlueZ scans
//! actively, so a device's manufacturer data covers both its advertisement
//! and its scan response.

use super::{EVENT_CHANNEL_BUFFER_SIZE, RadioConnection, ScanError, with_company_id};
use crate::payload::VENDOR_CODE;
use crate::peripheral_id::PeripheralId;
use crate::radio::{BroadcastPacket, RadioEvent, RadioStack, RadioState, ScanRequest};
use bluer::{
    Adapter, AdapterEvent, AdapterProperty, Address, DiscoveryFilter, DiscoveryTransport, Session,
    Uuid,
};
use futures::{Stream, StreamExt};
use log::{debug, warn};
use std::collections::HashMap;
use std::pin::Pin;
use tokio::sync::mpsc;

/// Bluetooth base UUID, the 16-bit service UUID goes into bits 96..112.
const BASE_UUID: u128 = 0x0000_0000_0000_1000_8000_0080_5F9B_34FB;

type DiscoveryStream = Pin<Box<dyn Stream<Item = AdapterEvent> + Send>>;

impl From<bluer::Error> for ScanError {
    fn from(err: bluer::Error) -> Self {
        ScanError::Bluetooth(err.to_string())
    }
}

/// Command handle for the BlueZ backend task.
#[derive(Debug)]
struct BluerRadio {
    commands: mpsc::UnboundedSender<ScanRequest>,
}

impl RadioStack for BluerRadio {
    fn start_scanning(&mut self, request: &ScanRequest) -> Result<(), ScanError> {
        self.commands
            .send(request.clone())
            .map_err(|_| ScanError::Stopped)
    }
}

fn radio_state(powered: bool) -> RadioState {
    if powered {
        RadioState::PoweredOn
    } else {
        RadioState::PoweredOff
    }
}

fn service_uuid(short: u16) -> Uuid {
    Uuid::from_u128(BASE_UUID | (u128::from(short) << 96))
}

fn discovery_filter(request: &ScanRequest) -> DiscoveryFilter {
    DiscoveryFilter {
        uuids: request.service_uuids.iter().copied().map(service_uuid).collect(),
        transport: DiscoveryTransport::Le,
        duplicate_data: request.allow_duplicates,
        ..Default::default()
    }
}

/// Open the default BlueZ adapter and power it on.
///
/// The adapter state is reported immediately; device discovery begins when
/// [`RadioStack::start_scanning`] is called.
pub async fn open() -> Result<RadioConnection, ScanError> {
    let session = Session::new().await?;
    let adapter = session.default_adapter().await?;
    adapter.set_powered(true).await?;
    let powered = adapter.is_powered().await?;

    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_BUFFER_SIZE);
    let (commands, command_rx) = mpsc::unbounded_channel();

    let _ = tx.send(RadioEvent::StateChange(radio_state(powered))).await;

    // The task owns all Bluetooth state for as long as events are consumed
    tokio::spawn(run(session, adapter, tx, command_rx));

    Ok(RadioConnection {
        stack: Box::new(BluerRadio { commands }),
        events: rx,
    })
}

async fn run(
    session: Session,
    adapter: Adapter,
    tx: mpsc::Sender<RadioEvent>,
    mut commands: mpsc::UnboundedReceiver<ScanRequest>,
) {
    let _session = session;

    let mut adapter_events = match adapter.events().await {
        Ok(events) => Box::pin(events),
        Err(e) => {
            warn!("cannot watch adapter {}: {e}", adapter.name());
            return;
        }
    };
    let mut discovery: Option<DiscoveryStream> = None;

    loop {
        tokio::select! {
            Some(event) = adapter_events.next() => {
                if let AdapterEvent::PropertyChanged(AdapterProperty::Powered(powered)) = event
                    && tx.send(RadioEvent::StateChange(radio_state(powered))).await.is_err()
                {
                    break;
                }
            }
            command = commands.recv() => {
                let Some(request) = command else { break };
                match start_discovery(&adapter, &request).await {
                    Ok(stream) => discovery = Some(stream),
                    Err(e) => warn!("cannot start discovery: {e}"),
                }
            }
            Some(event) = next_discovery_event(&mut discovery) => {
                if let AdapterEvent::DeviceAdded(address) = event {
                    match forward_device(&adapter, address, &tx).await {
                        Ok(true) => {}
                        Ok(false) => break,
                        Err(e) => debug!("cannot read device {address}: {e}"),
                    }
                }
            }
            else => break,
        }
    }
}

async fn start_discovery(
    adapter: &Adapter,
    request: &ScanRequest,
) -> Result<DiscoveryStream, ScanError> {
    adapter.set_discovery_filter(discovery_filter(request)).await?;
    let events = adapter.discover_devices_with_changes().await?;
    Ok(Box::pin(events))
}

async fn next_discovery_event(discovery: &mut Option<DiscoveryStream>) -> Option<AdapterEvent> {
    match discovery {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

/// Read manufacturer data of a discovered device and forward it.
///
/// Returns `Ok(false)` once nobody listens for events anymore.
async fn forward_device(
    adapter: &Adapter,
    address: Address,
    tx: &mpsc::Sender<RadioEvent>,
) -> Result<bool, ScanError> {
    let device = adapter.device(address)?;
    let manufacturer_data = device.manufacturer_data().await?;

    let packet = packet(address.into(), manufacturer_data);
    Ok(tx.send(RadioEvent::Discover(packet)).await.is_ok())
}

/// Rebuild the manufacturer data field of a device.
///
/// BlueZ keys manufacturer data by the first two bytes of every AD structure,
/// which splits a Tempo Disk payload spread over advertisement and scan
/// response into two entries. They are joined again, Blue Maestro first and
/// the rest by company id.
fn packet(id: PeripheralId, manufacturer_data: Option<HashMap<u16, Vec<u8>>>) -> BroadcastPacket {
    let manufacturer_data = manufacturer_data
        .filter(|entries| !entries.is_empty())
        .map(|entries| {
            let mut entries: Vec<(u16, Vec<u8>)> = entries.into_iter().collect();
            entries.sort_by_key(|(company_id, _)| (*company_id != VENDOR_CODE, *company_id));
            entries
                .iter()
                .flat_map(|(company_id, data)| with_company_id(*company_id, data))
                .collect()
        });
    BroadcastPacket {
        id,
        manufacturer_data,
    }
}
