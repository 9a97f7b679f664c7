//! Discovery loop: from radio events to host notifications.
//!
//! Each advertisement goes through the same steps:
//! 1. [`filter::check`] drops everything that is not a Tempo Disk payload
//! 2. the registry returns the device, creating it on first sight
//! 3. a new device is announced to the host
//! 4. the payload is decoded and written to the device's properties
//! 5. the host is told about every written property, in fixed order
//!
//! Events are handled one at a time, so the registry needs no locking.

use crate::alias::AliasMap;
use crate::entity::DeviceEntity;
use crate::filter::{self, Rejection};
use crate::host::Host;
use crate::payload;
use crate::peripheral_id::PeripheralId;
use crate::radio::{BroadcastPacket, RadioEvent, RadioStack, RadioState, ScanRequest};
use crate::registry::DeviceRegistry;
use crate::scanner::ScanError;
use log::{debug, info, log};
use std::io;
use thiserror::Error;
use tokio::sync::mpsc;

pub const DEFAULT_DISPLAY_NAME: &str = "Blue Maestro Tempo Disk";
pub const DEFAULT_DESCRIPTION: &str = "Blue Maestro Tempo Disk temperature and humidity sensor";

/// Errors raised by the collaborators while handling an event.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error(transparent)]
    Radio(#[from] ScanError),
    #[error("host error: {0}")]
    Host(#[from] io::Error),
}

/// What happened to one advertisement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketOutcome {
    /// Not a Tempo Disk broadcast; dropped.
    Rejected(Rejection),
    /// Readings were written to a device that was already known.
    Updated,
    /// The device was seen for the first time, announced and updated.
    Added,
}

/// Display metadata given to devices when they are created.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceMetadata {
    pub display_name: String,
    pub description: String,
    /// Per-device display name overrides
    pub aliases: AliasMap,
}

impl Default for DeviceMetadata {
    fn default() -> Self {
        Self {
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            aliases: AliasMap::new(),
        }
    }
}

impl DeviceMetadata {
    /// Build the entity for a newly discovered peripheral.
    pub fn create_entity(&self, id: PeripheralId) -> DeviceEntity {
        let name = self.aliases.get(&id).unwrap_or(&self.display_name);
        DeviceEntity::create(id, name.as_str(), self.description.as_str())
    }
}

/// Routes radio events through filter, registry and decoder to the host.
pub struct DiscoveryLoop<R, H> {
    radio: R,
    host: H,
    metadata: DeviceMetadata,
    registry: DeviceRegistry,
    radio_state: RadioState,
}

impl<R: RadioStack, H: Host> DiscoveryLoop<R, H> {
    pub fn new(radio: R, host: H, metadata: DeviceMetadata) -> Self {
        Self {
            radio,
            host,
            metadata,
            registry: DeviceRegistry::new(),
            radio_state: RadioState::Unknown,
        }
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    /// Last radio state observed.
    pub fn radio_state(&self) -> RadioState {
        self.radio_state
    }

    /// Consume `events` until the radio stack closes the channel.
    pub async fn run(
        &mut self,
        events: &mut mpsc::Receiver<RadioEvent>,
    ) -> Result<(), DiscoveryError> {
        while let Some(event) = events.recv().await {
            self.handle_event(event)?;
        }
        debug!("radio event stream closed");
        Ok(())
    }

    pub fn handle_event(&mut self, event: RadioEvent) -> Result<(), DiscoveryError> {
        match event {
            RadioEvent::StateChange(state) => self.handle_state_change(state),
            RadioEvent::Discover(packet) => self.handle_packet(&packet).map(|_| ()),
        }
    }

    /// Track the adapter state and start scanning whenever it powers on.
    ///
    /// A repeated `poweredOn` without another state in between does not
    /// issue a second scan command.
    pub fn handle_state_change(&mut self, state: RadioState) -> Result<(), DiscoveryError> {
        info!("radio adapter is {state}");

        let previous = std::mem::replace(&mut self.radio_state, state);
        if state == RadioState::PoweredOn && previous != RadioState::PoweredOn {
            info!("start scanning for devices");
            self.radio.start_scanning(&ScanRequest::all_devices())?;
        }
        Ok(())
    }

    /// Run one advertisement through the pipeline.
    pub fn handle_packet(
        &mut self,
        packet: &BroadcastPacket,
    ) -> Result<PacketOutcome, DiscoveryError> {
        let data = match filter::check(packet) {
            Ok(data) => data,
            Err(rejection) => {
                log!(
                    rejection.log_level(),
                    "ignoring advertisement from {}: {rejection}",
                    packet.id
                );
                return Ok(PacketOutcome::Rejected(rejection));
            }
        };

        let metadata = &self.metadata;
        let (device, created) = self
            .registry
            .get_or_create(packet.id, || metadata.create_entity(packet.id));

        if created {
            info!("detected new Tempo Disk with id {}", packet.id);
            self.host.device_added(device)?;
        }

        let reading = payload::decode(data);
        debug!("{}: {reading:?}", packet.id);

        for name in device.update(&reading) {
            self.host.property_changed(device, device.property(name))?;
        }

        Ok(if created {
            PacketOutcome::Added
        } else {
            PacketOutcome::Updated
        })
    }
}
