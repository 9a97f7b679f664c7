//! Boundary to the Bluetooth radio stack.
//!
//! The radio stack is a collaborator: it reports adapter state changes and
//! discovered advertisements as [`RadioEvent`]s over a channel, and accepts a
//! single command, [`RadioStack::start_scanning`].

use crate::peripheral_id::PeripheralId;
use crate::scanner::ScanError;
use std::fmt;

/// One sighting of a peripheral as delivered by the radio stack: its
/// advertisement, joined with the scan response when there is one.
#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastPacket {
    /// Identifier of the broadcasting peripheral
    pub id: PeripheralId,
    /// Manufacturer-specific data including the leading 2-byte company id,
    /// or `None` if the advertisement carried none
    pub manufacturer_data: Option<Vec<u8>>,
}

/// Adapter power/availability state as reported by the radio stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RadioState {
    #[default]
    Unknown,
    Resetting,
    Unsupported,
    Unauthorized,
    PoweredOff,
    PoweredOn,
}

impl fmt::Display for RadioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RadioState::Unknown => "unknown",
            RadioState::Resetting => "resetting",
            RadioState::Unsupported => "unsupported",
            RadioState::Unauthorized => "unauthorized",
            RadioState::PoweredOff => "poweredOff",
            RadioState::PoweredOn => "poweredOn",
        };
        f.write_str(name)
    }
}

/// Events delivered by the radio stack, one at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum RadioEvent {
    StateChange(RadioState),
    Discover(BroadcastPacket),
}

/// Parameters of the start-scanning command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    /// 16-bit service UUIDs to restrict the scan to; empty means every
    /// advertising device.
    pub service_uuids: Vec<u16>,
    /// Deliver every advertisement instead of one per device.
    pub allow_duplicates: bool,
}

impl ScanRequest {
    /// Continuous scan for all advertisers with duplicate reports enabled.
    pub fn all_devices() -> Self {
        Self {
            service_uuids: Vec::new(),
            allow_duplicates: true,
        }
    }
}

/// Command side of the radio stack.
pub trait RadioStack: Send {
    fn start_scanning(&mut self, request: &ScanRequest) -> Result<(), ScanError>;
}

impl<R: RadioStack + ?Sized> RadioStack for Box<R> {
    fn start_scanning(&mut self, request: &ScanRequest) -> Result<(), ScanError> {
        (**self).start_scanning(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_devices_request() {
        let request = ScanRequest::all_devices();
        assert!(request.service_uuids.is_empty());
        assert!(request.allow_duplicates);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(RadioState::PoweredOn.to_string(), "poweredOn");
        assert_eq!(RadioState::PoweredOff.to_string(), "poweredOff");
        assert_eq!(RadioState::default(), RadioState::Unknown);
    }
}
