//! Bluetooth radio backends.
//!
//! Each backend opens an adapter and hands back a [`RadioConnection`]: a
//! command handle implementing [`RadioStack`] and a channel of
//! [`RadioEvent`]s. Backends do no Tempo Disk filtering of their own; every
//! advertisement with manufacturer data is forwarded.

#[cfg(feature = "bluer")]
pub mod bluer;

#[cfg(feature = "hci")]
pub mod hci;

use crate::radio::{RadioEvent, RadioStack};
use thiserror::Error;
use tokio::sync::mpsc;

/// Error type for radio backend operations.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Bluetooth/adapter related error
    #[error("Bluetooth error: {0}")]
    Bluetooth(String),
    /// The backend task is gone and can no longer take commands
    #[error("radio backend stopped")]
    Stopped,
}

/// Channel buffer size for radio events.
pub const EVENT_CHANNEL_BUFFER_SIZE: usize = 100;

/// An opened radio: where to send commands and where events arrive.
pub struct RadioConnection {
    pub stack: Box<dyn RadioStack>,
    pub events: mpsc::Receiver<RadioEvent>,
}

impl std::fmt::Debug for RadioConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadioConnection").finish_non_exhaustive()
    }
}

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

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(feature = "bluer")]
            Backend::Bluer => write!(f, "bluer"),
            #[cfg(feature = "hci")]
            Backend::Hci => write!(f, "hci"),
            #[cfg(not(any(feature = "bluer", feature = "hci")))]
            _ => unreachable!("Backend enum has no variants when no backend features are enabled"),
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            #[cfg(feature = "bluer")]
            "bluer" | "bluez" => Ok(Backend::Bluer),
            #[cfg(feature = "hci")]
            "hci" | "raw" => Ok(Backend::Hci),
            _ => Err(format!("Unknown backend: {}", s)),
        }
    }
}

/// Prefix manufacturer data with its company id, as it appears on air.
///
/// BlueZ reports manufacturer data keyed by company id with the id stripped;
/// the filter expects the raw field.
pub fn with_company_id(company_id: u16, data: &[u8]) -> Vec<u8> {
    let mut raw = Vec::with_capacity(2 + data.len());
    raw.extend_from_slice(&company_id.to_le_bytes());
    raw.extend_from_slice(data);
    raw
}

/// Open the radio using the specified backend.
///
/// The connection's event channel first reports the adapter state; scanning
/// starts only once the discovery loop asks for it.
pub async fn open(backend: Backend) -> Result<RadioConnection, ScanError> {
    match backend {
        #[cfg(feature = "bluer")]
        Backend::Bluer => bluer::open().await,
        #[cfg(feature = "hci")]
        Backend::Hci => hci::open().await,
    }
}
