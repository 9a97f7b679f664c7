//! Advertisement filter for the Tempo Disk device family.
//!
//! Nearby radios broadcast all kinds of manufacturer data; only payloads with
//! the Blue Maestro vendor code and the exact payload length are accepted.
//! A rejection is a routine outcome, not an error, and is only logged.

use crate::payload::{PAYLOAD_LEN, Payload, VENDOR_CODE};
use crate::radio::BroadcastPacket;
use log::Level;
use thiserror::Error;

/// Why an advertisement was not accepted.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    #[error("no manufacturer data")]
    NoManufacturerData,
    /// Too short to carry a vendor code at all
    #[error("manufacturer data too short for a vendor code ({0} bytes)")]
    Truncated(usize),
    #[error("foreign vendor code {0:#06x}")]
    ForeignVendor(u16),
    #[error("unexpected manufacturer data length {0} (expected {PAYLOAD_LEN})")]
    UnexpectedLength(usize),
}

impl Rejection {
    /// Level a rejection is logged at.
    ///
    /// Foreign broadcasts are constant background noise. A Tempo Disk payload
    /// of the wrong length is worth seeing, it usually means an unsupported
    /// firmware version.
    pub fn log_level(&self) -> Level {
        match self {
            Rejection::NoManufacturerData
            | Rejection::Truncated(_)
            | Rejection::ForeignVendor(_) => Level::Debug,
            Rejection::UnexpectedLength(_) => Level::Info,
        }
    }
}

/// Check whether `packet` is a well-formed Tempo Disk broadcast.
///
/// On acceptance the manufacturer data is returned as a fixed-size
/// [`Payload`], which is the only input [`crate::payload::decode`] takes.
pub fn check(packet: &BroadcastPacket) -> Result<&Payload, Rejection> {
    let data = packet
        .manufacturer_data
        .as_deref()
        .ok_or(Rejection::NoManufacturerData)?;

    let vendor = match data {
        [lo, hi, ..] => u16::from_le_bytes([*lo, *hi]),
        _ => return Err(Rejection::Truncated(data.len())),
    };
    if vendor != VENDOR_CODE {
        return Err(Rejection::ForeignVendor(vendor));
    }

    data.try_into()
        .map_err(|_| Rejection::UnexpectedLength(data.len()))
}
