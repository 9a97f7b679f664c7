//! Identifier of a broadcasting Bluetooth peripheral.
//!
//! The radio backends report the 48-bit device address; the rest of the crate
//! treats it as an opaque, hashable key.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Stable identifier of a broadcasting peripheral (its 48-bit address).
///
/// Displayed as twelve lowercase hex digits without separators
/// (`a1b2c3d4e5f6`), which is also the suffix of the entity id handed to the
/// host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct PeripheralId(pub [u8; 6]);

impl PeripheralId {
    /// The address in the conventional colon-separated uppercase notation.
    pub fn to_address_string(&self) -> String {
        let b = &self.0;
        format!(
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl fmt::Display for PeripheralId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Errors returned when parsing a peripheral identifier.
#[derive(Error, Debug, PartialEq)]
pub enum ParseIdError {
    #[error("invalid peripheral id: expected 12 hex digits, got {0}")]
    InvalidLength(usize),
    #[error("invalid peripheral id: '{0}' is not valid hex")]
    InvalidHex(String),
}

impl FromStr for PeripheralId {
    type Err = ParseIdError;

    /// Accepts both `AA:BB:CC:DD:EE:FF` and `aabbccddeeff`, in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s.chars().filter(|c| *c != ':' && *c != '-').collect();
        if digits.len() != 12 {
            return Err(ParseIdError::InvalidLength(digits.len()));
        }
        if !digits.is_ascii() {
            return Err(ParseIdError::InvalidHex(s.to_string()));
        }

        let mut bytes = [0u8; 6];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let pair = &digits[i * 2..i * 2 + 2];
            *byte = u8::from_str_radix(pair, 16)
                .map_err(|_| ParseIdError::InvalidHex(pair.to_string()))?;
        }

        Ok(PeripheralId(bytes))
    }
}

impl From<[u8; 6]> for PeripheralId {
    fn from(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }
}

#[cfg(feature = "bluer")]
impl From<bluer::Address> for PeripheralId {
    fn from(addr: bluer::Address) -> Self {
        Self(addr.0)
    }
}
