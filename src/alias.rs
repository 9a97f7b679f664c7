//! Per-device display names.
//!
//! Every Tempo Disk gets the configured display name by default. An alias
//! gives one specific sensor its own name, e.g. `--alias a1b2c3d4e5f6=Cellar`.

use crate::peripheral_id::PeripheralId;
use std::collections::BTreeMap;

/// Peripheral id to display name.
pub type AliasMap = BTreeMap<PeripheralId, String>;

/// A display name bound to one peripheral.
#[derive(Debug, Clone, PartialEq)]
pub struct Alias {
    pub id: PeripheralId,
    pub name: String,
}

/// Parse an alias in the format `ID=NAME`.
///
/// The id may be written as `AA:BB:CC:DD:EE:FF` or `aabbccddeeff`.
///
/// # Example
/// ```
/// use tempodisk_listener::alias::parse_alias;
///
/// let alias = parse_alias("AA:BB:CC:DD:EE:FF=Cellar").unwrap();
/// assert_eq!(alias.id.to_string(), "aabbccddeeff");
/// assert_eq!(alias.name, "Cellar");
/// ```
pub fn parse_alias(src: &str) -> Result<Alias, String> {
    let (id, name) = src
        .split_once('=')
        .ok_or_else(|| "invalid alias: expected format ID=NAME".to_string())?;
    if name.is_empty() {
        return Err("invalid alias: name must not be empty".to_string());
    }
    let id = id.trim().parse().map_err(|e| format!("{e}"))?;
    Ok(Alias {
        id,
        name: name.to_string(),
    })
}

/// Collect aliases into a lookup map. Later entries win.
pub fn to_map(aliases: &[Alias]) -> AliasMap {
    aliases.iter().map(|a| (a.id, a.name.clone())).collect()
}
