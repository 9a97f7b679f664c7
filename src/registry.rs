//! Registry of discovered devices.

use crate::entity::DeviceEntity;
use crate::peripheral_id::PeripheralId;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Maps peripheral ids to their [`DeviceEntity`].
///
/// Holds at most one entity per id. Entities are never removed; a sensor that
/// goes away simply stops receiving updates.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: HashMap<PeripheralId, DeviceEntity>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the entity for `id`, building it with `factory` if it is unknown.
    ///
    /// `factory` runs at most once per id. The flag is `true` when the entity
    /// was created by this call.
    pub fn get_or_create<F>(&mut self, id: PeripheralId, factory: F) -> (&mut DeviceEntity, bool)
    where
        F: FnOnce() -> DeviceEntity,
    {
        match self.devices.entry(id) {
            Entry::Occupied(entry) => (entry.into_mut(), false),
            Entry::Vacant(entry) => (entry.insert(factory()), true),
        }
    }

    /// Look up an entity without creating it.
    pub fn get(&self, id: &PeripheralId) -> Option<&DeviceEntity> {
        self.devices.get(id)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// All known devices, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &DeviceEntity> {
        self.devices.values()
    }
}
