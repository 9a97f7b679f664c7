//! Boundary to the host that owns device and property registration.

use crate::entity::DeviceEntity;
use crate::property::Property;
use std::io;

/// Receives device and property notifications from the discovery loop.
///
/// Calls arrive on the discovery loop's thread, one at a time.
pub trait Host {
    /// A previously unseen device was discovered. Called once per device,
    /// after its properties are declared and before any value is cached.
    fn device_added(&mut self, device: &DeviceEntity) -> io::Result<()>;

    /// `property` on `device` was just overwritten; its new value is cached on
    /// the property.
    fn property_changed(&mut self, device: &DeviceEntity, property: &Property) -> io::Result<()>;
}

impl<H: Host + ?Sized> Host for &mut H {
    fn device_added(&mut self, device: &DeviceEntity) -> io::Result<()> {
        (**self).device_added(device)
    }

    fn property_changed(&mut self, device: &DeviceEntity, property: &Property) -> io::Result<()> {
        (**self).property_changed(device, property)
    }
}
