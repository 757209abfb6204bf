//! inventory::resolve
//!
//! Finding the device that answers on the management address for an object.
//!
//! An interface's own device may have no primary address: members of a
//! virtual chassis are managed through the chassis master. Resolution walks
//! owning-device and chassis-master references until it reaches a device with
//! a primary address.
//!
//! The walk is a bounded loop. It gives up with
//! [`InventoryError::Resolution`] when a device has neither an address nor a
//! master to move to, when a master reference leads back to a device already
//! visited, or after [`MAX_RESOLUTION_HOPS`] fetches.

use std::collections::HashMap;

use tracing::debug;

use super::traits::{Device, Inventory, InventoryError};
use crate::core::records::{DeviceRecord, InterfaceRecord};

/// Upper bound on device fetches for one resolution.
pub const MAX_RESOLUTION_HOPS: usize = 8;

/// Anything a tag can be attached to that resolution starts from.
#[derive(Debug, Clone, Copy)]
pub enum ManagedObject<'a> {
    Device(&'a Device),
    Interface(&'a InterfaceRecord),
}

impl ManagedObject<'_> {
    fn label(&self) -> String {
        match self {
            ManagedObject::Device(device) => device.label(),
            ManagedObject::Interface(record) => {
                format!("{} {}", record.device_name(), record.name())
            }
        }
    }
}

/// Resolve the management device for one object.
///
/// # Example
///
/// ```
/// use netboxgit::inventory::mock::MockInventory;
/// use netboxgit::inventory::{resolve_management_device, Device, ManagedObject};
///
/// # tokio_test::block_on(async {
/// let master = Device::new(11, "sw2-a").with_primary_ip("192.0.2.2/24");
/// let member = Device::new(12, "sw2-b").in_virtual_chassis(3, "sw2-vc", &master);
/// let inventory = MockInventory::new().with_device(master.clone()).with_device(member.clone());
///
/// let resolved = resolve_management_device(&inventory, ManagedObject::Device(&member))
///     .await
///     .unwrap();
/// assert_eq!(resolved.id, master.id);
/// # });
/// ```
pub async fn resolve_management_device(
    inventory: &dyn Inventory,
    object: ManagedObject<'_>,
) -> Result<Device, InventoryError> {
    DeviceResolver::new(inventory).resolve(object).await
}

/// Name a management device is keyed by in `devices.json`.
///
/// Chassis members are reached through the chassis, so the chassis name wins
/// over the device's own name.
pub fn management_name(device: &Device) -> String {
    device
        .virtual_chassis
        .as_ref()
        .and_then(|vc| vc.name.clone())
        .unwrap_or_else(|| device.label())
}

/// Resolves many objects against one inventory, fetching each device once.
pub struct DeviceResolver<'a> {
    inventory: &'a dyn Inventory,
    cache: HashMap<u64, Device>,
}

impl<'a> DeviceResolver<'a> {
    pub fn new(inventory: &'a dyn Inventory) -> Self {
        Self {
            inventory,
            cache: HashMap::new(),
        }
    }

    /// Number of distinct devices fetched so far.
    pub fn fetched(&self) -> usize {
        self.cache.len()
    }

    async fn fetch(&mut self, id: u64) -> Result<Device, InventoryError> {
        if let Some(device) = self.cache.get(&id) {
            return Ok(device.clone());
        }
        debug!(id, inventory = self.inventory.name(), "fetching device");
        let device = self.inventory.device(id).await?;
        self.cache.insert(id, device.clone());
        Ok(device)
    }

    /// Walk from `object` to the device holding the primary management address.
    pub async fn resolve(&mut self, object: ManagedObject<'_>) -> Result<Device, InventoryError> {
        let start = object.label();
        let failure = |reason: String| InventoryError::Resolution {
            start: start.clone(),
            reason,
        };

        let mut current = match object {
            ManagedObject::Device(device) => device.clone(),
            ManagedObject::Interface(record) => {
                let id = record
                    .device_id()
                    .ok_or_else(|| failure("interface has no device id".into()))?;
                self.fetch(id).await?
            }
        };
        let mut visited = vec![current.id];

        for _ in 0..MAX_RESOLUTION_HOPS {
            if current.management_address().is_some() {
                return Ok(current);
            }

            let master = current
                .virtual_chassis
                .as_ref()
                .and_then(|vc| vc.master.as_ref())
                .map(|master| master.id);

            let next = match master {
                None => {
                    return Err(failure(format!(
                        "{} has no primary address and no virtual chassis master",
                        current.label()
                    )))
                }
                Some(id) if visited.contains(&id) => {
                    return Err(failure(format!(
                        "{} has no primary address and its chassis master leads back to an already visited device",
                        current.label()
                    )))
                }
                Some(id) => id,
            };

            debug!(from = %current.label(), master = next, "following virtual chassis master");
            current = self.fetch(next).await?;
            visited.push(next);
        }

        Err(failure(format!(
            "no primary address within {MAX_RESOLUTION_HOPS} hops"
        )))
    }

    /// Management name and device record for an interface.
    pub async fn management_entry(
        &mut self,
        interface: &InterfaceRecord,
    ) -> Result<(String, DeviceRecord), InventoryError> {
        let device = self.resolve(ManagedObject::Interface(interface)).await?;
        let record = DeviceRecord {
            hostname: device.management_address().unwrap_or_default().to_string(),
            platform: device.platform_slug().map(str::to_string),
        };
        Ok((management_name(&device), record))
    }
}
