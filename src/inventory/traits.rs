//! inventory::traits
//!
//! The inventory service contract consumed by the export and backout flows.
//!
//! # Design
//!
//! The `Inventory` trait is async because every operation is a network call.
//! Interfaces are returned as untyped [`InterfaceRecord`]s so an export keeps
//! every attribute; devices are typed because resolution needs specific
//! fields (primary address, platform, virtual chassis).

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::core::records::InterfaceRecord;

/// Errors from inventory operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InventoryError {
    /// Authentication failed (missing, invalid or underprivileged token).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested object does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// More than one object matched a lookup that must be unique.
    #[error("ambiguous: {0}")]
    Ambiguous(String),

    /// The service rejected a read or write.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    Network(String),

    /// The service answered with data that does not have the expected shape.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// No device with a management address could be reached from an object.
    #[error("cannot resolve management device for {start}: {reason}")]
    Resolution { start: String, reason: String },
}

/// A tag as stored in the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: u64,
    pub name: String,
    pub slug: String,
}

/// An IP address reference on a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpAddressRef {
    #[serde(default)]
    pub id: Option<u64>,
    /// Address with prefix length, e.g. `192.0.2.10/24`.
    pub address: String,
}

/// A platform reference on a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformRef {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
}

/// A device reference nested in another object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedDevice {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
}

/// A virtual-chassis reference on a member device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualChassisRef {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub master: Option<NestedDevice>,
}

/// The device fields management resolution works with.
///
/// Other attributes of the service's device payload are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub primary_ip: Option<IpAddressRef>,
    #[serde(default)]
    pub primary_ip4: Option<IpAddressRef>,
    #[serde(default)]
    pub primary_ip6: Option<IpAddressRef>,
    #[serde(default)]
    pub platform: Option<PlatformRef>,
    #[serde(default)]
    pub virtual_chassis: Option<VirtualChassisRef>,
}

impl Device {
    /// A device with only an id and a name.
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: Some(name.into()),
            primary_ip: None,
            primary_ip4: None,
            primary_ip6: None,
            platform: None,
            virtual_chassis: None,
        }
    }

    pub fn with_primary_ip(mut self, address: impl Into<String>) -> Self {
        self.primary_ip = Some(IpAddressRef {
            id: None,
            address: address.into(),
        });
        self
    }

    pub fn with_platform(mut self, slug: impl Into<String>) -> Self {
        let slug = slug.into();
        self.platform = Some(PlatformRef {
            id: None,
            name: Some(slug.clone()),
            slug: Some(slug),
        });
        self
    }

    /// Make this device a member of a virtual chassis mastered by `master`.
    pub fn in_virtual_chassis(
        mut self,
        chassis_id: u64,
        chassis_name: impl Into<String>,
        master: &Device,
    ) -> Self {
        self.virtual_chassis = Some(VirtualChassisRef {
            id: chassis_id,
            name: Some(chassis_name.into()),
            master: Some(NestedDevice {
                id: master.id,
                name: master.name.clone(),
            }),
        });
        self
    }

    /// Primary address, preferring the family-agnostic field.
    pub fn management_address(&self) -> Option<&str> {
        self.primary_ip
            .as_ref()
            .or(self.primary_ip4.as_ref())
            .or(self.primary_ip6.as_ref())
            .map(|ip| ip.address.as_str())
    }

    /// Platform slug, if a platform is assigned.
    pub fn platform_slug(&self) -> Option<&str> {
        self.platform.as_ref()?.slug.as_deref()
    }

    /// Name for messages; falls back to the id for unnamed devices.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("device #{}", self.id),
        }
    }
}

/// Write payloads for one device: interface name -> fields.
pub type InterfacePayloads = BTreeMap<String, Map<String, Value>>;

/// What happened to one interface during an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    /// The service accepted the payload.
    Updated,
    /// No interface with this name exists on the device.
    Missing,
    /// The service rejected the payload.
    Failed(String),
}

/// Per-interface result of [`Inventory::update_interfaces`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceUpdate {
    pub device: String,
    pub interface: String,
    pub status: UpdateStatus,
}

/// Operations on the inventory service.
#[async_trait]
pub trait Inventory: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Look up the tag with the given slug. Exactly one must exist.
    async fn tag(&self, slug: &str) -> Result<Tag, InventoryError>;

    /// Every interface carrying the tag.
    async fn interfaces_by_tag(&self, tag: &str) -> Result<Vec<InterfaceRecord>, InventoryError>;

    /// Fetch one device by id.
    async fn device(&self, id: u64) -> Result<Device, InventoryError>;

    /// Replace the writable fields of the named interfaces on `device`.
    ///
    /// Fails only if the interfaces cannot be looked up at all; individual
    /// rejections are reported per interface.
    async fn update_interfaces(
        &self,
        device: &str,
        payloads: &InterfacePayloads,
    ) -> Result<Vec<InterfaceUpdate>, InventoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn device_parses_service_payload() {
        let device: Device = serde_json::from_value(json!({
            "id": 12,
            "url": "https://netbox/api/dcim/devices/12/",
            "name": "sw2",
            "primary_ip": null,
            "primary_ip4": {"id": 4, "address": "192.0.2.2/24", "family": 4},
            "platform": {"id": 1, "name": "Junos", "slug": "junos"},
            "virtual_chassis": {"id": 3, "name": "sw2-vc", "master": {"id": 11, "name": "sw2-a"}},
            "site": {"id": 1, "name": "lab"},
        }))
        .unwrap();

        assert_eq!(device.management_address(), Some("192.0.2.2/24"));
        assert_eq!(device.platform_slug(), Some("junos"));
        assert_eq!(
            device.virtual_chassis.unwrap().master.unwrap().id,
            11
        );
    }

    #[test]
    fn primary_ip_preferred_over_families() {
        let mut device = Device::new(1, "sw1").with_primary_ip("10.0.0.1/24");
        device.primary_ip6 = Some(IpAddressRef {
            id: None,
            address: "2001:db8::1/64".into(),
        });
        assert_eq!(device.management_address(), Some("10.0.0.1/24"));
    }

    #[test]
    fn label_falls_back_to_id() {
        let mut device = Device::new(9, "x");
        device.name = None;
        assert_eq!(device.label(), "device #9");
    }
}
