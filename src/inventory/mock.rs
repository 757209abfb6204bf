//! inventory::mock
//!
//! In-memory inventory for deterministic testing.
//!
//! # Example
//!
//! ```
//! use netboxgit::inventory::mock::MockInventory;
//! use netboxgit::inventory::{Device, Inventory};
//!
//! # tokio_test::block_on(async {
//! let sw1 = Device::new(1, "sw1").with_primary_ip("10.0.0.1/24");
//! let inventory = MockInventory::new()
//!     .with_tag("release-42")
//!     .with_device(sw1.clone())
//!     .with_interface(&sw1, "eth0", &["release-42"]);
//!
//! let interfaces = inventory.interfaces_by_tag("release-42").await.unwrap();
//! assert_eq!(interfaces.len(), 1);
//! assert_eq!(interfaces[0].device_name(), "sw1");
//! # });
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::traits::{
    Device, InterfacePayloads, InterfaceUpdate, Inventory, InventoryError, Tag, UpdateStatus,
};
use crate::core::records::InterfaceRecord;

/// Mock inventory for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockInventory {
    inner: Arc<Mutex<MockInventoryInner>>,
}

#[derive(Debug, Default)]
struct MockInventoryInner {
    tags: Vec<Tag>,
    devices: HashMap<u64, Device>,
    /// Interface id -> (tag slugs, fields)
    interfaces: Vec<(Vec<String>, Map<String, Value>)>,
    next_interface_id: u64,
    fail_on: Vec<FailOn>,
    operations: Vec<MockOperation>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail `tag` with the given error.
    Tag(InventoryError),
    /// Fail `interfaces_by_tag` with the given error.
    InterfacesByTag(InventoryError),
    /// Fail `device` for one id.
    Device { id: u64, error: InventoryError },
    /// Reject the update of one interface.
    UpdateInterface {
        device: String,
        interface: String,
        message: String,
    },
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq)]
pub enum MockOperation {
    Tag { slug: String },
    InterfacesByTag { tag: String },
    Device { id: u64 },
    UpdateInterfaces { device: String, names: Vec<String> },
}

impl MockInventory {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockInventoryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a tag whose slug and name are `slug`.
    pub fn with_tag(self, slug: &str) -> Self {
        {
            let mut inner = self.lock();
            let id = inner.tags.len() as u64 + 1;
            inner.tags.push(Tag {
                id,
                name: slug.to_string(),
                slug: slug.to_string(),
            });
        }
        self
    }

    pub fn with_device(self, device: Device) -> Self {
        self.lock().devices.insert(device.id, device);
        self
    }

    /// Add an interface on `device` carrying `tags`.
    pub fn with_interface(self, device: &Device, name: &str, tags: &[&str]) -> Self {
        let fields = {
            let inner = self.lock();
            let id = inner.next_interface_id + 1;
            json!({
                "id": id,
                "url": format!("http://inventory.test/api/dcim/interfaces/{id}/"),
                "name": name,
                "device": {
                    "id": device.id,
                    "url": format!("http://inventory.test/api/dcim/devices/{}/", device.id),
                    "name": device.label(),
                    "display_name": device.label(),
                },
                "type": {"id": 1000, "value": "1000base-t", "label": "1000BASE-T"},
                "enabled": true,
                "description": "",
                "tags": tags.iter().map(|t| json!({"slug": t, "name": t})).collect::<Vec<_>>(),
            })
        };
        match fields {
            Value::Object(fields) => self.with_interface_fields(fields, tags),
            _ => self,
        }
    }

    /// Add an interface from raw fields carrying `tags`.
    pub fn with_interface_fields(self, fields: Map<String, Value>, tags: &[&str]) -> Self {
        {
            let mut inner = self.lock();
            inner.next_interface_id += 1;
            inner
                .interfaces
                .push((tags.iter().map(|t| t.to_string()).collect(), fields));
        }
        self
    }

    /// Make an operation fail.
    pub fn fail_on(self, fail: FailOn) -> Self {
        self.lock().fail_on.push(fail);
        self
    }

    /// Operations performed so far, in order.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.lock().operations.clone()
    }

    /// Number of `device` calls made.
    pub fn device_fetches(&self) -> usize {
        self.lock()
            .operations
            .iter()
            .filter(|op| matches!(op, MockOperation::Device { .. }))
            .count()
    }

    /// Current fields of an interface.
    pub fn interface(&self, device: &str, name: &str) -> Option<Map<String, Value>> {
        self.lock()
            .interfaces
            .iter()
            .map(|(_, fields)| fields)
            .find(|fields| field_matches(fields, device, name))
            .cloned()
    }
}

fn field_matches(fields: &Map<String, Value>, device: &str, name: &str) -> bool {
    fields.get("name").and_then(Value::as_str) == Some(name)
        && fields
            .get("device")
            .and_then(|d| d.get("name"))
            .and_then(Value::as_str)
            == Some(device)
}

#[async_trait]
impl Inventory for MockInventory {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn tag(&self, slug: &str) -> Result<Tag, InventoryError> {
        let mut inner = self.lock();
        inner.operations.push(MockOperation::Tag {
            slug: slug.to_string(),
        });
        for fail in &inner.fail_on {
            if let FailOn::Tag(error) = fail {
                return Err(error.clone());
            }
        }

        let matches: Vec<&Tag> = inner.tags.iter().filter(|t| t.slug == slug).collect();
        match matches.as_slice() {
            [] => Err(InventoryError::NotFound(format!("tag '{slug}'"))),
            [tag] => Ok((*tag).clone()),
            many => Err(InventoryError::Ambiguous(format!(
                "{} tags match '{slug}'",
                many.len()
            ))),
        }
    }

    async fn interfaces_by_tag(&self, tag: &str) -> Result<Vec<InterfaceRecord>, InventoryError> {
        let mut inner = self.lock();
        inner.operations.push(MockOperation::InterfacesByTag {
            tag: tag.to_string(),
        });
        for fail in &inner.fail_on {
            if let FailOn::InterfacesByTag(error) = fail {
                return Err(error.clone());
            }
        }

        inner
            .interfaces
            .iter()
            .filter(|(tags, _)| tags.iter().any(|t| t == tag))
            .map(|(_, fields)| {
                InterfaceRecord::new(fields.clone())
                    .map_err(|e| InventoryError::InvalidPayload(e.to_string()))
            })
            .collect()
    }

    async fn device(&self, id: u64) -> Result<Device, InventoryError> {
        let mut inner = self.lock();
        inner.operations.push(MockOperation::Device { id });
        for fail in &inner.fail_on {
            if let FailOn::Device { id: failing, error } = fail {
                if *failing == id {
                    return Err(error.clone());
                }
            }
        }

        inner
            .devices
            .get(&id)
            .cloned()
            .ok_or_else(|| InventoryError::NotFound(format!("device #{id}")))
    }

    async fn update_interfaces(
        &self,
        device: &str,
        payloads: &InterfacePayloads,
    ) -> Result<Vec<InterfaceUpdate>, InventoryError> {
        let mut inner = self.lock();
        inner.operations.push(MockOperation::UpdateInterfaces {
            device: device.to_string(),
            names: payloads.keys().cloned().collect(),
        });

        let mut results = Vec::with_capacity(payloads.len());
        for (name, payload) in payloads {
            let rejected = inner.fail_on.iter().find_map(|fail| match fail {
                FailOn::UpdateInterface {
                    device: d,
                    interface,
                    message,
                } if d == device && interface == name => Some(message.clone()),
                _ => None,
            });

            let stored = inner
                .interfaces
                .iter_mut()
                .find(|(_, fields)| field_matches(fields, device, name));
            let status = match (stored, rejected) {
                (None, _) => UpdateStatus::Missing,
                (Some(_), Some(message)) => UpdateStatus::Failed(message),
                (Some((_, fields)), None) => {
                    // Partial update: payload keys replace stored keys
                    for (key, value) in payload {
                        fields.insert(key.clone(), value.clone());
                    }
                    UpdateStatus::Updated
                }
            };

            results.push(InterfaceUpdate {
                device: device.to_string(),
                interface: name.clone(),
                status,
            });
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sw1() -> Device {
        Device::new(1, "sw1").with_primary_ip("10.0.0.1/24")
    }

    #[tokio::test]
    async fn tag_lookup() {
        let inventory = MockInventory::new().with_tag("release-42");
        assert_eq!(inventory.tag("release-42").await.unwrap().slug, "release-42");
        assert!(matches!(
            inventory.tag("other").await,
            Err(InventoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_tags_are_ambiguous() {
        let inventory = MockInventory::new().with_tag("t").with_tag("t");
        assert!(matches!(
            inventory.tag("t").await,
            Err(InventoryError::Ambiguous(_))
        ));
    }

    #[tokio::test]
    async fn interfaces_filtered_by_tag() {
        let inventory = MockInventory::new()
            .with_device(sw1())
            .with_interface(&sw1(), "eth0", &["a"])
            .with_interface(&sw1(), "eth1", &["b"])
            .with_interface(&sw1(), "eth2", &["a", "b"]);

        let names: Vec<String> = inventory
            .interfaces_by_tag("a")
            .await
            .unwrap()
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(names, vec!["eth0", "eth2"]);
    }

    #[tokio::test]
    async fn update_reports_per_interface() {
        let inventory = MockInventory::new()
            .with_interface(&sw1(), "eth0", &[])
            .with_interface(&sw1(), "eth1", &[])
            .fail_on(FailOn::UpdateInterface {
                device: "sw1".into(),
                interface: "eth1".into(),
                message: "bad type".into(),
            });

        let mut payloads = InterfacePayloads::new();
        for name in ["eth0", "eth1", "eth9"] {
            let mut fields = Map::new();
            fields.insert("description".into(), json!("restored"));
            payloads.insert(name.into(), fields);
        }

        let results = inventory.update_interfaces("sw1", &payloads).await.unwrap();
        let statuses: Vec<_> = results.iter().map(|r| r.status.clone()).collect();
        assert_eq!(
            statuses,
            vec![
                UpdateStatus::Updated,
                UpdateStatus::Failed("bad type".into()),
                UpdateStatus::Missing,
            ]
        );
        assert_eq!(
            inventory.interface("sw1", "eth0").unwrap()["description"],
            "restored"
        );
        assert_eq!(inventory.interface("sw1", "eth1").unwrap()["description"], "");
    }

    #[tokio::test]
    async fn device_failure_injection() {
        let inventory = MockInventory::new().with_device(sw1()).fail_on(FailOn::Device {
            id: 1,
            error: InventoryError::Network("down".into()),
        });
        assert_eq!(
            inventory.device(1).await,
            Err(InventoryError::Network("down".into()))
        );
    }
}
