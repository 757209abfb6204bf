//! core::records
//!
//! Inventory records as they are written to, and read back from, a snapshot.
//!
//! # Types
//!
//! - [`DeviceRecord`] - How to reach a logical management device
//! - [`InterfaceRecord`] - One interface payload, kept as a plain JSON object
//! - [`DeviceMap`] / [`InterfaceIndex`] - The keyed collections the store works on
//!
//! Interface payloads stay untyped so exports keep every attribute the
//! inventory service returned. Only the fields the workflow keys on (`name`,
//! `device.name`) are validated when a record is built.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors from record construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("interface record must be a JSON object")]
    NotAnObject,

    #[error("interface record is missing '{0}'")]
    MissingField(&'static str),
}

/// Connection details for a logical management device.
///
/// Keyed in [`DeviceMap`] by the management name: the virtual-chassis name
/// when the device is a chassis member, otherwise the device name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Primary management address, as reported by the inventory (may carry a prefix length).
    pub hostname: String,
    /// Platform slug; `null` when the device has no platform assigned.
    pub platform: Option<String>,
}

/// Management name -> device record.
pub type DeviceMap = BTreeMap<String, DeviceRecord>;

/// Device name -> interface name -> record.
pub type InterfaceIndex = BTreeMap<String, BTreeMap<String, InterfaceRecord>>;

/// An interface payload reduced to a plain JSON object.
///
/// # Example
///
/// ```
/// use netboxgit::core::records::InterfaceRecord;
/// use serde_json::json;
///
/// let record = InterfaceRecord::from_value(json!({
///     "id": 7,
///     "name": "ge-0/0/1",
///     "device": {"id": 3, "name": "sw1"},
/// })).unwrap();
///
/// assert_eq!(record.name(), "ge-0/0/1");
/// assert_eq!(record.device_name(), "sw1");
/// assert_eq!(record.device_id(), Some(3));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct InterfaceRecord(Map<String, Value>);

impl InterfaceRecord {
    /// Build a record from a JSON object carrying `name` and `device.name`.
    pub fn new(fields: Map<String, Value>) -> Result<Self, RecordError> {
        if !fields.get("name").is_some_and(Value::is_string) {
            return Err(RecordError::MissingField("name"));
        }
        let device_name = fields
            .get("device")
            .and_then(|d| d.get("name"))
            .and_then(Value::as_str);
        if device_name.is_none() {
            return Err(RecordError::MissingField("device.name"));
        }
        Ok(Self(fields))
    }

    pub fn from_value(value: Value) -> Result<Self, RecordError> {
        match value {
            Value::Object(fields) => Self::new(fields),
            _ => Err(RecordError::NotAnObject),
        }
    }

    /// Interface name.
    pub fn name(&self) -> &str {
        self.0.get("name").and_then(Value::as_str).unwrap_or_default()
    }

    /// Name of the device the interface belongs to.
    pub fn device_name(&self) -> &str {
        self.0
            .get("device")
            .and_then(|d| d.get("name"))
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Inventory id of the owning device, when the payload carries one.
    pub fn device_id(&self) -> Option<u64> {
        self.0.get("device")?.get("id")?.as_u64()
    }

    /// Inventory id of the interface itself.
    pub fn id(&self) -> Option<u64> {
        self.0.get("id")?.as_u64()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

impl TryFrom<Map<String, Value>> for InterfaceRecord {
    type Error = RecordError;

    fn try_from(fields: Map<String, Value>) -> Result<Self, Self::Error> {
        Self::new(fields)
    }
}

impl From<InterfaceRecord> for Map<String, Value> {
    fn from(record: InterfaceRecord) -> Self {
        record.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_name_rejected() {
        let err = InterfaceRecord::from_value(json!({"device": {"name": "sw1"}})).unwrap_err();
        assert_eq!(err, RecordError::MissingField("name"));
    }

    #[test]
    fn missing_device_name_rejected() {
        let err = InterfaceRecord::from_value(json!({"name": "eth0", "device": 4})).unwrap_err();
        assert_eq!(err, RecordError::MissingField("device.name"));
    }

    #[test]
    fn non_object_rejected() {
        assert_eq!(
            InterfaceRecord::from_value(json!(["eth0"])).unwrap_err(),
            RecordError::NotAnObject
        );
    }

    #[test]
    fn deserialize_validates() {
        let parsed: Result<InterfaceRecord, _> = serde_json::from_str(r#"{"name": "eth0"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn extra_attributes_are_kept() {
        let record = InterfaceRecord::from_value(json!({
            "name": "eth0",
            "device": {"name": "sw1"},
            "description": "uplink",
            "mtu": 9000,
        }))
        .unwrap();
        assert_eq!(record.fields()["description"], "uplink");
        assert_eq!(record.fields()["mtu"], 9000);
        assert_eq!(record.device_id(), None);
    }

    #[test]
    fn device_record_serializes_null_platform() {
        let record = DeviceRecord {
            hostname: "10.0.0.1/24".into(),
            platform: None,
        };
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"hostname": "10.0.0.1/24", "platform": null})
        );
    }
}
