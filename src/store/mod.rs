//! store
//!
//! Filesystem projection of inventory records.
//!
//! # Layout
//!
//! ```text
//! <base>/devices/devices.json                      {mgmt_name: {hostname, platform}, ...}
//! <base>/devices/<device>/interfaces/<iface>.json  one interface record
//! ```
//!
//! All files are UTF-8 JSON with sorted keys and four-space indentation, so a
//! re-export of unchanged inventory produces byte-identical files and git sees
//! no change.
//!
//! `/` in device and interface names becomes `-` in path segments. Two
//! interfaces whose names differ only there (`ge-0/0/1` and `ge-0-0-1`) share
//! a file and the one written last wins.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::records::{DeviceMap, InterfaceIndex, InterfaceRecord, RecordError};

pub const DEVICES_DIR: &str = "devices";
pub const DEVICES_FILE: &str = "devices.json";
pub const INTERFACES_DIR: &str = "interfaces";

/// Errors from reading or writing the snapshot.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid JSON in '{path}': {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid interface record in '{path}': {source}")]
    InvalidRecord { path: PathBuf, source: RecordError },
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Replace path separators so a name is a single path segment.
///
/// # Example
///
/// ```
/// use netboxgit::store::sanitize_name;
///
/// assert_eq!(sanitize_name("ge-0/0/1"), "ge-0-0-1");
/// assert_eq!(sanitize_name("eth0"), "eth0");
/// ```
pub fn sanitize_name(name: &str) -> String {
    name.replace('/', "-")
}

/// Serialize with sorted keys and four-space indentation, plus a trailing newline.
pub fn to_snapshot_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let sorted = sort_keys(serde_json::to_value(value)?);

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    sorted.serialize(&mut ser)?;
    buf.push(b'\n');

    // serde_json only emits UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Rebuild every object with its keys in sorted order.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect::<Map<String, Value>>(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Reads and writes one snapshot rooted at a base directory.
#[derive(Debug, Clone)]
pub struct RecordStore {
    base: PathBuf,
}

impl RecordStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// `<base>/devices`
    pub fn devices_dir(&self) -> PathBuf {
        self.base.join(DEVICES_DIR)
    }

    /// `<base>/devices/devices.json`
    pub fn devices_file(&self) -> PathBuf {
        self.devices_dir().join(DEVICES_FILE)
    }

    /// `<base>/devices/<device>/interfaces`
    pub fn interfaces_dir(&self, device: &str) -> PathBuf {
        self.devices_dir()
            .join(sanitize_name(device))
            .join(INTERFACES_DIR)
    }

    /// `<base>/devices/<device>/interfaces/<iface>.json`
    pub fn interface_file(&self, device: &str, interface: &str) -> PathBuf {
        self.interfaces_dir(device)
            .join(format!("{}.json", sanitize_name(interface)))
    }

    /// Overwrite `devices.json` with the full device map.
    pub fn write_devices(&self, devices: &DeviceMap) -> Result<PathBuf, StoreError> {
        let dir = self.devices_dir();
        fs::create_dir_all(&dir).map_err(io_err(&dir))?;

        let path = self.devices_file();
        let contents = to_snapshot_json(devices).map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, contents).map_err(io_err(&path))?;

        debug!(path = %path.display(), devices = devices.len(), "wrote devices");
        Ok(path)
    }

    /// Write one file per interface, replacing any previous content.
    ///
    /// Returns the written paths in input order.
    pub fn write_interfaces(
        &self,
        interfaces: &[InterfaceRecord],
    ) -> Result<Vec<PathBuf>, StoreError> {
        let mut written = Vec::with_capacity(interfaces.len());
        for record in interfaces {
            let dir = self.interfaces_dir(record.device_name());
            fs::create_dir_all(&dir).map_err(io_err(&dir))?;

            let path = self.interface_file(record.device_name(), record.name());
            if written.contains(&path) {
                warn!(
                    path = %path.display(),
                    interface = record.name(),
                    "interface file already written in this run, overwriting"
                );
            }
            let contents = to_snapshot_json(record).map_err(|source| StoreError::Json {
                path: path.clone(),
                source,
            })?;
            fs::write(&path, contents).map_err(io_err(&path))?;
            written.push(path);
        }

        debug!(interfaces = written.len(), base = %self.base.display(), "wrote interfaces");
        Ok(written)
    }

    /// Read every `.json` file under `<base>/devices/*/interfaces/`.
    ///
    /// Other entries, such as a `.gitkeep`, are skipped.
    ///
    /// Records are indexed by the device and interface names inside them, not
    /// by their file names.
    pub fn read_interfaces(&self) -> Result<InterfaceIndex, StoreError> {
        let mut index = InterfaceIndex::new();
        for path in self.interface_files()? {
            let contents = fs::read_to_string(&path).map_err(io_err(&path))?;
            let value: Value = serde_json::from_str(&contents).map_err(|source| StoreError::Json {
                path: path.clone(),
                source,
            })?;
            let record = InterfaceRecord::from_value(value).map_err(|source| {
                StoreError::InvalidRecord {
                    path: path.clone(),
                    source,
                }
            })?;

            index
                .entry(record.device_name().to_string())
                .or_default()
                .insert(record.name().to_string(), record);
        }

        debug!(devices = index.len(), base = %self.base.display(), "read interfaces");
        Ok(index)
    }

    /// `.json` files in every device's interfaces directory, sorted by path.
    fn interface_files(&self) -> Result<Vec<PathBuf>, StoreError> {
        let devices_dir = self.devices_dir();
        let mut files = Vec::new();

        for entry in fs::read_dir(&devices_dir).map_err(io_err(&devices_dir))? {
            let entry = entry.map_err(io_err(&devices_dir))?;
            let interfaces_dir = entry.path().join(INTERFACES_DIR);
            if !interfaces_dir.is_dir() {
                continue;
            }
            for file in fs::read_dir(&interfaces_dir).map_err(io_err(&interfaces_dir))? {
                let file = file.map_err(io_err(&interfaces_dir))?;
                let file_type = file.file_type().map_err(io_err(&interfaces_dir))?;
                let path = file.path();
                if file_type.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                    files.push(path);
                } else {
                    debug!(path = %path.display(), "skipping non-record entry");
                }
            }
        }

        files.sort();
        Ok(files)
    }
}
