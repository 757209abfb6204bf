//! Integration tests for the record store.
//!
//! Writes snapshots into temp directories and reads them back.

use serde_json::{json, Value};
use tempfile::TempDir;

use netboxgit::core::records::{DeviceMap, DeviceRecord, InterfaceIndex, InterfaceRecord};
use netboxgit::store::RecordStore;

fn interface(device: &str, name: &str, description: &str) -> InterfaceRecord {
    InterfaceRecord::from_value(json!({
        "id": 100,
        "url": "https://netbox.test/api/dcim/interfaces/100/",
        "name": name,
        "description": description,
        "device": {"id": 1, "name": device, "display_name": device},
        "type": {"id": 1000, "value": "1000base-t", "label": "1000BASE-T"},
        "tags": [{"slug": "release-42"}],
    }))
    .unwrap()
}

fn index_of(records: &[InterfaceRecord]) -> InterfaceIndex {
    let mut index = InterfaceIndex::new();
    for record in records {
        index
            .entry(record.device_name().to_string())
            .or_default()
            .insert(record.name().to_string(), record.clone());
    }
    index
}

#[test]
fn round_trip_reconstructs_index() {
    let temp = TempDir::new().unwrap();
    let store = RecordStore::new(temp.path());
    let records = vec![
        interface("sw1", "eth0", "uplink"),
        interface("sw1", "eth1", ""),
        interface("sw2-b", "xe-1", "to core"),
    ];

    store.write_interfaces(&records).unwrap();
    assert_eq!(store.read_interfaces().unwrap(), index_of(&records));
}

#[test]
fn rewrite_of_same_records_is_byte_identical() {
    let temp = TempDir::new().unwrap();
    let store = RecordStore::new(temp.path());
    let records = vec![interface("sw1", "eth0", "uplink")];
    let mut devices = DeviceMap::new();
    devices.insert(
        "sw1".into(),
        DeviceRecord {
            hostname: "192.0.2.1/24".into(),
            platform: None,
        },
    );

    let paths = store.write_interfaces(&records).unwrap();
    let devices_path = store.write_devices(&devices).unwrap();
    let first = std::fs::read(&paths[0]).unwrap();
    let first_devices = std::fs::read(&devices_path).unwrap();

    store.write_interfaces(&records).unwrap();
    store.write_devices(&devices).unwrap();
    assert_eq!(std::fs::read(&paths[0]).unwrap(), first);
    assert_eq!(std::fs::read(&devices_path).unwrap(), first_devices);
}

#[test]
fn devices_file_contents() {
    let temp = TempDir::new().unwrap();
    let store = RecordStore::new(temp.path());
    let mut devices = DeviceMap::new();
    devices.insert(
        "sw2-vc".into(),
        DeviceRecord {
            hostname: "192.0.2.2/24".into(),
            platform: Some("junos".into()),
        },
    );
    devices.insert(
        "sw1".into(),
        DeviceRecord {
            hostname: "192.0.2.1/24".into(),
            platform: None,
        },
    );

    let path = store.write_devices(&devices).unwrap();
    assert_eq!(path, temp.path().join("devices").join("devices.json"));

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("{\n    \"sw1\": {\n        \"hostname\""));
    assert!(text.ends_with("}\n"));
    let value: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(
        value,
        json!({
            "sw1": {"hostname": "192.0.2.1/24", "platform": null},
            "sw2-vc": {"hostname": "192.0.2.2/24", "platform": "junos"},
        })
    );
}

#[test]
fn slash_in_names_is_replaced_in_paths() {
    let temp = TempDir::new().unwrap();
    let store = RecordStore::new(temp.path());

    let paths = store
        .write_interfaces(&[interface("rack1/sw1", "ge-0/0/1", "")])
        .unwrap();
    assert_eq!(
        paths,
        vec![temp
            .path()
            .join("devices/rack1-sw1/interfaces/ge-0-0-1.json")]
    );

    // The record keeps its real names
    let index = store.read_interfaces().unwrap();
    assert!(index["rack1/sw1"].contains_key("ge-0/0/1"));
}

#[test]
fn names_differing_only_by_slash_collide_and_last_write_wins() {
    let temp = TempDir::new().unwrap();
    let store = RecordStore::new(temp.path());
    let slashed = interface("sw1", "ge-0/0/1", "first");
    let dashed = interface("sw1", "ge-0-0-1", "second");

    let paths = store.write_interfaces(&[slashed, dashed.clone()]).unwrap();
    assert_eq!(paths[0], paths[1]);

    let index = store.read_interfaces().unwrap();
    assert_eq!(index["sw1"].len(), 1);
    assert_eq!(index["sw1"]["ge-0-0-1"], dashed);
    assert!(!index["sw1"].contains_key("ge-0/0/1"));
}

#[test]
fn non_json_files_are_ignored_on_read() {
    let temp = TempDir::new().unwrap();
    let store = RecordStore::new(temp.path());
    let records = vec![interface("sw1", "eth0", "uplink")];
    store.write_interfaces(&records).unwrap();

    let interfaces_dir = temp.path().join("devices/sw1/interfaces");
    std::fs::write(interfaces_dir.join(".gitkeep"), "").unwrap();
    std::fs::write(interfaces_dir.join("README"), "hand-written notes\n").unwrap();
    std::fs::create_dir(interfaces_dir.join("archive.json")).unwrap();

    assert_eq!(store.read_interfaces().unwrap(), index_of(&records));
}
