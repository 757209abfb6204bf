//! inventory
//!
//! Access to the network inventory service.
//!
//! # Modules
//!
//! - [`traits`] - The `Inventory` trait, typed devices and errors
//! - [`netbox`] - NetBox REST implementation
//! - [`mock`] - In-memory implementation for tests
//! - [`resolve`] - Management device resolution
//! - [`rules`] - Turning exported records back into writable payloads

pub mod mock;
pub mod netbox;
pub mod resolve;
pub mod rules;
pub mod traits;

pub use netbox::NetBoxClient;
pub use resolve::{
    management_name, resolve_management_device, DeviceResolver, ManagedObject,
    MAX_RESOLUTION_HOPS,
};
pub use rules::{
    adapt_for_write, apply_rules, strip_unwritable_fields, FieldRule, Scope,
    INTERFACE_WRITE_RULES,
};
pub use traits::{
    Device, InterfacePayloads, InterfaceUpdate, Inventory, InventoryError, IpAddressRef,
    NestedDevice, PlatformRef, Tag, UpdateStatus, VirtualChassisRef,
};
