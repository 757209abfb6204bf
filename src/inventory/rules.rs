//! inventory::rules
//!
//! Rewriting exported records into payloads the inventory accepts back.
//!
//! An exported interface carries hyperlinks, display strings and nested
//! choice objects. The service rejects those on write, so before a backout the
//! record is passed through a list of [`FieldRule`]s. The list is data: adding
//! a field the service refuses means adding a rule, not code.
//!
//! Exports are never stripped. The snapshot keeps full fidelity for review.

use serde_json::{Map, Value};

use super::traits::InterfacePayloads;
use crate::core::records::{InterfaceIndex, InterfaceRecord};

/// Where in a record a rule applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Only on the record's own top-level fields.
    Root,
    /// On every object at any depth, including objects inside arrays.
    Anywhere,
}

/// One rewrite applied by [`apply_rules`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    /// Drop the field.
    Remove { key: &'static str, scope: Scope },
    /// Replace a nested object with the first of `to` it carries.
    ///
    /// Values that are not objects are left alone, so reducing twice is harmless.
    Reduce {
        key: &'static str,
        to: &'static [&'static str],
        scope: Scope,
    },
}

/// Rules that make an exported interface writable again.
pub const INTERFACE_WRITE_RULES: &[FieldRule] = &[
    FieldRule::Remove {
        key: "url",
        scope: Scope::Anywhere,
    },
    FieldRule::Remove {
        key: "display_name",
        scope: Scope::Anywhere,
    },
    FieldRule::Remove {
        key: "display",
        scope: Scope::Anywhere,
    },
    FieldRule::Reduce {
        key: "type",
        to: &["id", "value"],
        scope: Scope::Root,
    },
    FieldRule::Reduce {
        key: "mode",
        to: &["value"],
        scope: Scope::Root,
    },
];

/// Apply `rules` to an object and, for `Anywhere` rules, to everything below it.
pub fn apply_rules(fields: Map<String, Value>, rules: &[FieldRule]) -> Map<String, Value> {
    rewrite_object(fields, rules, true)
}

fn rewrite_object(fields: Map<String, Value>, rules: &[FieldRule], root: bool) -> Map<String, Value> {
    let applies = |scope: Scope| root || scope == Scope::Anywhere;

    let mut out = Map::new();
    for (key, value) in fields {
        let mut value = Some(value);
        for rule in rules {
            match *rule {
                FieldRule::Remove { key: k, scope } if k == key && applies(scope) => {
                    value = None;
                }
                FieldRule::Reduce { key: k, to, scope } if k == key && applies(scope) => {
                    value = value.map(|v| reduce(v, to));
                }
                _ => {}
            }
        }
        if let Some(value) = value {
            out.insert(key, rewrite_value(value, rules));
        }
    }
    out
}

fn rewrite_value(value: Value, rules: &[FieldRule]) -> Value {
    match value {
        Value::Object(map) => Value::Object(rewrite_object(map, rules, false)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| rewrite_value(item, rules))
                .collect(),
        ),
        other => other,
    }
}

fn reduce(value: Value, to: &[&str]) -> Value {
    match value {
        Value::Object(map) => to
            .iter()
            .find_map(|field| map.get(*field).cloned())
            .unwrap_or(Value::Object(map)),
        other => other,
    }
}

/// Strip one exported interface down to a writable payload.
///
/// # Example
///
/// ```
/// use netboxgit::core::records::InterfaceRecord;
/// use netboxgit::inventory::strip_unwritable_fields;
/// use serde_json::json;
///
/// let record = InterfaceRecord::from_value(json!({
///     "id": 7,
///     "url": "https://netbox/api/dcim/interfaces/7/",
///     "name": "eth0",
///     "device": {"id": 3, "url": "https://netbox/api/dcim/devices/3/", "name": "sw1"},
///     "type": {"id": 1000, "value": "1000base-t", "label": "1000BASE-T"},
/// })).unwrap();
///
/// let payload = strip_unwritable_fields(record);
/// assert_eq!(serde_json::Value::Object(payload), json!({
///     "id": 7,
///     "name": "eth0",
///     "device": {"id": 3, "name": "sw1"},
///     "type": 1000,
/// }));
/// ```
pub fn strip_unwritable_fields(record: InterfaceRecord) -> Map<String, Value> {
    apply_rules(record.into_fields(), INTERFACE_WRITE_RULES)
}

/// Strip every record of a snapshot, keeping the device/interface keying.
pub fn adapt_for_write(index: InterfaceIndex) -> std::collections::BTreeMap<String, InterfacePayloads> {
    index
        .into_iter()
        .map(|(device, interfaces)| {
            let payloads = interfaces
                .into_iter()
                .map(|(name, record)| (name, strip_unwritable_fields(record)))
                .collect();
            (device, payloads)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn removes_hyperlinks_at_every_depth() {
        let out = apply_rules(
            object(json!({
                "url": "u",
                "tags": [{"id": 1, "url": "u", "slug": "release-42"}],
                "lag": {"id": 5, "url": "u", "display": "ae0"},
            })),
            INTERFACE_WRITE_RULES,
        );
        assert_eq!(
            Value::Object(out),
            json!({
                "tags": [{"id": 1, "slug": "release-42"}],
                "lag": {"id": 5},
            })
        );
    }

    #[test]
    fn type_falls_back_to_value() {
        let out = apply_rules(
            object(json!({"type": {"value": "virtual", "label": "Virtual"}})),
            INTERFACE_WRITE_RULES,
        );
        assert_eq!(out["type"], "virtual");
    }

    #[test]
    fn reduce_is_idempotent() {
        let once = apply_rules(object(json!({"type": {"id": 3}})), INTERFACE_WRITE_RULES);
        let twice = apply_rules(once.clone(), INTERFACE_WRITE_RULES);
        assert_eq!(once, twice);
        assert_eq!(twice["type"], 3);
    }

    #[test]
    fn root_rules_do_not_touch_nested_fields() {
        let out = apply_rules(
            object(json!({"connected_endpoint": {"type": {"value": "x"}}})),
            INTERFACE_WRITE_RULES,
        );
        assert_eq!(out["connected_endpoint"]["type"], json!({"value": "x"}));
    }

    #[test]
    fn object_without_candidate_fields_is_kept() {
        let out = apply_rules(object(json!({"mode": {"label": "Access"}})), INTERFACE_WRITE_RULES);
        assert_eq!(out["mode"], json!({"label": "Access"}));
    }

    #[test]
    fn null_mode_is_kept() {
        let out = apply_rules(object(json!({"mode": null})), INTERFACE_WRITE_RULES);
        assert_eq!(out["mode"], Value::Null);
    }

    #[test]
    fn custom_rule_list() {
        const RULES: &[FieldRule] = &[FieldRule::Remove {
            key: "custom_fields",
            scope: Scope::Root,
        }];
        let out = apply_rules(object(json!({"custom_fields": {}, "name": "x"})), RULES);
        assert_eq!(Value::Object(out), json!({"name": "x"}));
    }

    #[test]
    fn adapt_keeps_keys() {
        let record = InterfaceRecord::from_value(json!({
            "name": "eth0",
            "device": {"name": "sw1", "display_name": "sw1"},
        }))
        .unwrap();
        let mut index = InterfaceIndex::new();
        index
            .entry("sw1".into())
            .or_default()
            .insert("eth0".into(), record);

        let adapted = adapt_for_write(index);
        assert_eq!(
            Value::Object(adapted["sw1"]["eth0"].clone()),
            json!({"name": "eth0", "device": {"name": "sw1"}})
        );
    }
}
