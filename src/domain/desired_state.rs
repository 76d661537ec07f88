//! Desired-state resolution: global defaults with per-object overrides.
//!
//! A spec is either a plain mapping (applied to every object) or the
//! structured form:
//!
//! ```yaml
//! __GLOBAL__:
//!   allow_promiscuous: false
//! __OVERRIDES__:
//!   - switch_name: dvs-01
//!     port_group_name: pg-trunk
//!     allow_promiscuous: true
//! ```
//!
//! An override whose identity fields all match the object wins outright.
//! Fields are never merged between an override and `__GLOBAL__`.

use serde_json::{Map, Value};
use std::collections::HashMap;

use super::error::ControlError;

pub const GLOBAL_KEY: &str = "__GLOBAL__";
pub const OVERRIDES_KEY: &str = "__OVERRIDES__";

/// Resolves effective desired values for objects identified by a fixed set
/// of identity fields.
#[derive(Debug, Clone)]
pub struct DesiredStateResolver<'a> {
    identity_fields: Vec<&'a str>,
    global: Option<&'a Map<String, Value>>,
    overrides: HashMap<Vec<String>, &'a Map<String, Value>>,
}

impl<'a> DesiredStateResolver<'a> {
    /// Index a spec. A mapping with neither `__GLOBAL__` nor `__OVERRIDES__`
    /// is treated as the global value itself.
    pub fn new(spec: &'a Value, identity_fields: &[&'a str]) -> Result<Self, ControlError> {
        let map = spec
            .as_object()
            .ok_or_else(|| ControlError::invalid("expected a mapping"))?;

        let structured = map.contains_key(GLOBAL_KEY) || map.contains_key(OVERRIDES_KEY);
        let global = if structured {
            match map.get(GLOBAL_KEY) {
                None | Some(Value::Null) => None,
                Some(Value::Object(global)) => Some(global),
                Some(_) => return Err(ControlError::invalid("__GLOBAL__ must be a mapping")),
            }
        } else {
            Some(map)
        };

        let mut overrides = HashMap::new();
        if structured {
            let entries = match map.get(OVERRIDES_KEY) {
                None | Some(Value::Null) => &[][..],
                Some(Value::Array(entries)) => entries.as_slice(),
                Some(_) => return Err(ControlError::invalid("__OVERRIDES__ must be a list")),
            };
            for entry in entries {
                let entry = entry
                    .as_object()
                    .ok_or_else(|| ControlError::invalid("__OVERRIDES__ entries must be mappings"))?;
                // Overrides missing an identity field can never match an object.
                if let Some(key) = identity_key(entry, identity_fields) {
                    overrides.insert(key, entry);
                }
            }
        }

        Ok(Self {
            identity_fields: identity_fields.to_vec(),
            global,
            overrides,
        })
    }

    /// Effective desired value of `field` for the object whose identity
    /// values are taken from `object`.
    pub fn resolve(&self, object: &Map<String, Value>, field: &str) -> Option<&'a Value> {
        match self.matching_override(object) {
            Some(entry) => entry.get(field),
            None => self.global.and_then(|g| g.get(field)),
        }
    }

    /// Build the full desired record for `object`: its identity fields plus
    /// every requested field that has a resolved value.
    pub fn resolve_record(&self, object: &Map<String, Value>, fields: &[&str]) -> Map<String, Value> {
        let mut record = Map::new();
        for field in &self.identity_fields {
            if let Some(value) = object.get(*field) {
                record.insert((*field).to_string(), value.clone());
            }
        }
        for field in fields {
            if let Some(value) = self.resolve(object, field) {
                record.insert((*field).to_string(), value.clone());
            }
        }
        record
    }

    pub fn has_overrides(&self) -> bool {
        !self.overrides.is_empty()
    }

    fn matching_override(&self, object: &Map<String, Value>) -> Option<&'a Map<String, Value>> {
        let key = identity_key(object, &self.identity_fields)?;
        self.overrides.get(&key).copied()
    }
}

fn identity_key(map: &Map<String, Value>, fields: &[&str]) -> Option<Vec<String>> {
    fields
        .iter()
        .map(|field| map.get(*field).map(|v| v.to_string()))
        .collect()
}
