//! Structural diff between current and desired records.

use serde_json::{Map, Value};
use tracing::trace;

use super::desired_state::DesiredStateResolver;
use super::error::ControlError;

/// Field-by-field comparison restricted to a set of keys.
///
/// Keys absent from the desired record are not managed and never produce
/// drift. A key absent from the current record compares as `null`.
#[derive(Debug, Clone, Default)]
pub struct Comparator<'a> {
    keys: &'a [&'a str],
    identity: &'a [&'a str],
    unordered: &'a [&'a str],
}

impl<'a> Comparator<'a> {
    pub fn new(keys: &'a [&'a str]) -> Self {
        Self {
            keys,
            identity: &[],
            unordered: &[],
        }
    }

    /// Fields copied into mismatch records so callers can tell objects apart.
    pub fn with_identity(mut self, identity: &'a [&'a str]) -> Self {
        self.identity = identity;
        self
    }

    /// Keys whose list values compare as multisets.
    pub fn unordered(mut self, keys: &'a [&'a str]) -> Self {
        self.unordered = keys;
        self
    }

    /// Returns `(current_mismatches, desired_mismatches)`.
    ///
    /// Both sides are either single records or lists of records; lists are
    /// paired by position. The result is empty (`{}` or `[]`) when
    /// compliant.
    pub fn non_compliant_configs(&self, current: &Value, desired: &Value) -> (Value, Value) {
        match (current, desired) {
            (Value::Array(current), Value::Array(desired)) => {
                let mut current_out = Vec::new();
                let mut desired_out = Vec::new();
                let len = current.len().max(desired.len());
                for i in 0..len {
                    let cur = current.get(i).unwrap_or(&Value::Null);
                    let want = desired.get(i).unwrap_or(&Value::Null);
                    if let Some((c, d)) = self.diff_record(cur, want) {
                        current_out.push(c);
                        desired_out.push(d);
                    }
                }
                (Value::Array(current_out), Value::Array(desired_out))
            }
            _ => match self.diff_record(current, desired) {
                Some((c, d)) => (c, d),
                None => (Value::Object(Map::new()), Value::Object(Map::new())),
            },
        }
    }

    fn diff_record(&self, current: &Value, desired: &Value) -> Option<(Value, Value)> {
        let (cur, want) = match (current, desired) {
            (Value::Object(cur), Value::Object(want)) => (cur, want),
            // A record with no counterpart on the other side is drift in full.
            (Value::Null, Value::Null) => return None,
            _ => return Some((current.clone(), desired.clone())),
        };

        let mut cur_out = Map::new();
        let mut want_out = Map::new();
        for key in self.keys {
            let Some(wanted) = want.get(*key) else {
                continue;
            };
            let actual = cur.get(*key).unwrap_or(&Value::Null);
            let equal = if self.unordered.contains(key) {
                lists_equal_unordered(actual, wanted)
            } else {
                actual == wanted
            };
            if !equal {
                cur_out.insert((*key).to_string(), actual.clone());
                want_out.insert((*key).to_string(), wanted.clone());
            }
        }

        if cur_out.is_empty() {
            return None;
        }

        for field in self.identity {
            if let Some(v) = cur.get(*field) {
                cur_out.insert((*field).to_string(), v.clone());
            }
            if let Some(v) = want.get(*field) {
                want_out.insert((*field).to_string(), v.clone());
            }
        }
        Some((Value::Object(cur_out), Value::Object(want_out)))
    }
}

/// Convenience wrapper for the common case without identity fields.
pub fn get_non_compliant_configs(current: &Value, desired: &Value, keys: &[&str]) -> (Value, Value) {
    Comparator::new(keys).non_compliant_configs(current, desired)
}

/// `true` when a mismatch value produced by the comparator carries no drift.
pub fn is_compliant(mismatch: &Value) -> bool {
    match mismatch {
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Null => true,
        _ => false,
    }
}

/// Multiset equality for lists; falls back to plain equality otherwise.
pub fn lists_equal_unordered(a: &Value, b: &Value) -> bool {
    let (Value::Array(a), Value::Array(b)) = (a, b) else {
        return a == b;
    };
    if a.len() != b.len() {
        return false;
    }
    let mut remaining: Vec<&Value> = b.iter().collect();
    for item in a {
        match remaining.iter().position(|candidate| *candidate == item) {
            Some(idx) => {
                remaining.swap_remove(idx);
            }
            None => return false,
        }
    }
    true
}

/// Diff a list of current records against an override-capable spec.
///
/// Each record is compared with its own resolved target, so the desired
/// side of the result shows per-object values. Returns `None` when every
/// record complies.
pub fn diff_against_spec(
    current: &[Map<String, Value>],
    spec: &Value,
    identity: &[&str],
    keys: &[&str],
) -> Result<Option<(Value, Value)>, ControlError> {
    let resolver = DesiredStateResolver::new(spec, identity)?;
    trace!(records = current.len(), overrides = resolver.has_overrides(), "diffing records");
    let desired: Vec<Value> = current
        .iter()
        .map(|record| Value::Object(resolver.resolve_record(record, keys)))
        .collect();
    let current: Vec<Value> = current.iter().cloned().map(Value::Object).collect();

    let (cur, want) = Comparator::new(keys)
        .with_identity(identity)
        .non_compliant_configs(&Value::Array(current), &Value::Array(desired));
    if is_compliant(&cur) {
        Ok(None)
    } else {
        Ok(Some((cur, want)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(value: Value) -> Vec<Map<String, Value>> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    #[test]
    fn identical_records_produce_empty_mismatches() {
        let current = json!({ "mode": "NTP", "servers": ["a", "b"] });
        let (cur, want) = get_non_compliant_configs(&current, &current, &["mode", "servers"]);
        assert!(is_compliant(&cur));
        assert!(is_compliant(&want));
    }

    #[test]
    fn only_listed_keys_are_compared() {
        let current = json!({ "server": "proxy", "password": "old" });
        let desired = json!({ "server": "proxy", "password": "new" });
        let (cur, _) = get_non_compliant_configs(&current, &desired, &["server"]);
        assert!(is_compliant(&cur));
    }

    #[test]
    fn mismatch_keeps_only_differing_keys() {
        let current = json!({ "mode": "NTP", "servers": ["a"] });
        let desired = json!({ "mode": "NTP", "servers": ["b"] });
        let (cur, want) = get_non_compliant_configs(&current, &desired, &["mode", "servers"]);
        assert_eq!(cur, json!({ "servers": ["a"] }));
        assert_eq!(want, json!({ "servers": ["b"] }));
    }

    #[test]
    fn lists_are_paired_by_position() {
        let current = json!([{ "name": "a", "v": 1 }, { "name": "b", "v": 2 }]);
        let desired = json!([{ "name": "a", "v": 1 }, { "name": "b", "v": 3 }]);
        let (cur, want) = Comparator::new(&["v"])
            .with_identity(&["name"])
            .non_compliant_configs(&current, &desired);
        assert_eq!(cur, json!([{ "name": "b", "v": 2 }]));
        assert_eq!(want, json!([{ "name": "b", "v": 3 }]));
    }

    #[test]
    fn unordered_keys_ignore_list_order() {
        let current = json!({ "servers": ["b", "a"] });
        let desired = json!({ "servers": ["a", "b"] });
        let (cur, _) = Comparator::new(&["servers"])
            .unordered(&["servers"])
            .non_compliant_configs(&current, &desired);
        assert!(is_compliant(&cur));

        assert!(!lists_equal_unordered(&json!(["a", "a"]), &json!(["a", "b"])));
    }

    #[test]
    fn empty_string_and_null_are_different() {
        let (cur, _) = get_non_compliant_configs(&json!({ "host": null }), &json!({ "host": "" }), &["host"]);
        assert!(!is_compliant(&cur));
    }

    #[test]
    fn global_spec_flags_drifted_switch() {
        let current = records(json!([{ "switch_name": "A", "allow_mac_address_change": true }]));
        let spec = json!({ "__GLOBAL__": { "allow_mac_address_change": false } });

        let (cur, want) = diff_against_spec(&current, &spec, &["switch_name"], &["allow_mac_address_change"])
            .unwrap()
            .expect("drift expected");
        assert_eq!(cur, json!([{ "switch_name": "A", "allow_mac_address_change": true }]));
        assert_eq!(want, json!([{ "switch_name": "A", "allow_mac_address_change": false }]));
    }

    #[test]
    fn satisfied_override_is_compliant() {
        let current = records(json!([{ "switch_name": "B", "x": true }]));
        let spec = json!({
            "__GLOBAL__": { "x": false },
            "__OVERRIDES__": [{ "switch_name": "B", "x": true }]
        });
        let drift = diff_against_spec(&current, &spec, &["switch_name"], &["x"]).unwrap();
        assert!(drift.is_none());
    }

    #[test]
    fn global_only_spec_checks_every_record_against_global() {
        let current = records(json!([
            { "switch_name": "A", "x": false },
            { "switch_name": "B", "x": true },
            { "switch_name": "C", "x": true }
        ]));
        let spec = json!({ "__GLOBAL__": { "x": false } });
        let (cur, _) = diff_against_spec(&current, &spec, &["switch_name"], &["x"])
            .unwrap()
            .unwrap();
        assert_eq!(cur.as_array().unwrap().len(), 2);
    }
}
