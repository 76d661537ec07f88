use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Marker returned by `remediate` when there is no drift to fix.
pub const ALREADY_COMPLIANT: &str = "Control already compliant";

/// Sentinel for controls that do not apply to the connected product.
pub const NOT_APPLICABLE: &str = "Control not applicable on this product version";

/// Fixed message for settings whose remediation is left to an operator.
pub const MANUAL_REMEDIATION: &str = "Remediation requires manual intervention";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceStatus {
    Compliant,
    NonCompliant,
    Skipped,
    Failed,
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComplianceStatus::Compliant => write!(f, "COMPLIANT"),
            ComplianceStatus::NonCompliant => write!(f, "NON_COMPLIANT"),
            ComplianceStatus::Skipped => write!(f, "SKIPPED"),
            ComplianceStatus::Failed => write!(f, "FAILED"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemediateStatus {
    Success,
    Skipped,
    Failed,
    Partial,
}

impl fmt::Display for RemediateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemediateStatus::Success => write!(f, "SUCCESS"),
            RemediateStatus::Skipped => write!(f, "SKIPPED"),
            RemediateStatus::Failed => write!(f, "FAILED"),
            RemediateStatus::Partial => write!(f, "PARTIAL"),
        }
    }
}

/// Outcome of a single `check_compliance` call.
///
/// `current` and `desired` are either both present (NON_COMPLIANT) or both
/// absent. Build values through the constructors so that holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceResult {
    pub status: ComplianceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl ComplianceResult {
    pub fn compliant() -> Self {
        Self {
            status: ComplianceStatus::Compliant,
            current: None,
            desired: None,
            errors: Vec::new(),
        }
    }

    pub fn non_compliant(current: Value, desired: Value) -> Self {
        Self {
            status: ComplianceStatus::NonCompliant,
            current: Some(current),
            desired: Some(desired),
            errors: Vec::new(),
        }
    }

    pub fn skipped(errors: Vec<String>) -> Self {
        Self {
            status: ComplianceStatus::Skipped,
            current: None,
            desired: None,
            errors,
        }
    }

    pub fn failed(errors: Vec<String>) -> Self {
        Self {
            status: ComplianceStatus::Failed,
            current: None,
            desired: None,
            errors,
        }
    }
}

/// Outcome of a single `remediate` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediateResult {
    pub status: RemediateStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl RemediateResult {
    pub fn success(old: Value, new: Value) -> Self {
        Self {
            status: RemediateStatus::Success,
            old: Some(old),
            new: Some(new),
            errors: Vec::new(),
        }
    }

    /// Some objects were fixed; `old`/`new` only cover those.
    pub fn partial(old: Value, new: Value, errors: Vec<String>) -> Self {
        Self {
            status: RemediateStatus::Partial,
            old: Some(old),
            new: Some(new),
            errors,
        }
    }

    pub fn skipped(errors: Vec<String>) -> Self {
        Self {
            status: RemediateStatus::Skipped,
            old: None,
            new: None,
            errors,
        }
    }

    pub fn failed(errors: Vec<String>) -> Self {
        Self {
            status: RemediateStatus::Failed,
            old: None,
            new: None,
            errors,
        }
    }
}

/// What `set` reports back to the remediation orchestration.
#[derive(Debug, Clone, PartialEq)]
pub struct SetOutcome {
    pub status: RemediateStatus,
    pub errors: Vec<String>,
    /// The `(old, new)` pair actually applied, when the controller tracks it
    /// per object. `None` means "whatever the compliance check reported".
    pub changes: Option<(Value, Value)>,
}

impl SetOutcome {
    pub fn success() -> Self {
        Self {
            status: RemediateStatus::Success,
            errors: Vec::new(),
            changes: None,
        }
    }

    pub fn skipped(message: impl Into<String>) -> Self {
        Self {
            status: RemediateStatus::Skipped,
            errors: vec![message.into()],
            changes: None,
        }
    }

    pub fn failed(errors: Vec<String>) -> Self {
        Self {
            status: RemediateStatus::Failed,
            errors,
            changes: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compliant_result_serializes_without_optional_fields() {
        let value = serde_json::to_value(ComplianceResult::compliant()).unwrap();
        assert_eq!(value, json!({ "status": "COMPLIANT" }));
    }

    #[test]
    fn non_compliant_result_carries_both_sides() {
        let result = ComplianceResult::non_compliant(json!({"x": 1}), json!({"x": 2}));
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            json!({ "status": "NON_COMPLIANT", "current": {"x": 1}, "desired": {"x": 2} })
        );
    }

    #[test]
    fn partial_result_has_errors_and_changes() {
        let result = RemediateResult::partial(
            json!([{"x": 1}]),
            json!([{"x": 2}]),
            vec!["b: boom".to_string()],
        );
        assert_eq!(result.status, RemediateStatus::Partial);
        assert!(result.old.is_some() && result.new.is_some());
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn status_display_matches_wire_names() {
        assert_eq!(ComplianceStatus::NonCompliant.to_string(), "NON_COMPLIANT");
        assert_eq!(RemediateStatus::Partial.to_string(), "PARTIAL");
        let parsed: RemediateStatus = serde_json::from_str("\"SKIPPED\"").unwrap();
        assert_eq!(parsed, RemediateStatus::Skipped);
    }
}
