//! Tri-state translation for configuration-management callers.
//!
//! `result` is `true` (nothing to do / done), `false` (broken) or `None`
//! (check mode found something that would change).

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::compliance_service::{ControlOutcome, RunReport};
use super::types::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateResult {
    pub name: String,
    pub result: Option<bool>,
    pub changes: Value,
    pub comment: String,
}

fn changes(old: Option<&Value>, new: Option<&Value>) -> Value {
    match (old, new) {
        (Some(old), Some(new)) => json!({ "old": old, "new": new }),
        _ => Value::Object(Map::new()),
    }
}

pub fn translate_check(name: &str, result: &ComplianceResult) -> StateResult {
    let (outcome, comment) = match result.status {
        ComplianceStatus::Compliant => (Some(true), "Control is compliant".to_string()),
        ComplianceStatus::NonCompliant => (None, "Control is not compliant and would be remediated".to_string()),
        ComplianceStatus::Skipped => (Some(true), result.errors.join("; ")),
        ComplianceStatus::Failed => (Some(false), result.errors.join("; ")),
    };
    StateResult {
        name: name.to_string(),
        result: outcome,
        changes: changes(result.current.as_ref(), result.desired.as_ref()),
        comment,
    }
}

pub fn translate_remediate(name: &str, result: &RemediateResult) -> StateResult {
    let (outcome, comment) = match result.status {
        RemediateStatus::Success => (Some(true), "Control remediated".to_string()),
        RemediateStatus::Skipped => (Some(true), result.errors.join("; ")),
        RemediateStatus::Partial => (Some(false), format!("Partially remediated: {}", result.errors.join("; "))),
        RemediateStatus::Failed => (Some(false), result.errors.join("; ")),
    };
    StateResult {
        name: name.to_string(),
        result: outcome,
        changes: changes(result.old.as_ref(), result.new.as_ref()),
        comment,
    }
}

/// Translate every row of a run; names are `product.control`.
pub fn translate_report(report: &RunReport) -> Vec<StateResult> {
    report
        .results
        .iter()
        .map(|row| {
            let name = format!("{}.{}", row.product, row.control);
            match &row.result {
                ControlOutcome::Check(r) => translate_check(&name, r),
                ControlOutcome::Remediate(r) => translate_remediate(&name, r),
            }
        })
        .collect()
}
