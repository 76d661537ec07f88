//! The controller contract: `get` / `set` / `check_compliance` / `remediate`.
//!
//! Concrete controllers implement the typed hooks (`fetch`, `compare`,
//! `apply`); the provided methods turn every error into envelope data so
//! nothing escapes to the caller.

use semver::Version;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Display;
use tracing::{debug, warn};

use super::error::ControlError;
use super::types::*;
use crate::vendor::ControlContext;

pub trait Controller: Send + Sync {
    /// Setting name as used in the desired-state document.
    fn name(&self) -> &'static str;

    /// Product section of the document this setting lives under.
    fn product(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Lowest product version the setting exists on.
    fn min_version(&self) -> Option<Version> {
        None
    }

    /// Read current state from the product.
    fn fetch(&self, ctx: &ControlContext) -> Result<Value, ControlError>;

    /// Diff current against desired. `None` means compliant.
    fn compare(&self, current: &Value, desired: &Value) -> Result<Option<(Value, Value)>, ControlError>;

    /// Push the desired state to the product.
    fn apply(&self, ctx: &ControlContext, desired: &Value) -> Result<SetOutcome, ControlError>;

    /// Hook for normalizing the desired spec before it is compared or applied.
    fn prepare_desired(&self, desired: &Value) -> Result<Value, ControlError> {
        Ok(desired.clone())
    }

    /// Current state plus any retrieval errors. Never fails.
    fn get(&self, ctx: &ControlContext) -> (Value, Vec<String>) {
        match self.fetch(ctx) {
            Ok(current) => (current, Vec::new()),
            Err(e) => {
                warn!(control = self.name(), error = %e, "failed to read current state");
                (Value::Null, vec![e.to_string()])
            }
        }
    }

    /// Apply desired state. Controllers that refuse remediation by policy
    /// return `RemediationUnsupported` from `apply`, which lands here as
    /// SKIPPED.
    fn set(&self, ctx: &ControlContext, desired: &Value) -> SetOutcome {
        match self.apply(ctx, desired) {
            Ok(outcome) => outcome,
            Err(ControlError::RemediationUnsupported(msg)) => SetOutcome::skipped(msg),
            Err(ControlError::PartialFailure { errors, changes }) => SetOutcome {
                status: RemediateStatus::Partial,
                errors,
                changes: Some(changes.unwrap_or((Value::Array(Vec::new()), Value::Array(Vec::new())))),
            },
            Err(e) => {
                warn!(control = self.name(), error = %e, "failed to apply desired state");
                SetOutcome::failed(vec![e.to_string()])
            }
        }
    }

    fn check_compliance(&self, ctx: &ControlContext, desired: &Value) -> ComplianceResult {
        if let Err(e) = self.ensure_applicable(ctx) {
            return ComplianceResult::skipped(vec![e.to_string()]);
        }

        let desired = match self.prepare_desired(desired) {
            Ok(desired) => desired,
            Err(e) => return ComplianceResult::failed(vec![e.to_string()]),
        };

        let (current, errors) = self.get(ctx);
        if !errors.is_empty() {
            return ComplianceResult::failed(errors);
        }

        match self.compare(&current, &desired) {
            Ok(None) => ComplianceResult::compliant(),
            Ok(Some((current, desired))) => ComplianceResult::non_compliant(current, desired),
            Err(e) => ComplianceResult::failed(vec![e.to_string()]),
        }
    }

    fn remediate(&self, ctx: &ControlContext, desired: &Value) -> RemediateResult {
        let check = self.check_compliance(ctx, desired);
        let (old, new) = match check.status {
            ComplianceStatus::Compliant => {
                return RemediateResult::skipped(vec![ALREADY_COMPLIANT.to_string()]);
            }
            ComplianceStatus::Skipped => return RemediateResult::skipped(check.errors),
            ComplianceStatus::Failed => return RemediateResult::failed(check.errors),
            ComplianceStatus::NonCompliant => (
                check.current.unwrap_or(Value::Null),
                check.desired.unwrap_or(Value::Null),
            ),
        };

        // Already validated by check_compliance.
        let desired = match self.prepare_desired(desired) {
            Ok(desired) => desired,
            Err(e) => return RemediateResult::failed(vec![e.to_string()]),
        };

        debug!(control = self.name(), "remediating drift");
        let outcome = self.set(ctx, &desired);
        match outcome.status {
            RemediateStatus::Success => {
                let (old, new) = outcome.changes.unwrap_or((old, new));
                RemediateResult::success(old, new)
            }
            // PARTIAL covers only what was applied.
            RemediateStatus::Partial => {
                let (old, new) = outcome
                    .changes
                    .unwrap_or((Value::Array(Vec::new()), Value::Array(Vec::new())));
                RemediateResult::partial(old, new, outcome.errors)
            }
            RemediateStatus::Skipped => RemediateResult::skipped(outcome.errors),
            RemediateStatus::Failed => RemediateResult::failed(outcome.errors),
        }
    }

    fn ensure_applicable(&self, ctx: &ControlContext) -> Result<(), ControlError> {
        match (self.min_version(), ctx.product_version()) {
            (Some(min), Some(actual)) if *actual < min => {
                debug!(control = self.name(), %actual, %min, "control not applicable");
                Err(ControlError::NotApplicable(NOT_APPLICABLE.to_string()))
            }
            _ => Ok(()),
        }
    }
}

/// Summary of a registered controller, for listings.
#[derive(Debug, Clone, Serialize)]
pub struct ControlInfo {
    pub product: String,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_version: Option<String>,
}

/// Controllers keyed by `(product, setting)`.
#[derive(Default)]
pub struct ControlRegistry {
    controls: BTreeMap<(String, String), Box<dyn Controller>>,
}

impl ControlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, control: Box<dyn Controller>) {
        let key = (control.product().to_string(), control.name().to_string());
        self.controls.insert(key, control);
    }

    pub fn get(&self, product: &str, name: &str) -> Option<&dyn Controller> {
        self.controls
            .get(&(product.to_string(), name.to_string()))
            .map(|c| c.as_ref())
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn info(&self) -> Vec<ControlInfo> {
        self.controls
            .values()
            .map(|c| ControlInfo {
                product: c.product().to_string(),
                name: c.name().to_string(),
                description: c.description().to_string(),
                min_version: c.min_version().map(|v| v.to_string()),
            })
            .collect()
    }
}

/// Aggregates per-object outcomes when one setting spans many objects.
///
/// Failures don't stop the loop; they are collected by identity.
#[derive(Debug, Default)]
pub struct CollectionRemediation {
    old: Vec<Value>,
    new: Vec<Value>,
    errors: Vec<String>,
}

impl CollectionRemediation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn succeeded(&mut self, old: Value, new: Value) {
        self.old.push(old);
        self.new.push(new);
    }

    pub fn failed(&mut self, identity: &str, error: impl Display) {
        let message = format!("{identity}: {error}");
        warn!(object = identity, error = %error, "remediation failed for object");
        self.errors.push(message);
    }

    pub fn finish(self) -> SetOutcome {
        let status = match (self.old.is_empty(), self.errors.is_empty()) {
            (_, true) => RemediateStatus::Success,
            (true, false) => RemediateStatus::Failed,
            (false, false) => RemediateStatus::Partial,
        };
        let changes = if self.old.is_empty() {
            None
        } else {
            Some((Value::Array(self.old), Value::Array(self.new)))
        };
        SetOutcome {
            status,
            errors: self.errors,
            changes,
        }
    }
}
