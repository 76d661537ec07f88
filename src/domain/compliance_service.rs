//! Compliance service: runs a desired-state document through the
//! registered controllers.
//!
//! The document maps products to settings:
//!
//! ```yaml
//! compliance_config:
//!   vcenter:
//!     ntp:
//!       metadata: { control_id: VCSA-01 }
//!       value: { mode: NTP, servers: [time1.corp, time2.corp] }
//! ```
//!
//! Every entry produces exactly one report row, whether or not a
//! controller exists for it.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::vendor::ControlContext;

use super::controller::{ControlInfo, ControlRegistry};
use super::types::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlEntry {
    pub value: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesiredStateDocument {
    pub compliance_config: BTreeMap<String, BTreeMap<String, ControlEntry>>,
}

impl DesiredStateDocument {
    /// Load a YAML or JSON document from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// YAML is a superset of JSON, so one parser covers both.
    pub fn parse(content: &str) -> Result<Self> {
        let doc: Self = serde_yaml::from_str(content)?;
        Ok(doc)
    }

    /// SHA-256 over the canonical JSON form: "sha256:<hex>".
    pub fn digest(&self) -> String {
        let serialized = serde_json::to_string(self).unwrap_or_default();
        format!("sha256:{:x}", Sha256::digest(serialized.as_bytes()))
    }

    pub fn entry_count(&self) -> usize {
        self.compliance_config.values().map(BTreeMap::len).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Check,
    Remediate,
}

/// Restricts a run to some products and/or settings. Empty means all.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunFilter {
    #[serde(default)]
    pub products: Vec<String>,
    #[serde(default)]
    pub controls: Vec<String>,
}

impl RunFilter {
    fn allows(&self, product: &str, control: &str) -> bool {
        (self.products.is_empty() || self.products.iter().any(|p| p == product))
            && (self.controls.is_empty() || self.controls.iter().any(|c| c == control))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ControlOutcome {
    Check(ComplianceResult),
    Remediate(RemediateResult),
}

impl ControlOutcome {
    /// Whether this row should make the run exit non-zero.
    pub fn is_failure(&self) -> bool {
        match self {
            ControlOutcome::Check(r) => {
                matches!(r.status, ComplianceStatus::Failed | ComplianceStatus::NonCompliant)
            }
            ControlOutcome::Remediate(r) => {
                matches!(r.status, RemediateStatus::Failed | RemediateStatus::Partial)
            }
        }
    }

    pub fn status_label(&self) -> String {
        match self {
            ControlOutcome::Check(r) => r.status.to_string(),
            ControlOutcome::Remediate(r) => r.status.to_string(),
        }
    }

    pub fn errors(&self) -> &[String] {
        match self {
            ControlOutcome::Check(r) => &r.errors,
            ControlOutcome::Remediate(r) => &r.errors,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlReport {
    pub product: String,
    pub control: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
    pub result: ControlOutcome,
}

/// One document run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub mode: RunMode,
    pub host: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub document_digest: String,
    pub results: Vec<ControlReport>,
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        self.results.iter().any(|r| r.result.is_failure())
    }

    /// Row count per status label, for summaries.
    pub fn tally(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for row in &self.results {
            *counts.entry(row.result.status_label()).or_insert(0) += 1;
        }
        counts
    }
}

pub struct ComplianceService {
    registry: ControlRegistry,
    ctx: ControlContext,
}

impl ComplianceService {
    pub fn new(registry: ControlRegistry, ctx: ControlContext) -> Self {
        debug!(controls = registry.len(), "compliance service ready");
        Self { registry, ctx }
    }

    pub fn controls(&self) -> Vec<ControlInfo> {
        self.registry.info()
    }

    pub fn check(&self, doc: &DesiredStateDocument, filter: &RunFilter) -> RunReport {
        self.run(doc, filter, RunMode::Check)
    }

    pub fn remediate(&self, doc: &DesiredStateDocument, filter: &RunFilter) -> RunReport {
        self.run(doc, filter, RunMode::Remediate)
    }

    /// Controllers run one after another, sorted by product and then
    /// setting name.
    pub fn run(&self, doc: &DesiredStateDocument, filter: &RunFilter, mode: RunMode) -> RunReport {
        let started_at = Utc::now();
        let timer = Instant::now();
        info!(?mode, entries = doc.entry_count(), "starting compliance run");

        let mut results = Vec::new();
        for (product, settings) in &doc.compliance_config {
            for (name, entry) in settings {
                if !filter.allows(product, name) {
                    debug!(product = %product, control = %name, "filtered out");
                    continue;
                }
                results.push(ControlReport {
                    product: product.clone(),
                    control: name.clone(),
                    metadata: entry.metadata.clone(),
                    result: self.run_one(product, name, &entry.value, mode),
                });
            }
        }

        let report = RunReport {
            mode,
            host: hostname::get()
                .map(|h| h.to_string_lossy().to_string())
                .unwrap_or_else(|_| "unknown".to_string()),
            started_at,
            finished_at: Utc::now(),
            document_digest: doc.digest(),
            results,
        };
        info!(
            ?mode,
            controls = report.results.len(),
            failures = report.results.iter().filter(|r| r.result.is_failure()).count(),
            elapsed_ms = timer.elapsed().as_millis() as u64,
            "compliance run finished"
        );
        report
    }

    fn run_one(&self, product: &str, name: &str, desired: &Value, mode: RunMode) -> ControlOutcome {
        let Some(control) = self.registry.get(product, name) else {
            warn!(product, control = name, "no controller registered");
            let message = format!("no controller registered for {product}/{name}");
            return match mode {
                RunMode::Check => ControlOutcome::Check(ComplianceResult::failed(vec![message])),
                RunMode::Remediate => ControlOutcome::Remediate(RemediateResult::failed(vec![message])),
            };
        };

        match mode {
            RunMode::Check => {
                let result = control.check_compliance(&self.ctx, desired);
                debug!(product, control = name, status = %result.status, "checked");
                ControlOutcome::Check(result)
            }
            RunMode::Remediate => {
                let result = control.remediate(&self.ctx, desired);
                info!(product, control = name, status = %result.status, "remediated");
                ControlOutcome::Remediate(result)
            }
        }
    }
}
