//! `vcompliance check`: report drift without changing anything.

use tracing::info;

use crate::domain::compliance_service::{ComplianceService, DesiredStateDocument, RunFilter, RunReport};

pub fn run(service: &ComplianceService, doc: &DesiredStateDocument, filter: &RunFilter) -> RunReport {
    let report = service.check(doc, filter);
    let drifted = report.results.iter().filter(|r| r.result.is_failure()).count();
    if drifted == 0 {
        info!("all checked controls are compliant");
    } else {
        info!(drifted, "controls need attention");
    }
    report
}
