//! `vcompliance remediate`: push desired state wherever drift exists.

use tracing::{info, warn};

use crate::domain::compliance_service::{ComplianceService, DesiredStateDocument, RunFilter, RunReport};

pub fn run(service: &ComplianceService, doc: &DesiredStateDocument, filter: &RunFilter) -> RunReport {
    let report = service.remediate(doc, filter);
    for row in report.results.iter().filter(|r| r.result.is_failure()) {
        warn!(
            product = %row.product,
            control = %row.control,
            status = %row.result.status_label(),
            "remediation incomplete"
        );
    }
    info!(tally = ?report.tally(), "remediation finished");
    report
}
