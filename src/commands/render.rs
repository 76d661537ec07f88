//! Terminal and file output for run reports.

use std::path::Path;

use anyhow::{Context, Result};
use colored::{ColoredString, Colorize};
use serde_json::Value;

use super::OutputFormat;
use crate::domain::compliance_service::{ControlOutcome, ControlReport, RunMode, RunReport};
use crate::domain::state::translate_report;

pub fn print(report: &RunReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::State => println!("{}", serde_json::to_string_pretty(&translate_report(report))?),
        OutputFormat::Table => print_table(report),
    }
    Ok(())
}

pub fn write_json(report: &RunReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json).with_context(|| format!("failed to write report to {}", path.display()))
}

fn colorize(label: &str) -> ColoredString {
    match label {
        "COMPLIANT" | "SUCCESS" => label.green(),
        "NON_COMPLIANT" | "PARTIAL" => label.yellow(),
        "FAILED" => label.red().bold(),
        _ => label.dimmed(),
    }
}

fn compact(value: Option<&Value>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// One-line detail: the drift for NON_COMPLIANT/changed rows, else errors.
fn detail(row: &ControlReport) -> String {
    let (from, to) = match &row.result {
        ControlOutcome::Check(r) => (r.current.as_ref(), r.desired.as_ref()),
        ControlOutcome::Remediate(r) => (r.old.as_ref(), r.new.as_ref()),
    };
    let mut parts = Vec::new();
    if from.is_some() || to.is_some() {
        parts.push(format!("{} -> {}", compact(from), compact(to)));
    }
    if !row.result.errors().is_empty() {
        parts.push(row.result.errors().join("; "));
    }
    parts.join("  ")
}

fn print_table(report: &RunReport) {
    let title = match report.mode {
        RunMode::Check => "═══ Compliance Check ═══",
        RunMode::Remediate => "═══ Remediation ═══",
    };
    println!("{}", title.cyan().bold());
    println!("  {} {}", "Host:".dimmed(), report.host.bold());
    println!(
        "  {} {}",
        "Document:".dimmed(),
        &report.document_digest[..std::cmp::min(report.document_digest.len(), 24)]
    );
    println!();

    if report.results.is_empty() {
        println!("  {}", "no controls matched".dimmed());
        return;
    }

    let width = report
        .results
        .iter()
        .map(|r| r.product.len() + r.control.len() + 1)
        .max()
        .unwrap_or(0);

    for row in &report.results {
        let name = format!("{}/{}", row.product, row.control);
        let label = row.result.status_label();
        println!(
            "  {:<width$}  {:<13}  {}",
            name,
            colorize(&label),
            detail(row),
            width = width
        );
    }

    println!();
    let summary: Vec<String> = report
        .tally()
        .iter()
        .map(|(status, count)| format!("{} {}", count, colorize(status)))
        .collect();
    println!("  {} {}", "Summary:".dimmed(), summary.join(", "));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::*;
    use chrono::Utc;
    use serde_json::json;

    fn report() -> RunReport {
        RunReport {
            mode: RunMode::Check,
            host: "runner".to_string(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            document_digest: "sha256:abc".to_string(),
            results: vec![ControlReport {
                product: "vcenter".to_string(),
                control: "ssh".to_string(),
                metadata: Value::Null,
                result: ControlOutcome::Check(ComplianceResult::non_compliant(
                    json!({ "enabled": true }),
                    json!({ "enabled": false }),
                )),
            }],
        }
    }

    #[test]
    fn detail_shows_drift() {
        let report = report();
        assert_eq!(detail(&report.results[0]), r#"{"enabled":true} -> {"enabled":false}"#);
    }

    #[test]
    fn report_file_round_trips_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        write_json(&report(), &path).unwrap();

        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["document_digest"], json!("sha256:abc"));
        assert_eq!(written["results"][0]["result"]["status"], json!("NON_COMPLIANT"));
    }

    #[test]
    fn write_to_missing_dir_fails_with_path() {
        let err = write_json(&report(), Path::new("/nonexistent/dir/report.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/dir/report.json"));
    }
}
