pub mod check;
pub mod controls;
pub mod daemon;
pub mod remediate;
pub mod render;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, ValueEnum};
use tracing::info;

use crate::config;
use crate::controls as registry;
use crate::domain::compliance_service::{ComplianceService, DesiredStateDocument, RunFilter, RunMode, RunReport};
use crate::telemetry::{self, LogFormat};
use crate::vendor::ControlContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    /// `{name, result, changes, comment}` per control.
    State,
}

/// Flags shared by `check` and `remediate`.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Desired-state document (YAML or JSON)
    pub document: PathBuf,

    /// Only run controls of this product (repeatable)
    #[arg(long = "product")]
    pub products: Vec<String>,

    /// Only run these controls (repeatable)
    #[arg(long = "control")]
    pub controls: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Also write the run report as JSON to this file
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Path to config file (default: ~/.config/vcompliance/config.yaml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl RunArgs {
    fn filter(&self) -> RunFilter {
        RunFilter {
            products: self.products.clone(),
            controls: self.controls.clone(),
        }
    }
}

/// Load everything a run needs, run it, and print the report.
pub fn execute(args: &RunArgs, mode: RunMode) -> Result<()> {
    let cfg = config::load(args.config.as_deref())?;
    telemetry::init(&cfg.log_level, LogFormat::Pretty);

    let doc = DesiredStateDocument::load(&args.document)?;
    info!(document = %args.document.display(), digest = %doc.digest(), "loaded desired state");

    let ctx = ControlContext::from_config(&cfg)?;
    let service = ComplianceService::new(registry::registry(), ctx);

    let report = match mode {
        RunMode::Check => check::run(&service, &doc, &args.filter()),
        RunMode::Remediate => remediate::run(&service, &doc, &args.filter()),
    };
    finish(&report, args)
}

fn finish(report: &RunReport, args: &RunArgs) -> Result<()> {
    render::print(report, args.format)?;
    if let Some(path) = &args.output {
        render::write_json(report, path)?;
    }
    if report.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}
