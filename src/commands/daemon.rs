use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::config;
use crate::controls;
use crate::domain::compliance_service::ComplianceService;
use crate::telemetry::{self, LogFormat};
use crate::vendor::ControlContext;

pub fn run(http_addr: Option<String>, log_level: Option<String>, config_path: Option<String>) -> Result<()> {
    let cfg = config::load(config_path.as_deref().map(Path::new))?;
    let mut daemon_config = cfg.daemon.clone();

    // CLI flags override config values
    if let Some(addr) = http_addr {
        daemon_config.http_addr = addr;
    }
    if let Some(level) = log_level {
        daemon_config.log_level = level;
    }

    telemetry::init(&daemon_config.log_level, LogFormat::Json);

    // The vendor clients are blocking; build them outside the runtime and
    // keep one handle here so they are also dropped outside it.
    let ctx = ControlContext::from_config(&cfg)?;
    let service = Arc::new(ComplianceService::new(controls::registry(), ctx));

    // Build tokio runtime explicitly (no #[tokio::main] on fn main)
    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(crate::server::run(daemon_config, service.clone()));
    drop(runtime);
    drop(service);
    result
}
