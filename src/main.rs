mod api;
mod commands;
mod config;
mod controls;
mod domain;
mod server;
mod telemetry;
mod vendor;

use clap::{Parser, Subcommand};

use commands::{OutputFormat, RunArgs};
use domain::compliance_service::RunMode;

#[derive(Parser)]
#[command(
    name = "vcompliance",
    version,
    about = "Desired-state compliance checks and drift remediation for VMware vCenter"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare live settings against a desired-state document
    Check(RunArgs),

    /// Fix drifted settings, then report what changed
    Remediate(RunArgs),

    /// List the controls this binary knows about
    Controls {
        /// Output format (table or json)
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Run the vcompliance daemon (REST API)
    Daemon {
        /// HTTP listen address (overrides config)
        #[arg(long)]
        http_addr: Option<String>,

        /// Log level (overrides config)
        #[arg(long)]
        log_level: Option<String>,

        /// Path to config file (default: ~/.config/vcompliance/config.yaml)
        #[arg(long)]
        config: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check(args) => commands::execute(&args, RunMode::Check),
        Commands::Remediate(args) => commands::execute(&args, RunMode::Remediate),
        Commands::Controls { format } => commands::controls::run(format),
        Commands::Daemon {
            http_addr,
            log_level,
            config,
        } => commands::daemon::run(http_addr, log_level, config),
    }
}
