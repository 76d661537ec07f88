use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::rest::{self, AppState};
use crate::config::DaemonConfig;
use crate::domain::compliance_service::ComplianceService;

pub async fn run(config: DaemonConfig, service: Arc<ComplianceService>) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        controls = service.controls().len(),
        "vcompliance daemon starting"
    );

    let app_state = AppState {
        service,
        started_at: Instant::now(),
    };

    let app = rest::router(app_state).layer(TraceLayer::new_for_http());

    // Bind HTTP listener
    let http_addr = &config.http_addr;
    let listener = TcpListener::bind(http_addr)
        .await
        .with_context(|| format!("binding to {}", http_addr))?;

    info!(addr = %http_addr, "HTTP server listening");

    // Run HTTP server with graceful shutdown
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("vcompliance daemon stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { info!("Received Ctrl+C, shutting down"); },
        _ = terminate => { info!("Received SIGTERM, shutting down"); },
    }
}
