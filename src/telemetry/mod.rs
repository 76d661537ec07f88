use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact lines on stderr, for interactive CLI runs.
    Pretty,
    /// One JSON object per line, for the daemon.
    Json,
}

/// Install the global tracing subscriber. `RUST_LOG` wins over `level`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let _ = match format {
        LogFormat::Pretty => builder.compact().without_time().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
