use tracing_subscriber::{EnvFilter, fmt};

/// Output flavor of the process-wide subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event, fields flattened.
    Json,
    /// Human-readable lines for a terminal.
    Pretty,
}

impl LogFormat {
    /// `RPCMESH_LOG=pretty` selects pretty output; anything else means JSON.
    pub fn from_env() -> Self {
        match std::env::var("RPCMESH_LOG") {
            Ok(v) if v.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber. Call once, from the binary.
///
/// With `TOKIO_CONSOLE` set, the console subscriber replaces the normal one.
pub fn init_logging() {
    if std::env::var("TOKIO_CONSOLE").is_ok() {
        init_console_logging();
    } else {
        init_normal_logging(LogFormat::from_env());
    }
}

/// `RUST_LOG` filtering (default `info`) over JSON or pretty output.
pub fn init_normal_logging(format: LogFormat) {
    let builder = fmt().with_env_filter(env_filter());

    match format {
        LogFormat::Json => builder.json().flatten_event(true).init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

fn init_console_logging() {
    console_subscriber::init();
}
