//! Log bootstrap
//!
//! Everything goes to a non-blocking file writer under
//! `~/.groundgate/logs/`; stdout stays reserved for the landing path the
//! binary prints.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,hyper=warn,reqwest=warn";
const LOG_FILE: &str = "shell.log";

fn log_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| "/tmp".into())
        .join(".groundgate")
        .join("logs")
}

/// `GROUNDGATE_LOG_FILTER` wins, then `RUST_LOG`, then the default.
fn filter_from_env() -> EnvFilter {
    std::env::var("GROUNDGATE_LOG_FILTER")
        .ok()
        .and_then(|value| EnvFilter::try_new(value).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// JSON unless `GROUNDGATE_LOG_FORMAT=pretty` asks for the human layout.
fn pretty_requested() -> bool {
    std::env::var("GROUNDGATE_LOG_FORMAT")
        .map(|value| value.eq_ignore_ascii_case("pretty"))
        .unwrap_or(false)
}

/// Install the global subscriber. The returned guard must outlive the
/// program so buffered lines get flushed on exit.
pub fn init() -> anyhow::Result<WorkerGuard> {
    let dir = log_dir();
    std::fs::create_dir_all(&dir)?;

    let appender = tracing_appender::rolling::never(&dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let registry = tracing_subscriber::registry().with(filter_from_env());
    if pretty_requested() {
        registry
            .with(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .pretty()
                    .with_target(true),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(writer)
                    .json()
                    .flatten_event(true)
                    .with_current_span(true)
                    .with_target(true),
            )
            .init();
    }

    tracing::info!(
        component = "logging",
        event = "logging.initialized",
        log_path = %dir.join(LOG_FILE).display(),
    );
    Ok(guard)
}
