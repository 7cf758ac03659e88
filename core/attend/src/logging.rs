//! Logging setup: stderr plus a daily-rolling file under `~/.attend/logs/`.
//!
//! Level resolution, first match wins:
//! - `--verbose` or `ATTEND_DEBUG_LOG=1` → `debug`
//! - `--quiet` → `warn`
//! - `RUST_LOG` → as given
//! - otherwise `info`

use std::env;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_DIR_NAME: &str = "logs";
const LOG_FILE_PREFIX: &str = "attend.log";
const DEBUG_ENV_VAR: &str = "ATTEND_DEBUG_LOG";

fn debug_requested() -> bool {
    env::var(DEBUG_ENV_VAR)
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false)
}

fn filter(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose || debug_requested() {
        EnvFilter::new("debug")
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Installs the global subscriber. The returned guard flushes the file
/// writer on drop and must live until the process exits.
pub fn init(verbose: bool, quiet: bool) -> Option<WorkerGuard> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let (file_layer, guard) = match file_writer() {
        Some((writer, guard)) => (
            Some(fmt::layer().with_writer(writer).with_ansi(false)),
            Some(guard),
        ),
        None => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(filter(verbose, quiet))
        .with(stderr_layer)
        .with(file_layer)
        .try_init();
    guard
}

fn file_writer() -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let dir = attend_core::state_dir().ok()?.join(LOG_DIR_NAME);
    if let Err(err) = fs_err::create_dir_all(&dir) {
        eprintln!("attend: file logging disabled: {}", err);
        return None;
    }
    let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
    Some(tracing_appender::non_blocking(appender))
}
