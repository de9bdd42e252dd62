use std::fs::{self, File};
use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::Level;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::error::ReportError;

/// Log file used when the configuration cannot be resolved, so the run's own
/// log path is unknown.
pub fn fallback_log_path() -> Utf8PathBuf {
    Utf8PathBuf::from(".").join("logs").join("fb-reports.log")
}

/// Errors reach stderr through the binary's final diagnostic instead.
fn shown_on_stderr(level: &Level) -> bool {
    *level == Level::WARN
}

/// Sends the run's diagnostics to `log_path` and warnings to stderr as well.
/// `RUST_LOG` overrides the file level.
pub fn init(log_path: &Utf8Path, verbose: bool) -> Result<(), ReportError> {
    if let Some(parent) = log_path.parent().filter(|parent| !parent.as_str().is_empty()) {
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| ReportError::Logging(format!("{parent}: {err}")))?;
    }
    let file = File::options()
        .create(true)
        .append(true)
        .open(log_path.as_std_path())
        .map_err(|err| ReportError::Logging(format!("{log_path}: {err}")))?;

    let default_level = if verbose { "debug" } else { "info" };
    let file_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file))
        .with_filter(file_filter);
    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(filter_fn(|metadata| shown_on_stderr(metadata.level())));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|err| ReportError::Logging(err.to_string()))
}
