//! Logging setup for rctkit.
//!
//! Console output goes to stderr so that tables printed on stdout stay
//! clean. When a results directory is supplied, every run also appends to
//! `rctkit.log` inside it, leaving an audit trail next to the artifacts.
//!
//! ```no_run
//! use std::path::Path;
//!
//! rctkit::logging::init(Some(Path::new("results"))).expect("Failed to initialize logging");
//! tracing::info!("Pipeline started");
//! ```

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _};

pub const LOG_FILE_NAME: &str = "rctkit.log";

/// Path of the run log inside a results directory.
pub fn log_file_path(dir: &Path) -> PathBuf {
    dir.join(LOG_FILE_NAME)
}

/// Initializes console logging and, optionally, a log file in `log_dir`.
///
/// Defaults to INFO; override with `RUST_LOG`. Calling this more than once
/// is harmless: later calls leave the first subscriber in place.
///
/// # Errors
///
/// Returns error if the log directory cannot be created or the filter is invalid.
pub fn init(log_dir: Option<&Path>) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Failed to create env filter")?;

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_line_number(false)
        .with_writer(std::io::stderr);

    let file_layer = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
            let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
            Some(
                fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_file(true)
                    .with_ansi(false)
                    .with_writer(appender),
            )
        }
        None => None,
    };

    let initialised = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .is_ok();

    if initialised {
        tracing::debug!(log_dir = ?log_dir, "Logging initialized");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_path() {
        let path = log_file_path(Path::new("results"));
        assert!(path.ends_with("results/rctkit.log") || path.ends_with("results\\rctkit.log"));
    }

    #[test]
    fn test_init_twice_is_ok() {
        assert!(init(None).is_ok());
        assert!(init(None).is_ok());
    }
}
