//! Centralized error handling for rctkit.
//!
//! Every pipeline stage fails with one of a small set of error kinds, so
//! callers can decide which failures abort a run and which are reported
//! alongside results that were already computed:
//!
//! ```
//! use rctkit::error::RctError;
//!
//! fn is_fatal(err: &RctError) -> bool {
//!     !matches!(err, RctError::Output(_))
//! }
//!
//! assert!(is_fatal(&RctError::Schema("column 'w' not found".to_owned())));
//! assert!(!is_fatal(&RctError::Output("disk full".to_owned())));
//! ```
//!
//! ## Context Extension Trait
//!
//! The `ResultExt` trait adds `.context()` to any `Result` whose error
//! converts into [`RctError`]. Unlike a plain string wrapper it keeps the
//! error kind, so a contextualised estimation failure still matches
//! `RctError::Estimation`:
//!
//! ```
//! use rctkit::error::{RctError, Result, ResultExt as _};
//!
//! fn fit() -> Result<f64> {
//!     Err(RctError::Estimation("X'X is singular".to_owned()))
//! }
//!
//! let err = fit().context("Adjusted model").unwrap_err();
//! assert!(matches!(err, RctError::Estimation(_)));
//! assert_eq!(err.to_string(), "Estimation error: Adjusted model: X'X is singular");
//! ```

use std::fmt;

/// Main error type for rctkit operations.
#[derive(Debug)]
pub enum RctError {
    /// Source unreachable, timed out, or not parseable as delimited text.
    DataSource(String),

    /// An expected column is absent or holds values outside its role.
    Schema(String),

    /// Degenerate design: too few rows, singular matrix, no variation in treatment.
    Estimation(String),

    /// Artifact could not be written.
    Output(String),

    /// Invalid variable specification or configuration file.
    Config(String),

    /// Data frame manipulation errors (Polars).
    DataProcessing(String),

    /// I/O errors outside artifact writing (reading configuration, etc.)
    Io(std::io::Error),
}

impl RctError {
    /// Stable lowercase label used in structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DataSource(_) => "data_source",
            Self::Schema(_) => "schema",
            Self::Estimation(_) => "estimation",
            Self::Output(_) => "output",
            Self::Config(_) => "config",
            Self::DataProcessing(_) => "data_processing",
            Self::Io(_) => "io",
        }
    }

    fn prefixed(self, prefix: &str) -> Self {
        match self {
            Self::DataSource(msg) => Self::DataSource(format!("{prefix}: {msg}")),
            Self::Schema(msg) => Self::Schema(format!("{prefix}: {msg}")),
            Self::Estimation(msg) => Self::Estimation(format!("{prefix}: {msg}")),
            Self::Output(msg) => Self::Output(format!("{prefix}: {msg}")),
            Self::Config(msg) => Self::Config(format!("{prefix}: {msg}")),
            Self::DataProcessing(msg) => Self::DataProcessing(format!("{prefix}: {msg}")),
            Self::Io(e) => Self::Io(std::io::Error::new(e.kind(), format!("{prefix}: {e}"))),
        }
    }
}

impl fmt::Display for RctError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DataSource(msg) => write!(f, "Data source error: {msg}"),
            Self::Schema(msg) => write!(f, "Schema error: {msg}"),
            Self::Estimation(msg) => write!(f, "Estimation error: {msg}"),
            Self::Output(msg) => write!(f, "Output error: {msg}"),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::DataProcessing(msg) => write!(f, "Data processing error: {msg}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for RctError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RctError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for RctError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("JSON error: {err}"))
    }
}

impl From<polars::error::PolarsError> for RctError {
    fn from(err: polars::error::PolarsError) -> Self {
        Self::DataProcessing(err.to_string())
    }
}

/// Result type alias for rctkit operations.
pub type Result<T> = std::result::Result<T, RctError>;

/// Extension trait to add context to results without losing the error kind.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> Result<T>;

    /// Add context using a closure (lazy evaluation).
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<RctError>,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().prefixed(&msg.into()))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().prefixed(&f()))
    }
}
