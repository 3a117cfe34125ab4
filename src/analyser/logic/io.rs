//! Loading delimited tabular data from a URL or a local path, and writing
//! tables back out as CSV.

use crate::error::{RctError, Result};
use polars::prelude::*;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

const INFER_SCHEMA_ROWS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Remote(String),
    Local(PathBuf),
}

impl SourceLocation {
    pub fn parse(source: &str) -> Self {
        let trimmed = source.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::Remote(trimmed.to_owned())
        } else {
            Self::Local(PathBuf::from(trimmed))
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Upper bound on the whole remote fetch, connect included.
    pub timeout: Duration,
    /// Cell contents read as missing in every column.
    pub null_values: Vec<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(crate::config::DEFAULT_FETCH_TIMEOUT_SECS),
            null_values: vec!["NA".to_owned()],
        }
    }
}

/// Fetches `source` and parses it as header-first comma-separated text.
///
/// No caching and no retry: any failure here is fatal for the run.
pub fn load_df(source: &str, options: &LoadOptions) -> Result<DataFrame> {
    let location = SourceLocation::parse(source);
    let bytes = match &location {
        SourceLocation::Remote(url) => fetch_remote(url, options.timeout)?,
        SourceLocation::Local(path) => read_local(path)?,
    };

    let df = parse_csv_bytes(bytes, &options.null_values)?;
    tracing::info!(
        source,
        remote = location.is_remote(),
        rows = df.height(),
        columns = df.width(),
        "Loaded dataset"
    );
    Ok(df)
}

fn fetch_remote(url: &str, timeout: Duration) -> Result<Vec<u8>> {
    tracing::debug!(url, timeout_secs = timeout.as_secs(), "Fetching remote dataset");

    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| RctError::DataSource(format!("Failed to build HTTP client: {e}")))?;

    let response = client.get(url).send().map_err(|e| {
        if e.is_timeout() {
            RctError::DataSource(format!(
                "Timed out after {}s fetching {url}",
                timeout.as_secs()
            ))
        } else {
            RctError::DataSource(format!("Failed to fetch {url}: {e}"))
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(RctError::DataSource(format!("{url} returned HTTP {status}")));
    }

    let body = response
        .bytes()
        .map_err(|e| RctError::DataSource(format!("Failed to read response body from {url}: {e}")))?;
    Ok(body.to_vec())
}

fn read_local(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path)
        .map_err(|e| RctError::DataSource(format!("Failed to read {}: {e}", path.display())))
}

pub fn parse_csv_bytes(bytes: Vec<u8>, null_values: &[String]) -> Result<DataFrame> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(RctError::DataSource("Source is empty".to_owned()));
    }

    let nulls = (!null_values.is_empty()).then(|| {
        NullValues::AllColumns(null_values.iter().map(|s| s.as_str().into()).collect())
    });

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
        .with_parse_options(CsvParseOptions::default().with_null_values(nulls))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()
        .map_err(|e| RctError::DataSource(format!("Not parseable as delimited text: {e}")))?;

    if df.height() == 0 {
        return Err(RctError::DataSource(
            "Source has a header but no data rows".to_owned(),
        ));
    }

    Ok(df)
}

/// Writes `df` as CSV with a header row.
pub fn save_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .map_err(|e| RctError::Output(format!("Failed to create {}: {e}", path.display())))?;
    CsvWriter::new(file)
        .include_header(true)
        .finish(df)
        .map_err(|e| RctError::Output(format!("Failed to write {}: {e}", path.display())))
}
