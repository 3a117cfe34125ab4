//! Run configuration: which columns play which role, where data comes from,
//! and where artifacts go.
//!
//! Configuration is fixed for the duration of a run and passed explicitly to
//! every stage. It can be loaded from JSON:
//!
//! ```json
//! {
//!   "source": "https://example.org/social_pressure.csv",
//!   "output_dir": "results",
//!   "variables": {
//!     "treatment": "w",
//!     "outcome": "y",
//!     "covariates": ["age", "polviews", "income", "educ", "marital", "sex"],
//!     "categorical": ["marital", "sex"]
//!   }
//! }
//! ```

use crate::error::{RctError, Result, ResultExt as _};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const DEFAULT_OUTPUT_DIR: &str = "results";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_DISPLAY_PRECISION: usize = 3;

/// Column roles used by every downstream computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableSpec {
    pub treatment: String,
    pub outcome: String,
    pub covariates: Vec<String>,
    /// Covariates to summarise and encode as categorical even when stored as numbers.
    #[serde(default)]
    pub categorical: Vec<String>,
}

impl Default for VariableSpec {
    fn default() -> Self {
        Self {
            treatment: "w".to_owned(),
            outcome: "y".to_owned(),
            covariates: ["age", "polviews", "income", "educ", "marital", "sex"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            categorical: Vec::new(),
        }
    }
}

impl VariableSpec {
    pub fn new(
        treatment: impl Into<String>,
        outcome: impl Into<String>,
        covariates: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            treatment: treatment.into(),
            outcome: outcome.into(),
            covariates: covariates.into_iter().map(Into::into).collect(),
            categorical: Vec::new(),
        }
    }

    pub fn with_categorical(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.categorical = names.into_iter().map(Into::into).collect();
        self
    }

    /// All analysed columns in report order: treatment, outcome, covariates.
    pub fn columns(&self) -> Vec<&str> {
        let mut cols = vec![self.treatment.as_str(), self.outcome.as_str()];
        cols.extend(self.covariates.iter().map(String::as_str));
        cols
    }

    pub fn is_forced_categorical(&self, name: &str) -> bool {
        self.categorical.iter().any(|c| c == name)
    }

    pub fn validate(&self) -> Result<()> {
        if self.treatment.trim().is_empty() || self.outcome.trim().is_empty() {
            return Err(RctError::Config(
                "treatment and outcome column names must not be empty".to_owned(),
            ));
        }
        if self.treatment == self.outcome {
            return Err(RctError::Config(format!(
                "treatment and outcome must be different columns (both are '{}')",
                self.treatment
            )));
        }

        let mut seen = HashSet::new();
        for cov in &self.covariates {
            if cov.trim().is_empty() {
                return Err(RctError::Config("covariate names must not be empty".to_owned()));
            }
            if cov == &self.treatment || cov == &self.outcome {
                return Err(RctError::Config(format!(
                    "'{cov}' cannot be both a covariate and the treatment/outcome"
                )));
            }
            if !seen.insert(cov.as_str()) {
                return Err(RctError::Config(format!("covariate '{cov}' is listed twice")));
            }
        }

        if let Some(stray) = self.categorical.iter().find(|c| !seen.contains(c.as_str())) {
            return Err(RctError::Config(format!(
                "categorical override '{stray}' is not one of the covariates"
            )));
        }

        Ok(())
    }
}

/// Everything a single pipeline run needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// URL (`http://`, `https://`) or local path of the delimited data file.
    pub source: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub variables: VariableSpec,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Decimal places used in rendered tables.
    #[serde(default = "default_display_precision")]
    pub display_precision: usize,
    /// Cell contents read as missing, in addition to empty fields.
    #[serde(default = "default_null_values")]
    pub null_values: Vec<String>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

fn default_fetch_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

fn default_display_precision() -> usize {
    DEFAULT_DISPLAY_PRECISION
}

fn default_null_values() -> Vec<String> {
    vec!["NA".to_owned()]
}

impl PipelineConfig {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            output_dir: default_output_dir(),
            variables: VariableSpec::default(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            display_precision: DEFAULT_DISPLAY_PRECISION,
            null_values: default_null_values(),
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.source.trim().is_empty() {
            return Err(RctError::Config("data source must not be empty".to_owned()));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(RctError::Config("fetch timeout must be at least 1 second".to_owned()));
        }
        self.variables.validate()
    }
}
