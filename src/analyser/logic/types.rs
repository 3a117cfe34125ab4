use crate::config::VariableSpec;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

/// Normal-approximation multiplier for 95% confidence intervals.
pub const Z_95: f64 = 1.96;

// DATA STRUCTURES

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CovariateKind {
    Numeric,
    Categorical,
}

#[derive(Clone, Debug)]
pub enum CovariateValues {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
}

impl CovariateValues {
    pub fn kind(&self) -> CovariateKind {
        match self {
            Self::Numeric(_) => CovariateKind::Numeric,
            Self::Categorical(_) => CovariateKind::Categorical,
        }
    }

    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            Self::Numeric(v) => v[row].is_none(),
            Self::Categorical(v) => v[row].is_none(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(v) => v.len(),
            Self::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug)]
pub struct Covariate {
    pub name: String,
    pub values: CovariateValues,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingCount {
    pub column: String,
    pub missing: usize,
    pub total: usize,
}

impl MissingCount {
    pub fn missing_pct(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.missing as f64 / self.total as f64) * 100.0
        }
    }
}

/// Reduced view of the loaded table restricted to the analysed columns.
///
/// Treatment and outcome are materialised as `0.0`/`1.0` with `None` for
/// missing cells; covariates keep their own missingness.
#[derive(Clone, Debug)]
pub struct SelectedData {
    pub frame: DataFrame,
    pub spec: VariableSpec,
    pub treatment: Vec<Option<f64>>,
    pub outcome: Vec<Option<f64>>,
    pub covariates: Vec<Covariate>,
    pub missing: Vec<MissingCount>,
}

impl SelectedData {
    pub fn n_rows(&self) -> usize {
        self.treatment.len()
    }
}

// BALANCE

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceTest {
    WelchT,
    ChiSquare,
}

impl BalanceTest {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WelchT => "Welch t-test",
            Self::ChiSquare => "Pearson chi-square",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArmSummary {
    pub n: usize,
    pub mean: Option<f64>,
    pub sd: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelCounts {
    pub level: String,
    pub control_count: usize,
    pub control_pct: f64,
    pub treated_count: usize,
    pub treated_pct: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BalanceStats {
    Numeric {
        control: ArmSummary,
        treated: ArmSummary,
        /// Standardised mean difference, treated minus control.
        smd: Option<f64>,
    },
    Categorical {
        control_n: usize,
        treated_n: usize,
        levels: Vec<LevelCounts>,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BalanceRow {
    pub covariate: String,
    pub n_missing: usize,
    pub stats: BalanceStats,
    pub test: BalanceTest,
    pub p_value: Option<f64>,
}

impl BalanceRow {
    pub fn kind(&self) -> CovariateKind {
        match self.stats {
            BalanceStats::Numeric { .. } => CovariateKind::Numeric,
            BalanceStats::Categorical { .. } => CovariateKind::Categorical,
        }
    }

    /// Non-missing observations per arm as `(control, treated)`.
    pub fn arm_counts(&self) -> (usize, usize) {
        match &self.stats {
            BalanceStats::Numeric { control, treated, .. } => (control.n, treated.n),
            BalanceStats::Categorical {
                control_n,
                treated_n,
                ..
            } => (*control_n, *treated_n),
        }
    }
}

// EFFECT ESTIMATES

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateKind {
    DifferenceInMeans,
    OlsClassical,
    OlsRobust,
    OlsAdjustedRobust,
}

impl EstimateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DifferenceInMeans => "Difference in means",
            Self::OlsClassical => "OLS (classical SE)",
            Self::OlsRobust => "OLS (HC2 robust SE)",
            Self::OlsAdjustedRobust => "OLS + covariates (HC2 robust SE)",
        }
    }

    pub fn is_regression(&self) -> bool {
        !matches!(self, Self::DifferenceInMeans)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectEstimate {
    pub model: EstimateKind,
    pub estimate: f64,
    pub std_error: Option<f64>,
    pub t_stat: Option<f64>,
    pub p_value: Option<f64>,
    pub conf_low: Option<f64>,
    pub conf_high: Option<f64>,
    pub n_obs: usize,
    pub dof: Option<usize>,
}

impl EffectEstimate {
    /// Descriptive estimate with no sampling variance attached.
    pub fn descriptive(model: EstimateKind, estimate: f64, n_obs: usize) -> Self {
        Self {
            model,
            estimate,
            std_error: None,
            t_stat: None,
            p_value: None,
            conf_low: None,
            conf_high: None,
            n_obs,
            dof: None,
        }
    }

    pub fn label(&self) -> &'static str {
        self.model.as_str()
    }

    pub fn conf_int(&self) -> Option<(f64, f64)> {
        self.conf_low.zip(self.conf_high)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelFailure {
    pub model: EstimateKind,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectReport {
    pub difference_in_means: EffectEstimate,
    pub unadjusted_classical: EffectEstimate,
    /// Absent when HC2 is undefined for the unadjusted fit.
    pub unadjusted_robust: Option<EffectEstimate>,
    pub adjusted_robust: Option<EffectEstimate>,
    pub failures: Vec<ModelFailure>,
}

impl EffectReport {
    /// Regression-based estimates, in model order.
    pub fn regression_estimates(&self) -> Vec<&EffectEstimate> {
        self.all_estimates()
            .into_iter()
            .filter(|e| e.model.is_regression())
            .collect()
    }

    /// Every estimate that was produced, in model order.
    pub fn all_estimates(&self) -> Vec<&EffectEstimate> {
        let mut out = vec![&self.difference_in_means, &self.unadjusted_classical];
        out.extend(self.unadjusted_robust.as_ref());
        out.extend(self.adjusted_robust.as_ref());
        out
    }
}

/// Everything computed from a frame before reporting.
#[derive(Clone, Debug, Serialize)]
pub struct AnalysisResults {
    pub n_rows: usize,
    pub spec: VariableSpec,
    pub missing: Vec<MissingCount>,
    pub balance: Vec<BalanceRow>,
    pub effects: EffectReport,
}
