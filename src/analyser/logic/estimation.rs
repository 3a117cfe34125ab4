//! Treatment effect estimation.
//!
//! Four estimates are produced from one selected dataset:
//!
//! 1. the difference in group means of the outcome,
//! 2. the treatment coefficient of `y ~ 1 + w` with classical standard errors,
//! 3. the same coefficient with HC2 heteroskedasticity-robust standard errors,
//! 4. the treatment coefficient of `y ~ 1 + w + covariates` with HC2 errors.
//!
//! (2) and (3) come from a single least-squares fit, so their point estimates
//! are the same number. Confidence intervals use the normal multiplier
//! [`Z_95`] regardless of sample size; p-values use Student's t on `n - p`
//! degrees of freedom.

use super::stats;
use super::types::{
    CovariateValues, EffectEstimate, EffectReport, EstimateKind, ModelFailure, SelectedData, Z_95,
};
use crate::error::{RctError, Result, ResultExt as _};
use nalgebra::{DMatrix, DVector};
use polars::prelude::*;
use std::collections::BTreeSet;

const INTERCEPT: &str = "(Intercept)";

/// `1 - h_ii` below this makes the HC2 weight blow up.
const LEVERAGE_TOL: f64 = 1e-10;

/// Ordinary least squares fit of `y = X b + e`.
#[derive(Debug, Clone)]
pub struct OlsFit {
    x: DMatrix<f64>,
    names: Vec<String>,
    coefficients: DVector<f64>,
    xtx_inv: DMatrix<f64>,
    residuals: DVector<f64>,
}

impl OlsFit {
    /// Fits by the normal equations after checking the design has full column rank.
    pub fn fit(x: DMatrix<f64>, y: DVector<f64>, names: Vec<String>) -> Result<Self> {
        let (n, p) = x.shape();
        if names.len() != p || y.len() != n {
            return Err(RctError::Estimation(format!(
                "design is {n}x{p} with {} names and {} responses",
                names.len(),
                y.len()
            )));
        }
        if n <= p {
            return Err(RctError::Estimation(format!(
                "{n} complete observations for {p} regressors; need more observations than regressors"
            )));
        }

        let singular_values = x.clone().svd(false, false).singular_values;
        let tol = singular_values.max() * n.max(p) as f64 * f64::EPSILON;
        let rank = singular_values.iter().filter(|&&s| s > tol).count();
        if rank < p {
            return Err(RctError::Estimation(format!(
                "design matrix is rank deficient (rank {rank} for {p} regressors)"
            )));
        }

        let xt = x.transpose();
        let xtx_inv = (&xt * &x)
            .try_inverse()
            .ok_or_else(|| RctError::Estimation("X'X is singular".to_owned()))?;
        let coefficients = &xtx_inv * (&xt * &y);
        let residuals = &y - &x * &coefficients;

        Ok(Self {
            x,
            names,
            coefficients,
            xtx_inv,
            residuals,
        })
    }

    pub fn n_obs(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_params(&self) -> usize {
        self.x.ncols()
    }

    /// Residual degrees of freedom, `n - p`.
    pub fn dof(&self) -> usize {
        self.n_obs() - self.n_params()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn coefficients(&self) -> &DVector<f64> {
        &self.coefficients
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn rss(&self) -> f64 {
        self.residuals.norm_squared()
    }

    /// Diagonal of the hat matrix `X (X'X)^-1 X'`.
    pub fn leverages(&self) -> DVector<f64> {
        DVector::from_iterator(
            self.n_obs(),
            self.x.row_iter().map(|row| {
                let xi = row.transpose();
                xi.dot(&(&self.xtx_inv * &xi))
            }),
        )
    }

    /// `sigma^2 (X'X)^-1` with `sigma^2 = RSS / (n - p)`.
    pub fn classical_covariance(&self) -> DMatrix<f64> {
        let sigma2 = self.rss() / self.dof() as f64;
        &self.xtx_inv * sigma2
    }

    /// HC2 sandwich: `(X'X)^-1 [sum e_i^2 / (1 - h_ii) x_i x_i'] (X'X)^-1`.
    pub fn hc2_covariance(&self) -> Result<DMatrix<f64>> {
        let p = self.n_params();
        let leverages = self.leverages();
        let mut meat = DMatrix::<f64>::zeros(p, p);

        for (i, row) in self.x.row_iter().enumerate() {
            let one_minus_h = 1.0 - leverages[i];
            if one_minus_h <= LEVERAGE_TOL {
                return Err(RctError::Estimation(format!(
                    "observation {i} has leverage 1; HC2 standard errors are undefined"
                )));
            }
            let weight = self.residuals[i].powi(2) / one_minus_h;
            let xi = row.transpose();
            meat.ger(weight, &xi, &xi, 1.0);
        }

        Ok(&self.xtx_inv * meat * &self.xtx_inv)
    }

    /// Builds the reported record for one coefficient under a covariance matrix.
    pub fn estimate_for(
        &self,
        model: EstimateKind,
        index: usize,
        covariance: &DMatrix<f64>,
    ) -> EffectEstimate {
        let estimate = self.coefficients[index];
        let se = covariance[(index, index)].sqrt();
        let dof = self.dof();

        let (std_error, t_stat, conf_low, conf_high) = if se.is_finite() {
            let t = (se > 0.0).then(|| estimate / se);
            (Some(se), t, Some(estimate - Z_95 * se), Some(estimate + Z_95 * se))
        } else {
            (None, None, None, None)
        };

        EffectEstimate {
            model,
            estimate,
            std_error,
            t_stat,
            p_value: t_stat.and_then(|t| stats::two_sided_t_p(t, dof as f64)),
            conf_low,
            conf_high,
            n_obs: self.n_obs(),
            dof: Some(dof),
        }
    }
}

/// Counts `(control, treated)` and rejects designs with an empty arm.
fn check_treatment_variation(treatment: &[f64]) -> Result<(usize, usize)> {
    let treated = treatment.iter().filter(|&&w| w == 1.0).count();
    let control = treatment.len() - treated;
    if treated == 0 {
        return Err(RctError::Estimation(
            "treatment has zero variance: no treated units".to_owned(),
        ));
    }
    if control == 0 {
        return Err(RctError::Estimation(
            "treatment has zero variance: no control units".to_owned(),
        ));
    }
    Ok((control, treated))
}

/// Rows complete on treatment and outcome, as `(w, y)` pairs.
fn complete_pairs(data: &SelectedData) -> Vec<(f64, f64)> {
    data.treatment
        .iter()
        .zip(&data.outcome)
        .filter_map(|(w, y)| w.zip(*y))
        .collect()
}

/// Mean outcome among treated minus mean outcome among control units.
///
/// Descriptive only: no standard error is attached.
pub fn difference_in_means(data: &SelectedData) -> Result<EffectEstimate> {
    let treatment = data.spec.treatment.as_str();
    let outcome = data.spec.outcome.as_str();

    let grouped = data
        .frame
        .clone()
        .lazy()
        .filter(col(treatment).is_not_null().and(col(outcome).is_not_null()))
        .group_by([col(treatment)])
        .agg([
            col(outcome).mean().alias("mean_outcome"),
            col(outcome).count().alias("n"),
        ])
        .collect()
        .context("Failed to group outcome by treatment")?;

    let arms = grouped.column(treatment)?.as_materialized_series().f64()?.clone();
    let means = grouped
        .column("mean_outcome")?
        .as_materialized_series()
        .f64()?
        .clone();
    let counts = grouped
        .column("n")?
        .as_materialized_series()
        .cast(&DataType::UInt64)?;
    let counts = counts.u64()?;

    let mut treated_mean = None;
    let mut control_mean = None;
    let mut n_obs = 0usize;
    for i in 0..grouped.height() {
        let (Some(arm), Some(mean)) = (arms.get(i), means.get(i)) else {
            continue;
        };
        n_obs += counts.get(i).unwrap_or(0) as usize;
        if arm == 1.0 {
            treated_mean = Some(mean);
        } else {
            control_mean = Some(mean);
        }
    }

    match (treated_mean, control_mean) {
        (Some(t), Some(c)) => Ok(EffectEstimate::descriptive(
            EstimateKind::DifferenceInMeans,
            t - c,
            n_obs,
        )),
        (None, _) => Err(RctError::Estimation(
            "treatment has zero variance: no treated units".to_owned(),
        )),
        (_, None) => Err(RctError::Estimation(
            "treatment has zero variance: no control units".to_owned(),
        )),
    }
}

/// Fits `outcome ~ 1 + treatment` on rows complete for both.
pub fn fit_unadjusted(data: &SelectedData) -> Result<OlsFit> {
    let pairs = complete_pairs(data);
    let treatment: Vec<f64> = pairs.iter().map(|&(w, _)| w).collect();
    check_treatment_variation(&treatment)?;

    let n = pairs.len();
    let x = DMatrix::from_fn(n, 2, |i, j| if j == 0 { 1.0 } else { pairs[i].0 });
    let y = DVector::from_iterator(n, pairs.iter().map(|&(_, y)| y));
    OlsFit::fit(
        x,
        y,
        vec![INTERCEPT.to_owned(), data.spec.treatment.clone()],
    )
}

/// Design for `outcome ~ 1 + treatment + covariates`, listwise-complete.
///
/// Categorical covariates are dummy coded against their first sorted level.
pub fn adjusted_design(data: &SelectedData) -> Result<(DMatrix<f64>, DVector<f64>, Vec<String>)> {
    let complete: Vec<usize> = (0..data.n_rows())
        .filter(|&i| {
            data.treatment[i].is_some()
                && data.outcome[i].is_some()
                && data.covariates.iter().all(|c| !c.values.is_missing(i))
        })
        .collect();

    let treatment: Vec<f64> = complete.iter().filter_map(|&i| data.treatment[i]).collect();
    check_treatment_variation(&treatment)?;

    let mut names = vec![INTERCEPT.to_owned(), data.spec.treatment.clone()];
    let mut columns: Vec<Vec<f64>> = vec![vec![1.0; complete.len()], treatment];

    for cov in &data.covariates {
        match &cov.values {
            CovariateValues::Numeric(values) => {
                names.push(cov.name.clone());
                columns.push(complete.iter().filter_map(|&i| values[i]).collect());
            }
            CovariateValues::Categorical(values) => {
                let levels: BTreeSet<&str> = complete
                    .iter()
                    .filter_map(|&i| values[i].as_deref())
                    .collect();
                for level in levels.iter().skip(1) {
                    names.push(format!("{}={level}", cov.name));
                    columns.push(
                        complete
                            .iter()
                            .map(|&i| {
                                if values[i].as_deref() == Some(*level) {
                                    1.0
                                } else {
                                    0.0
                                }
                            })
                            .collect(),
                    );
                }
            }
        }
    }

    let n = complete.len();
    let x = DMatrix::from_fn(n, columns.len(), |i, j| columns[j][i]);
    let y = DVector::from_iterator(n, complete.iter().filter_map(|&i| data.outcome[i]));
    Ok((x, y, names))
}

/// Fits the covariate-adjusted model.
pub fn fit_adjusted(data: &SelectedData) -> Result<OlsFit> {
    let (x, y, names) = adjusted_design(data)?;
    OlsFit::fit(x, y, names)
}

/// Runs all four estimators.
///
/// Fails when the unadjusted comparison itself is impossible (an empty arm,
/// too few rows). A failure confined to one robust estimate, such as an
/// observation with leverage 1, is logged and recorded in
/// [`EffectReport::failures`] while the other estimates are kept.
pub fn estimate_effects(data: &SelectedData) -> Result<EffectReport> {
    let unadjusted = fit_unadjusted(data).context("Unadjusted OLS")?;
    let w = data.spec.treatment.as_str();
    let w_index = unadjusted
        .index_of(w)
        .ok_or_else(|| RctError::Estimation(format!("treatment '{w}' missing from design")))?;

    let difference_in_means = difference_in_means(data).context("Difference in means")?;

    let unadjusted_classical = unadjusted.estimate_for(
        EstimateKind::OlsClassical,
        w_index,
        &unadjusted.classical_covariance(),
    );

    let mut failures = Vec::new();
    let unadjusted_robust = recover(
        EstimateKind::OlsRobust,
        unadjusted
            .hc2_covariance()
            .map(|cov| unadjusted.estimate_for(EstimateKind::OlsRobust, w_index, &cov)),
        &mut failures,
    )?;

    let adjusted_robust = recover(
        EstimateKind::OlsAdjustedRobust,
        fit_adjusted(data).and_then(|fit| {
            let idx = fit.index_of(w).ok_or_else(|| {
                RctError::Estimation(format!("treatment '{w}' missing from design"))
            })?;
            let cov = fit.hc2_covariance()?;
            Ok(fit.estimate_for(EstimateKind::OlsAdjustedRobust, idx, &cov))
        }),
        &mut failures,
    )?;

    for est in [&difference_in_means, &unadjusted_classical]
        .into_iter()
        .chain(unadjusted_robust.as_ref())
        .chain(adjusted_robust.as_ref())
    {
        tracing::info!(
            model = est.label(),
            estimate = est.estimate,
            std_error = ?est.std_error,
            p_value = ?est.p_value,
            n_obs = est.n_obs,
            "Effect estimated"
        );
    }

    Ok(EffectReport {
        difference_in_means,
        unadjusted_classical,
        unadjusted_robust,
        adjusted_robust,
        failures,
    })
}

/// Turns an estimation failure of one model into a recorded [`ModelFailure`].
///
/// Errors of any other kind still propagate.
fn recover(
    model: EstimateKind,
    result: Result<EffectEstimate>,
    failures: &mut Vec<ModelFailure>,
) -> Result<Option<EffectEstimate>> {
    match result {
        Ok(est) => Ok(Some(est)),
        Err(RctError::Estimation(message)) => {
            tracing::warn!(model = model.as_str(), %message, "Model could not be estimated");
            failures.push(ModelFailure { model, message });
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
