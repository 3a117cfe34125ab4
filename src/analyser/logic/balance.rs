//! Covariate balance between treatment arms.
//!
//! Each covariate is summarised on its own non-missing values, so a gap in
//! one column never shrinks the sample used for another.

use super::stats;
use super::types::{
    ArmSummary, BalanceRow, BalanceStats, BalanceTest, Covariate, CovariateValues, LevelCounts,
    SelectedData,
};
use std::collections::BTreeMap;

/// One balance row per covariate, in the order the covariates were listed.
pub fn check_balance(data: &SelectedData) -> Vec<BalanceRow> {
    data.covariates
        .iter()
        .map(|cov| balance_row(cov, &data.treatment))
        .collect()
}

fn balance_row(cov: &Covariate, treatment: &[Option<f64>]) -> BalanceRow {
    let n_missing = (0..cov.values.len())
        .filter(|&i| cov.values.is_missing(i))
        .count();

    let row = match &cov.values {
        CovariateValues::Numeric(values) => numeric_row(&cov.name, values, treatment, n_missing),
        CovariateValues::Categorical(values) => {
            categorical_row(&cov.name, values, treatment, n_missing)
        }
    };

    tracing::debug!(
        covariate = %row.covariate,
        test = row.test.as_str(),
        p_value = ?row.p_value,
        "Balance computed"
    );
    row
}

/// Splits covariate values by arm, skipping rows missing either field.
fn split_by_arm<'a, T>(
    values: &'a [Option<T>],
    treatment: &[Option<f64>],
) -> (Vec<&'a T>, Vec<&'a T>) {
    let mut control = Vec::new();
    let mut treated = Vec::new();
    for (value, arm) in values.iter().zip(treatment) {
        match (value, arm) {
            (Some(v), Some(t)) if *t == 1.0 => treated.push(v),
            (Some(v), Some(_)) => control.push(v),
            _ => {}
        }
    }
    (control, treated)
}

fn numeric_row(
    name: &str,
    values: &[Option<f64>],
    treatment: &[Option<f64>],
    n_missing: usize,
) -> BalanceRow {
    let (control, treated) = split_by_arm(values, treatment);
    let control: Vec<f64> = control.into_iter().copied().collect();
    let treated: Vec<f64> = treated.into_iter().copied().collect();

    let summarise = |v: &[f64]| ArmSummary {
        n: v.len(),
        mean: stats::mean(v),
        sd: stats::sample_sd(v),
    };
    let control_summary = summarise(&control);
    let treated_summary = summarise(&treated);

    let smd = match (
        treated_summary.mean,
        control_summary.mean,
        treated_summary.sd,
        control_summary.sd,
    ) {
        (Some(mt), Some(mc), Some(st), Some(sc)) => {
            let pooled = ((st.powi(2) + sc.powi(2)) / 2.0).sqrt();
            (pooled > 0.0).then(|| (mt - mc) / pooled)
        }
        _ => None,
    };

    BalanceRow {
        covariate: name.to_owned(),
        n_missing,
        stats: BalanceStats::Numeric {
            control: control_summary,
            treated: treated_summary,
            smd,
        },
        test: BalanceTest::WelchT,
        p_value: stats::welch_t_test(&treated, &control),
    }
}

fn categorical_row(
    name: &str,
    values: &[Option<String>],
    treatment: &[Option<f64>],
    n_missing: usize,
) -> BalanceRow {
    let (control, treated) = split_by_arm(values, treatment);

    // level -> (control, treated)
    let mut counts: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for level in &control {
        counts.entry(level.as_str()).or_default().0 += 1;
    }
    for level in &treated {
        counts.entry(level.as_str()).or_default().1 += 1;
    }

    let pct = |count: usize, total: usize| {
        if total == 0 {
            0.0
        } else {
            count as f64 / total as f64 * 100.0
        }
    };

    let levels: Vec<LevelCounts> = counts
        .iter()
        .map(|(level, &(c, t))| LevelCounts {
            level: (*level).to_owned(),
            control_count: c,
            control_pct: pct(c, control.len()),
            treated_count: t,
            treated_pct: pct(t, treated.len()),
        })
        .collect();

    let table: Vec<Vec<usize>> = counts.values().map(|&(c, t)| vec![c, t]).collect();

    BalanceRow {
        covariate: name.to_owned(),
        n_missing,
        stats: BalanceStats::Categorical {
            control_n: control.len(),
            treated_n: treated.len(),
            levels,
        },
        test: BalanceTest::ChiSquare,
        p_value: stats::chi_square_independence(&table),
    }
}
