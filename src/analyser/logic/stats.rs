//! Small descriptive statistics and two-group tests used by the balance
//! checker and the estimator.

use statrs::distribution::{ChiSquared, ContinuousCDF as _, StudentsT};

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample variance with `n - 1` denominator.
pub fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some(ss / (values.len() - 1) as f64)
}

pub fn sample_sd(values: &[f64]) -> Option<f64> {
    sample_variance(values).map(f64::sqrt)
}

/// Two-sided p-value for a t statistic with `dof` degrees of freedom.
pub fn two_sided_t_p(t: f64, dof: f64) -> Option<f64> {
    if !t.is_finite() || dof.is_nan() || dof <= 0.0 {
        return None;
    }
    let dist = StudentsT::new(0.0, 1.0, dof).ok()?;
    Some((2.0 * dist.sf(t.abs())).min(1.0))
}

/// Welch's unequal-variance two-sample t-test. Returns the two-sided p-value.
///
/// Undefined when either group has fewer than two values or both are constant.
pub fn welch_t_test(a: &[f64], b: &[f64]) -> Option<f64> {
    let (na, nb) = (a.len() as f64, b.len() as f64);
    let va = sample_variance(a)? / na;
    let vb = sample_variance(b)? / nb;
    let se2 = va + vb;
    if se2 <= 0.0 {
        return None;
    }

    let t = (mean(a)? - mean(b)?) / se2.sqrt();
    let dof = se2.powi(2) / (va.powi(2) / (na - 1.0) + vb.powi(2) / (nb - 1.0));
    two_sided_t_p(t, dof)
}

/// Pearson chi-square test of independence on an `r x c` table of counts,
/// without continuity correction. Returns the p-value.
///
/// Rows or columns summing to zero are dropped first; the test is undefined
/// if fewer than two of either remain.
pub fn chi_square_independence(table: &[Vec<usize>]) -> Option<f64> {
    let n_cols = table.first()?.len();
    let col_totals: Vec<usize> = (0..n_cols)
        .map(|j| table.iter().map(|row| row[j]).sum())
        .collect();
    let kept_cols: Vec<usize> = (0..n_cols).filter(|&j| col_totals[j] > 0).collect();
    let kept_rows: Vec<&Vec<usize>> = table
        .iter()
        .filter(|row| row.iter().sum::<usize>() > 0)
        .collect();
    if kept_rows.len() < 2 || kept_cols.len() < 2 {
        return None;
    }

    let total: f64 = kept_rows.iter().flat_map(|r| r.iter()).sum::<usize>() as f64;
    let mut statistic = 0.0;
    for row in &kept_rows {
        let row_total: f64 = row.iter().sum::<usize>() as f64;
        for &j in &kept_cols {
            let expected = row_total * col_totals[j] as f64 / total;
            statistic += (row[j] as f64 - expected).powi(2) / expected;
        }
    }

    let dof = ((kept_rows.len() - 1) * (kept_cols.len() - 1)) as f64;
    let dist = ChiSquared::new(dof).ok()?;
    Some(dist.sf(statistic))
}
