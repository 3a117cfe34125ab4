//! Balance and model-comparison tables as Markdown, plain text and data frames.

use crate::analyser::logic::{BalanceRow, BalanceStats, EffectEstimate, EffectReport, MissingCount};
use crate::utils::{fmt_num, fmt_opt, fmt_p};
use polars::prelude::*;

/// One displayed line of the balance table.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceLine {
    pub covariate: String,
    pub level: String,
    pub control: String,
    pub treated: String,
    pub p_value: String,
}

/// Flattens balance rows into display lines: one per numeric covariate,
/// one header plus one per level for categorical covariates.
pub fn balance_lines(rows: &[BalanceRow], precision: usize) -> Vec<BalanceLine> {
    let mut lines = Vec::new();
    for row in rows {
        let p_value = fmt_p(row.p_value, precision);
        match &row.stats {
            BalanceStats::Numeric {
                control, treated, ..
            } => {
                let cell = |mean: Option<f64>, sd: Option<f64>| {
                    format!("{} ({})", fmt_opt(mean, precision), fmt_opt(sd, precision))
                };
                lines.push(BalanceLine {
                    covariate: row.covariate.clone(),
                    level: "Mean (SD)".to_owned(),
                    control: cell(control.mean, control.sd),
                    treated: cell(treated.mean, treated.sd),
                    p_value,
                });
            }
            BalanceStats::Categorical {
                control_n,
                treated_n,
                levels,
            } => {
                lines.push(BalanceLine {
                    covariate: row.covariate.clone(),
                    level: "n".to_owned(),
                    control: control_n.to_string(),
                    treated: treated_n.to_string(),
                    p_value,
                });
                for level in levels {
                    lines.push(BalanceLine {
                        covariate: row.covariate.clone(),
                        level: level.level.clone(),
                        control: count_pct(level.control_count, level.control_pct),
                        treated: count_pct(level.treated_count, level.treated_pct),
                        p_value: String::new(),
                    });
                }
            }
        }
        // Missingness is counted over all rows, not split by arm.
        if row.n_missing > 0 {
            lines.push(BalanceLine {
                covariate: row.covariate.clone(),
                level: "Missing (all rows)".to_owned(),
                control: row.n_missing.to_string(),
                treated: String::new(),
                p_value: String::new(),
            });
        }
    }
    lines
}

fn count_pct(count: usize, pct: f64) -> String {
    format!("{count} ({}%)", fmt_num(pct, 1))
}

pub fn render_balance_markdown(rows: &[BalanceRow], precision: usize) -> String {
    let mut md = String::new();
    md.push_str("| Covariate | Level | Control | Treated | p-value |\n");
    md.push_str("|---|---|---:|---:|---:|\n");
    let mut previous: Option<String> = None;
    for line in balance_lines(rows, precision) {
        let name = if previous.as_deref() == Some(line.covariate.as_str()) {
            String::new()
        } else {
            format!("**{}**", line.covariate)
        };
        md.push_str(&format!(
            "| {name} | {} | {} | {} | {} |\n",
            line.level, line.control, line.treated, line.p_value
        ));
        previous = Some(line.covariate);
    }
    md
}

pub fn balance_frame(rows: &[BalanceRow], precision: usize) -> PolarsResult<DataFrame> {
    let lines = balance_lines(rows, precision);
    let column = |name: &str, f: fn(&BalanceLine) -> &str| {
        Column::from(Series::new(
            name.into(),
            lines.iter().map(|l| f(l).to_owned()).collect::<Vec<String>>(),
        ))
    };
    DataFrame::new(vec![
        column("covariate", |l| l.covariate.as_str()),
        column("level", |l| l.level.as_str()),
        column("control", |l| l.control.as_str()),
        column("treated", |l| l.treated.as_str()),
        column("p_value", |l| l.p_value.as_str()),
    ])
}

/// Model comparison table for the regression-based estimates.
pub fn render_models_markdown(report: &EffectReport, precision: usize) -> String {
    let mut md = String::new();
    md.push_str("| Model | Estimate | Std. Error | p-value | 95% CI | N |\n");
    md.push_str("|---|---:|---:|---:|---|---:|\n");
    for est in report.regression_estimates() {
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            est.label(),
            fmt_num(est.estimate, precision),
            fmt_opt(est.std_error, precision),
            fmt_p(est.p_value, precision),
            fmt_ci(est, precision),
            est.n_obs
        ));
    }
    md
}

/// Rounded numeric model table, one row per regression estimate.
pub fn models_frame(report: &EffectReport, precision: usize) -> PolarsResult<DataFrame> {
    let estimates = report.regression_estimates();
    let round = |v: f64| {
        let factor = 10f64.powi(precision as i32);
        (v * factor).round() / factor
    };
    DataFrame::new(vec![
        Column::from(Series::new(
            "model".into(),
            estimates.iter().map(|e| e.label()).collect::<Vec<_>>(),
        )),
        Column::from(Series::new(
            "estimate".into(),
            estimates.iter().map(|e| round(e.estimate)).collect::<Vec<_>>(),
        )),
        Column::from(Series::new(
            "std_error".into(),
            estimates
                .iter()
                .map(|e| e.std_error.map(round))
                .collect::<Vec<_>>(),
        )),
        Column::from(Series::new(
            "p_value".into(),
            estimates
                .iter()
                .map(|e| e.p_value.map(round))
                .collect::<Vec<_>>(),
        )),
    ])
}

fn fmt_ci(est: &EffectEstimate, precision: usize) -> String {
    match est.conf_int() {
        Some((lo, hi)) => format!("[{}, {}]", fmt_num(lo, precision), fmt_num(hi, precision)),
        None => "—".to_owned(),
    }
}

pub fn render_missing_markdown(missing: &[MissingCount]) -> String {
    let mut md = String::new();
    md.push_str("| Column | Missing | Total | % |\n");
    md.push_str("|---|---:|---:|---:|\n");
    for m in missing {
        md.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            m.column,
            m.missing,
            m.total,
            fmt_num(m.missing_pct(), 1)
        ));
    }
    md
}

// Plain-text renderings for the terminal

fn render_text_table(header: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let fmt_row = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, &w)| format!("{c:<w$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_owned()
    };

    let mut out = fmt_row(header.to_vec());
    out.push('\n');
    out.push_str(&widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("  "));
    out.push('\n');
    for row in rows {
        out.push_str(&fmt_row(row.iter().map(String::as_str).collect()));
        out.push('\n');
    }
    out
}

pub fn render_balance_text(rows: &[BalanceRow], precision: usize) -> String {
    let body: Vec<Vec<String>> = balance_lines(rows, precision)
        .into_iter()
        .map(|l| vec![l.covariate, l.level, l.control, l.treated, l.p_value])
        .collect();
    render_text_table(&["Covariate", "Level", "Control", "Treated", "p-value"], &body)
}

pub fn render_models_text(report: &EffectReport, precision: usize) -> String {
    let dim = &report.difference_in_means;
    let mut out = format!(
        "Difference in means: {} (n = {})\n\n",
        fmt_num(dim.estimate, precision),
        dim.n_obs
    );
    let body: Vec<Vec<String>> = report
        .regression_estimates()
        .into_iter()
        .map(|e| {
            vec![
                e.label().to_owned(),
                fmt_num(e.estimate, precision),
                fmt_opt(e.std_error, precision),
                fmt_p(e.p_value, precision),
                fmt_ci(e, precision),
            ]
        })
        .collect();
    out.push_str(&render_text_table(
        &["Model", "Estimate", "Std. Error", "p-value", "95% CI"],
        &body,
    ));
    for failure in &report.failures {
        out.push_str(&format!(
            "\n{} not estimated: {}\n",
            failure.model.as_str(),
            failure.message
        ));
    }
    out
}

pub fn render_missing_text(missing: &[MissingCount]) -> String {
    let body: Vec<Vec<String>> = missing
        .iter()
        .map(|m| {
            vec![
                m.column.clone(),
                m.missing.to_string(),
                m.total.to_string(),
                fmt_num(m.missing_pct(), 1),
            ]
        })
        .collect();
    render_text_table(&["Column", "Missing", "Total", "%"], &body)
}
