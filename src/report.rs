//! Presentation layer: tables, the coefficient plot and the artifact bundle.
//!
//! Nothing here computes statistics. Every artifact is written
//! independently; a failed write is logged and collected as an
//! [`RctError::Output`] while the remaining artifacts are still attempted.

pub mod canvas;
pub mod plot;
pub mod tables;

use crate::analyser::logic::{AnalysisResults, save_csv};
use crate::error::{RctError, Result};
use crate::utils::fmt_num;
use chrono::{DateTime, Utc};
use polars::prelude::DataFrame;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const BALANCE_MD: &str = "balance_table.md";
pub const BALANCE_CSV: &str = "balance_table.csv";
pub const MODELS_MD: &str = "model_comparison.md";
pub const MODELS_CSV: &str = "model_comparison.csv";
pub const PLOT_SVG: &str = "coefficient_plot.svg";
pub const SUMMARY_MD: &str = "summary.md";
pub const RESULTS_JSON: &str = "results.json";

/// Outcome of writing the artifact bundle.
#[derive(Debug, Default)]
pub struct ArtifactReport {
    pub written: Vec<PathBuf>,
    pub errors: Vec<RctError>,
}

impl ArtifactReport {
    fn record(&mut self, path: PathBuf, result: Result<()>) {
        match result {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Artifact written");
                self.written.push(path);
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to write artifact");
                self.errors.push(e);
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Serialize)]
struct ResultsDocument<'a> {
    generated_at: DateTime<Utc>,
    source: &'a str,
    #[serde(flatten)]
    results: &'a AnalysisResults,
}

/// Writes every artifact for `results` into `dir`, creating it if needed.
pub fn write_artifacts(
    results: &AnalysisResults,
    source: &str,
    dir: &Path,
    precision: usize,
) -> ArtifactReport {
    let mut report = ArtifactReport::default();

    if let Err(e) = std::fs::create_dir_all(dir) {
        report.record(
            dir.to_path_buf(),
            Err(RctError::Output(format!(
                "Failed to create results directory {}: {e}",
                dir.display()
            ))),
        );
        return report;
    }

    let generated_at = Utc::now();

    let path = dir.join(BALANCE_MD);
    let content = tables::render_balance_markdown(&results.balance, precision);
    report.record(path.clone(), write_text(&path, &content));

    let path = dir.join(BALANCE_CSV);
    report.record(
        path.clone(),
        write_frame(&path, tables::balance_frame(&results.balance, precision)),
    );

    let path = dir.join(MODELS_MD);
    let content = tables::render_models_markdown(&results.effects, precision);
    report.record(path.clone(), write_text(&path, &content));

    let path = dir.join(MODELS_CSV);
    report.record(
        path.clone(),
        write_frame(&path, tables::models_frame(&results.effects, precision)),
    );

    let path = dir.join(PLOT_SVG);
    let svg = plot::render_coefficient_plot(&results.effects.regression_estimates(), precision);
    report.record(path.clone(), write_text(&path, &svg));

    let path = dir.join(SUMMARY_MD);
    let content = render_summary(results, source, precision, generated_at);
    report.record(path.clone(), write_text(&path, &content));

    let path = dir.join(RESULTS_JSON);
    let doc = ResultsDocument {
        generated_at,
        source,
        results,
    };
    let json = serde_json::to_string_pretty(&doc)
        .map_err(|e| RctError::Output(format!("Failed to serialise results: {e}")));
    report.record(path.clone(), json.and_then(|j| write_text(&path, &j)));

    tracing::info!(
        dir = %dir.display(),
        written = report.written.len(),
        failed = report.errors.len(),
        "Artifacts written"
    );
    report
}

fn write_text(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content)
        .map_err(|e| RctError::Output(format!("Failed to write {}: {e}", path.display())))
}

fn write_frame(path: &Path, frame: polars::error::PolarsResult<DataFrame>) -> Result<()> {
    let mut df = frame.map_err(|e| {
        RctError::Output(format!("Failed to build table for {}: {e}", path.display()))
    })?;
    save_csv(&mut df, path)
}

/// Human-readable run summary combining every table.
pub fn render_summary(
    results: &AnalysisResults,
    source: &str,
    precision: usize,
    generated_at: DateTime<Utc>,
) -> String {
    let spec = &results.spec;
    let dim = &results.effects.difference_in_means;
    let mut md = String::new();

    md.push_str("# RCT Analysis Summary\n\n");
    md.push_str(&format!("> **Source:** `{source}`  \n"));
    md.push_str(&format!(
        "> **Generated:** {}  \n",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    md.push_str(&format!("> **Rows:** {}  \n\n", results.n_rows));

    md.push_str("## Variables\n\n");
    md.push_str(&format!("- Treatment: `{}`\n", spec.treatment));
    md.push_str(&format!("- Outcome: `{}`\n", spec.outcome));
    md.push_str(&format!(
        "- Covariates: {}\n\n",
        spec.covariates
            .iter()
            .map(|c| format!("`{c}`"))
            .collect::<Vec<_>>()
            .join(", ")
    ));

    md.push_str("## Missing Values\n\n");
    md.push_str(&tables::render_missing_markdown(&results.missing));
    md.push('\n');

    md.push_str("## Covariate Balance\n\n");
    md.push_str(&tables::render_balance_markdown(&results.balance, precision));
    md.push('\n');

    md.push_str("## Difference in Means\n\n");
    md.push_str(&format!(
        "Mean outcome among treated minus control: **{}** (n = {})\n\n",
        fmt_num(dim.estimate, precision),
        dim.n_obs
    ));

    md.push_str("## Regression Estimates\n\n");
    md.push_str(&tables::render_models_markdown(&results.effects, precision));
    md.push_str("\nConfidence intervals use the normal approximation (estimate ± 1.96 × SE).\n");

    if !results.effects.failures.is_empty() {
        md.push_str("\n## Models Not Estimated\n\n");
        for failure in &results.effects.failures {
            md.push_str(&format!("- {}: {}\n", failure.model.as_str(), failure.message));
        }
    }

    md
}
