use super::balance::check_balance;
use super::estimation::estimate_effects;
use super::io::{LoadOptions, load_df};
use super::selection::select_variables;
use super::types::AnalysisResults;
use crate::config::{PipelineConfig, VariableSpec};
use crate::error::{RctError, Result};
use crate::report::{self, ArtifactReport};
use polars::prelude::DataFrame;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Result of a full pipeline run.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub results: AnalysisResults,
    pub artifacts: Vec<PathBuf>,
    /// Artifact write failures; the in-memory results remain valid.
    pub output_errors: Vec<RctError>,
    pub duration: Duration,
}

/// Select, check balance and estimate effects on an in-memory frame.
pub fn analyze_frame(df: &DataFrame, spec: &VariableSpec) -> Result<AnalysisResults> {
    let data = select_variables(df, spec)?;

    let balance = {
        let _span = tracing::info_span!("balance").entered();
        check_balance(&data)
    };

    let effects = {
        let _span = tracing::info_span!("estimate").entered();
        estimate_effects(&data)?
    };

    Ok(AnalysisResults {
        n_rows: data.n_rows(),
        spec: data.spec.clone(),
        missing: data.missing.clone(),
        balance,
        effects,
    })
}

/// Load, select and summarise balance only.
pub fn balance_flow(config: &PipelineConfig) -> Result<Vec<super::types::BalanceRow>> {
    config.validate()?;
    let df = load_df(&config.source, &load_options(config))?;
    let data = select_variables(&df, &config.variables)?;
    Ok(check_balance(&data))
}

/// Load and report per-column missing values for the analysed columns.
pub fn missing_flow(config: &PipelineConfig) -> Result<Vec<super::types::MissingCount>> {
    config.validate()?;
    let df = load_df(&config.source, &load_options(config))?;
    let data = select_variables(&df, &config.variables)?;
    Ok(data.missing)
}

/// Runs load → select → {balance, estimate} → report, once.
pub fn run_pipeline(config: &PipelineConfig) -> Result<PipelineOutcome> {
    let start = Instant::now();
    config.validate()?;
    tracing::info!(source = %config.source, output = %config.output_dir.display(), "Starting pipeline");

    let df = {
        let _span = tracing::info_span!("load").entered();
        load_df(&config.source, &load_options(config))?
    };

    let results = analyze_frame(&df, &config.variables)?;

    let artifacts: ArtifactReport = {
        let _span = tracing::info_span!("report").entered();
        report::write_artifacts(
            &results,
            &config.source,
            &config.output_dir,
            config.display_precision,
        )
    };

    let duration = start.elapsed();
    if artifacts.is_complete() {
        tracing::info!(
            elapsed_ms = duration.as_millis() as u64,
            artifacts = artifacts.written.len(),
            "Pipeline finished"
        );
    } else {
        tracing::warn!(
            elapsed_ms = duration.as_millis() as u64,
            artifacts = artifacts.written.len(),
            output_errors = artifacts.errors.len(),
            "Pipeline finished with unwritten artifacts"
        );
    }

    Ok(PipelineOutcome {
        results,
        artifacts: artifacts.written,
        output_errors: artifacts.errors,
        duration,
    })
}

fn load_options(config: &PipelineConfig) -> LoadOptions {
    LoadOptions {
        timeout: Duration::from_secs(config.fetch_timeout_secs),
        null_values: config.null_values.clone(),
    }
}
