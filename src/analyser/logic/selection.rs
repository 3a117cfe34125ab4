//! Restricting the loaded table to the columns named in a [`VariableSpec`].

use super::types::{Covariate, CovariateValues, MissingCount, SelectedData};
use crate::config::VariableSpec;
use crate::error::{RctError, Result, ResultExt as _};
use polars::prelude::*;
use std::collections::HashSet;

/// Selects the treatment, outcome and covariate columns and materialises them.
///
/// Fails with [`RctError::Schema`] if a named column is absent, if treatment
/// or outcome hold anything other than 0/1, or if either is not numeric.
pub fn select_variables(df: &DataFrame, spec: &VariableSpec) -> Result<SelectedData> {
    spec.validate()?;

    let present: HashSet<&str> = df.get_column_names().iter().map(|s| s.as_str()).collect();
    let absent: Vec<&str> = spec
        .columns()
        .into_iter()
        .filter(|c| !present.contains(c))
        .collect();
    if !absent.is_empty() {
        return Err(RctError::Schema(format!(
            "Column(s) not found in dataset: {}",
            absent.join(", ")
        )));
    }

    let mut frame = df.select(spec.columns()).context("Failed to select columns")?;
    let missing = missing_counts(&frame, spec)?;

    let treatment = binary_values(&frame, &spec.treatment)?;
    let outcome = binary_values(&frame, &spec.outcome)?;

    let mut covariates = Vec::with_capacity(spec.covariates.len());
    for name in &spec.covariates {
        let series = frame.column(name)?.as_materialized_series();
        let dtype = series.dtype();
        let numeric = dtype.is_primitive_numeric() || dtype.is_bool();
        let values = if numeric && !spec.is_forced_categorical(name) {
            CovariateValues::Numeric(float_values(series)?)
        } else {
            CovariateValues::Categorical(text_values(series)?)
        };
        tracing::debug!(covariate = %name, kind = ?values.kind(), "Classified covariate");
        covariates.push(Covariate {
            name: name.clone(),
            values,
        });
    }

    // Downstream grouping works on the normalised 0/1 floats.
    frame.with_column(Series::new(spec.treatment.as_str().into(), &treatment))?;
    frame.with_column(Series::new(spec.outcome.as_str().into(), &outcome))?;

    for m in missing.iter().filter(|m| m.missing > 0) {
        tracing::info!(
            column = %m.column,
            missing = m.missing,
            total = m.total,
            "Column has missing values"
        );
    }

    Ok(SelectedData {
        frame,
        spec: spec.clone(),
        treatment,
        outcome,
        covariates,
        missing,
    })
}

/// Missing-value count per analysed column, treatment and outcome first.
pub fn missing_counts(frame: &DataFrame, spec: &VariableSpec) -> Result<Vec<MissingCount>> {
    let total = frame.height();
    spec.columns()
        .into_iter()
        .map(|name| {
            let col = frame
                .column(name)
                .map_err(|_| RctError::Schema(format!("Column not found in dataset: {name}")))?;
            Ok(MissingCount {
                column: name.to_owned(),
                missing: col.null_count(),
                total,
            })
        })
        .collect()
}

fn binary_values(frame: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = frame.column(name)?.as_materialized_series();
    let dtype = series.dtype();
    if !(dtype.is_primitive_numeric() || dtype.is_bool()) {
        return Err(RctError::Schema(format!(
            "Column '{name}' must be a 0/1 indicator, found type {dtype}"
        )));
    }

    let values = float_values(series)?;
    if let Some(bad) = values.iter().flatten().find(|&&v| v != 0.0 && v != 1.0) {
        return Err(RctError::Schema(format!(
            "Column '{name}' must contain only 0/1 values, found {bad}"
        )));
    }
    Ok(values)
}

fn float_values(series: &Series) -> Result<Vec<Option<f64>>> {
    let casted = series.cast(&DataType::Float64)?;
    // NaN counts as missing alongside null
    Ok(casted
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

fn text_values(series: &Series) -> Result<Vec<Option<String>>> {
    let casted = series.cast(&DataType::String)?;
    Ok(casted
        .str()?
        .into_iter()
        .map(|v| v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned))
        .collect())
}
