use super::*;
use crate::analyser::logic::*;
use crate::error::RctError;
use anyhow::Result;

#[test]
fn test_missing_column_is_schema_error() {
    let df = six_row_trial();
    let spec = VariableSpec::new("w", "y", ["age", "polviews"]);
    let err = select_variables(&df, &spec).unwrap_err();
    assert!(matches!(err, RctError::Schema(_)));
    assert!(err.to_string().contains("polviews"));
}

#[test]
fn test_frame_restricted_to_spec_columns() -> Result<()> {
    let mut df = six_row_trial();
    df.with_column(Series::new("unused".into(), &[0i64, 0, 0, 0, 0, 0]))?;
    let data = select_variables(&df, &VariableSpec::new("w", "y", ["age"]))?;
    let names: Vec<String> = data
        .frame
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(names, vec!["w", "y", "age"]);
    assert_eq!(data.n_rows(), 6);
    Ok(())
}

#[test]
fn test_missing_counts_in_spec_order() -> Result<()> {
    let data = select_variables(&ten_row_trial(), &ten_row_spec())?;
    let counts: Vec<(&str, usize)> = data
        .missing
        .iter()
        .map(|m| (m.column.as_str(), m.missing))
        .collect();
    assert_eq!(
        counts,
        vec![("w", 0), ("y", 0), ("age", 2), ("income", 1), ("sex", 0)]
    );
    assert!(data.missing.iter().all(|m| m.total == 10));
    assert!((data.missing[2].missing_pct() - 20.0).abs() < 1e-12);
    Ok(())
}

#[test]
fn test_non_binary_treatment_rejected() -> Result<()> {
    let df = df!(
        "w" => &[0i64, 1, 2],
        "y" => &[0i64, 1, 1]
    )?;
    let err = select_variables(&df, &VariableSpec::new("w", "y", Vec::<String>::new())).unwrap_err();
    assert!(matches!(err, RctError::Schema(_)));
    assert!(err.to_string().contains("'w'"));
    Ok(())
}

#[test]
fn test_text_outcome_rejected() -> Result<()> {
    let df = df!(
        "w" => &[0i64, 1, 1],
        "y" => &["yes", "no", "yes"]
    )?;
    let err = select_variables(&df, &VariableSpec::new("w", "y", Vec::<String>::new())).unwrap_err();
    assert!(matches!(err, RctError::Schema(_)));
    Ok(())
}

#[test]
fn test_covariate_classification() -> Result<()> {
    let data = select_variables(&ten_row_trial(), &ten_row_spec())?;
    let kinds: Vec<CovariateKind> = data.covariates.iter().map(|c| c.values.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            CovariateKind::Numeric,
            CovariateKind::Numeric,
            CovariateKind::Categorical
        ]
    );

    let spec = ten_row_spec().with_categorical(["income"]);
    let data = select_variables(&ten_row_trial(), &spec)?;
    assert_eq!(data.covariates[1].values.kind(), CovariateKind::Categorical);
    Ok(())
}

#[test]
fn test_missing_binary_values_kept_as_none() -> Result<()> {
    let df = df!(
        "w" => &[Some(1i64), None, Some(0), Some(1)],
        "y" => &[Some(1i64), Some(0), None, Some(0)]
    )?;
    let data = select_variables(&df, &VariableSpec::new("w", "y", Vec::<String>::new()))?;
    assert_eq!(data.treatment, vec![Some(1.0), None, Some(0.0), Some(1.0)]);
    assert_eq!(data.outcome, vec![Some(1.0), Some(0.0), None, Some(0.0)]);
    Ok(())
}
