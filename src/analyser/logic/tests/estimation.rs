use super::*;
use crate::analyser::logic::*;
use crate::error::RctError;
use anyhow::Result;

fn unbalanced_trial() -> DataFrame {
    df!(
        "w" => &[1i64, 1, 1, 1, 0, 0, 0, 0, 0],
        "y" => &[1i64, 1, 1, 0, 0, 0, 1, 0, 0]
    )
    .expect("valid frame")
}

/// Twenty units with a numeric and a categorical covariate, none missing.
fn twenty_row_trial() -> DataFrame {
    let w: Vec<i64> = (0..20i64).map(|i| i % 2).collect();
    let y: Vec<i64> = (0..20i64)
        .map(|i| i64::from((i * 7) % 5 < 2 + (i % 2)))
        .collect();
    let age: Vec<f64> = (0..20i32).map(|i| 20.0 + f64::from((i * 13) % 29)).collect();
    let region: Vec<&str> = (0..20usize)
        .map(|i| ["north", "south", "east"][(i * 5 % 7) % 3])
        .collect();
    df!(
        "w" => w,
        "y" => y,
        "age" => age,
        "region" => region
    )
    .expect("valid frame")
}

#[test]
fn test_difference_in_means_matches_group_means() -> Result<()> {
    let data = select_variables(&six_row_trial(), &VariableSpec::new("w", "y", ["age"]))?;
    let dim = difference_in_means(&data)?;
    assert!((dim.estimate - 1.0 / 3.0).abs() < 1e-12);
    assert_eq!(dim.n_obs, 6);
    assert_eq!(dim.std_error, None);
    Ok(())
}

#[test]
fn test_ols_coefficient_equals_difference_in_means() -> Result<()> {
    let data = select_variables(&six_row_trial(), &VariableSpec::new("w", "y", ["age"]))?;
    let report = estimate_effects(&data)?;

    let dim = report.difference_in_means.estimate;
    assert!((report.unadjusted_classical.estimate - dim).abs() < 1e-9);
    // Same fit, different variance estimator.
    assert_eq!(
        report.unadjusted_classical.estimate.to_bits(),
        report
            .unadjusted_robust
            .as_ref()
            .expect("robust estimate")
            .estimate
            .to_bits()
    );

    for est in report.regression_estimates() {
        let se = est.std_error.expect("standard error");
        assert!(se.is_finite() && se > 0.0, "{}: se = {se}", est.label());
        let (lo, hi) = est.conf_int().expect("interval");
        assert!(lo < est.estimate && est.estimate < hi);
    }
    Ok(())
}

#[test]
fn test_standard_errors_closed_form() -> Result<()> {
    let data = select_variables(&unbalanced_trial(), &VariableSpec::new("w", "y", Vec::<String>::new()))?;
    let report = estimate_effects(&data)?;

    // treated: 3 of 4 (s^2 = 0.25); control: 1 of 5 (s^2 = 0.2)
    assert!((report.difference_in_means.estimate - 0.55).abs() < 1e-12);

    let hc2 = (0.25_f64 / 4.0 + 0.2 / 5.0).sqrt();
    let robust_est = report.unadjusted_robust.as_ref().expect("robust estimate");
    let robust = robust_est.std_error.expect("robust se");
    assert!((robust - hc2).abs() < 1e-10, "HC2 se {robust} vs {hc2}");

    let sigma2: f64 = (0.75 + 0.8) / 7.0;
    let classical_expected = (sigma2 * (1.0 / 4.0 + 1.0 / 5.0)).sqrt();
    let classical = report.unadjusted_classical.std_error.expect("classical se");
    assert!((classical - classical_expected).abs() < 1e-10);

    assert_eq!(report.unadjusted_classical.dof, Some(7));
    let (lo, hi) = robust_est.conf_int().expect("interval");
    assert!((lo - (0.55 - Z_95 * hc2)).abs() < 1e-10);
    assert!((hi - (0.55 + Z_95 * hc2)).abs() < 1e-10);
    Ok(())
}

#[test]
fn test_no_treated_units_is_estimation_error() -> Result<()> {
    let df = df!(
        "w" => &[0i64, 0, 0, 0],
        "y" => &[1i64, 0, 1, 0]
    )?;
    let data = select_variables(&df, &VariableSpec::new("w", "y", Vec::<String>::new()))?;
    let err = estimate_effects(&data).unwrap_err();
    assert!(matches!(err, RctError::Estimation(_)));
    assert!(err.to_string().contains("no treated units"));
    Ok(())
}

#[test]
fn test_no_control_units_is_estimation_error() -> Result<()> {
    let df = df!(
        "w" => &[1i64, 1, 1],
        "y" => &[1i64, 0, 1]
    )?;
    let data = select_variables(&df, &VariableSpec::new("w", "y", Vec::<String>::new()))?;
    assert!(matches!(
        difference_in_means(&data),
        Err(RctError::Estimation(_))
    ));
    assert!(matches!(fit_unadjusted(&data), Err(RctError::Estimation(_))));
    Ok(())
}

#[test]
fn test_listwise_design_and_dummy_coding() -> Result<()> {
    let data = select_variables(&ten_row_trial(), &ten_row_spec())?;
    let (x, y, names) = adjusted_design(&data)?;

    // Rows 2 and 6 lack age, row 5 lacks income.
    assert_eq!(x.nrows(), 7);
    assert_eq!(y.len(), 7);
    assert_eq!(names, vec!["(Intercept)", "w", "age", "income", "sex=m"]);
    assert!(x.column(0).iter().all(|&v| v == 1.0));
    assert_eq!(x[(0, 4)], 0.0);
    assert_eq!(x[(1, 4)], 1.0);
    Ok(())
}

#[test]
fn test_leverages_sum_to_parameter_count() -> Result<()> {
    let spec = VariableSpec::new("w", "y", ["age", "region"]);
    let data = select_variables(&twenty_row_trial(), &spec)?;
    let fit = fit_adjusted(&data)?;

    assert_eq!(fit.n_params(), 5);
    assert_eq!(fit.dof(), 15);
    let total: f64 = fit.leverages().iter().sum();
    assert!((total - 5.0).abs() < 1e-9);
    assert!(fit.leverages().iter().all(|&h| h > 0.0 && h < 1.0));
    Ok(())
}

#[test]
fn test_adjusted_estimate_reported() -> Result<()> {
    let spec = VariableSpec::new("w", "y", ["age", "region"]);
    let data = select_variables(&twenty_row_trial(), &spec)?;
    let report = estimate_effects(&data)?;

    let adjusted = report.adjusted_robust.as_ref().expect("adjusted estimate");
    assert_eq!(adjusted.model, EstimateKind::OlsAdjustedRobust);
    assert_eq!(adjusted.n_obs, 20);
    assert!(adjusted.std_error.is_some_and(|se| se > 0.0));
    assert!(report.failures.is_empty());
    assert_eq!(report.regression_estimates().len(), 3);
    assert_eq!(report.all_estimates().len(), 4);
    Ok(())
}

#[test]
fn test_collinear_covariate_recorded_as_failure() -> Result<()> {
    let mut df = six_row_trial();
    df.with_column(Series::new("site".into(), &[1.0, 1.0, 1.0, 1.0, 1.0, 1.0]))?;
    let data = select_variables(&df, &VariableSpec::new("w", "y", ["site"]))?;
    let report = estimate_effects(&data)?;

    assert!(report.adjusted_robust.is_none());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].model, EstimateKind::OlsAdjustedRobust);
    assert!(report.failures[0].message.contains("rank deficient"));
    assert!(
        report
            .unadjusted_robust
            .as_ref()
            .is_some_and(|e| e.std_error.is_some())
    );
    Ok(())
}

#[test]
fn test_too_few_observations() {
    let x = nalgebra::DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 1.0, 1.0]);
    let y = nalgebra::DVector::from_vec(vec![0.0, 1.0]);
    let result = OlsFit::fit(x, y, vec!["(Intercept)".into(), "w".into()]);
    assert!(matches!(result, Err(RctError::Estimation(_))));
}

#[test]
fn test_missing_outcome_dropped_consistently() -> Result<()> {
    let df = df!(
        "w" => &[Some(1i64), Some(1), Some(1), Some(0), Some(0), Some(0), Some(1)],
        "y" => &[Some(1i64), Some(0), Some(1), Some(0), Some(1), Some(0), None]
    )?;
    let data = select_variables(&df, &VariableSpec::new("w", "y", Vec::<String>::new()))?;
    let report = estimate_effects(&data)?;
    assert_eq!(report.difference_in_means.n_obs, 6);
    assert_eq!(report.unadjusted_classical.n_obs, 6);
    assert!(
        (report.difference_in_means.estimate - report.unadjusted_classical.estimate).abs() < 1e-9
    );
    Ok(())
}

#[test]
fn test_single_treated_unit_keeps_other_estimates() -> Result<()> {
    let df = df!(
        "w" => &[1i64, 0, 0, 0, 0, 0],
        "y" => &[1i64, 0, 1, 0, 0, 1]
    )?;
    let data = select_variables(&df, &VariableSpec::new("w", "y", Vec::<String>::new()))?;
    let report = estimate_effects(&data)?;

    // The lone treated unit has leverage 1, so only the HC2 estimates drop out.
    assert!((report.difference_in_means.estimate - 0.6).abs() < 1e-12);
    assert!((report.unadjusted_classical.estimate - 0.6).abs() < 1e-9);
    let se = report.unadjusted_classical.std_error.expect("classical se");
    assert!((se - 0.6).abs() < 1e-9);

    assert!(report.unadjusted_robust.is_none());
    assert!(report.adjusted_robust.is_none());
    let failed: Vec<EstimateKind> = report.failures.iter().map(|f| f.model).collect();
    assert_eq!(
        failed,
        vec![EstimateKind::OlsRobust, EstimateKind::OlsAdjustedRobust]
    );
    assert!(report.failures[0].message.contains("leverage 1"));
    assert_eq!(report.regression_estimates().len(), 1);
    Ok(())
}
