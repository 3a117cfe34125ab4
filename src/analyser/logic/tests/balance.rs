use super::*;
use crate::analyser::logic::*;
use anyhow::Result;

#[test]
fn test_one_row_per_covariate_in_order() -> Result<()> {
    let data = select_variables(&ten_row_trial(), &ten_row_spec())?;
    let rows = check_balance(&data);
    let names: Vec<&str> = rows.iter().map(|r| r.covariate.as_str()).collect();
    assert_eq!(names, vec!["age", "income", "sex"]);

    let spec = VariableSpec::new("w", "y", ["sex", "age"]);
    let data = select_variables(&ten_row_trial(), &spec)?;
    let rows = check_balance(&data);
    let names: Vec<&str> = rows.iter().map(|r| r.covariate.as_str()).collect();
    assert_eq!(names, vec!["sex", "age"]);
    Ok(())
}

#[test]
fn test_fieldwise_missing_exclusion() -> Result<()> {
    let data = select_variables(&ten_row_trial(), &ten_row_spec())?;
    let rows = check_balance(&data);

    // age: 2 of 10 missing, both in treated rows
    let (control, treated) = rows[0].arm_counts();
    assert_eq!(rows[0].n_missing, 2);
    assert_eq!(control + treated, 8);
    assert_eq!((control, treated), (5, 3));

    // income keeps its own count: one missing, in a control row
    let (control, treated) = rows[1].arm_counts();
    assert_eq!(rows[1].n_missing, 1);
    assert_eq!((control, treated), (4, 5));

    // sex has no gaps
    assert_eq!(rows[2].n_missing, 0);
    assert_eq!(rows[2].arm_counts(), (5, 5));
    Ok(())
}

#[test]
fn test_numeric_summary_values() -> Result<()> {
    let data = select_variables(&six_row_trial(), &VariableSpec::new("w", "y", ["age"]))?;
    let rows = check_balance(&data);
    let BalanceStats::Numeric {
        control,
        treated,
        smd,
    } = &rows[0].stats
    else {
        panic!("Expected numeric balance stats");
    };

    assert_eq!(treated.n, 3);
    assert!((treated.mean.expect("mean") - 41.0).abs() < 1e-12);
    assert!((treated.sd.expect("sd") - 11.0).abs() < 1e-12);
    assert!((control.mean.expect("mean") - 46.333_333_333).abs() < 1e-6);
    assert!(smd.expect("smd defined") < 0.0);
    assert_eq!(rows[0].test, BalanceTest::WelchT);

    let p = rows[0].p_value.expect("p defined");
    assert!(p > 0.0 && p <= 1.0);
    Ok(())
}

#[test]
fn test_categorical_levels_and_percentages() -> Result<()> {
    let data = select_variables(&ten_row_trial(), &ten_row_spec())?;
    let rows = check_balance(&data);
    let BalanceStats::Categorical {
        control_n,
        treated_n,
        levels,
    } = &rows[2].stats
    else {
        panic!("Expected categorical balance stats");
    };

    assert_eq!((*control_n, *treated_n), (5, 5));
    let names: Vec<&str> = levels.iter().map(|l| l.level.as_str()).collect();
    assert_eq!(names, vec!["f", "m"]);

    // treated sex: f, m, f, f, m -> 3 f; control: m, f, m, m, f -> 2 f
    assert_eq!(levels[0].treated_count, 3);
    assert_eq!(levels[0].control_count, 2);
    assert!((levels[0].treated_pct - 60.0).abs() < 1e-12);
    assert!((levels[0].control_pct - 40.0).abs() < 1e-12);

    let total_pct: f64 = levels.iter().map(|l| l.treated_pct).sum();
    assert!((total_pct - 100.0).abs() < 1e-9);
    assert_eq!(rows[2].test, BalanceTest::ChiSquare);
    assert!(rows[2].p_value.is_some());
    Ok(())
}

#[test]
fn test_missing_treatment_rows_excluded() -> Result<()> {
    let df = df!(
        "w" => &[Some(1i64), Some(1), None, Some(0), Some(0)],
        "y" => &[1i64, 0, 1, 0, 1],
        "age" => &[20.0, 30.0, 99.0, 40.0, 50.0]
    )?;
    let data = select_variables(&df, &VariableSpec::new("w", "y", ["age"]))?;
    let rows = check_balance(&data);
    assert_eq!(rows[0].arm_counts(), (2, 2));
    assert_eq!(rows[0].n_missing, 0);
    Ok(())
}

#[test]
fn test_single_level_has_no_p_value() -> Result<()> {
    let df = df!(
        "w" => &[1i64, 1, 0, 0],
        "y" => &[1i64, 0, 0, 1],
        "sex" => &["f", "f", "f", "f"]
    )?;
    let data = select_variables(&df, &VariableSpec::new("w", "y", ["sex"]))?;
    let rows = check_balance(&data);
    assert_eq!(rows[0].p_value, None);
    Ok(())
}
