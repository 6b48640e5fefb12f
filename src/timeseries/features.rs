//! Lag feature and forecast target construction
//!
//! Both builders shift whole columns in row order. Cells that fall off the
//! edge of the series are null, so "no observation" stays distinguishable
//! from a genuine zero reading.

use crate::error::Result;
use crate::utils::columns::float_series;
use polars::prelude::*;
use tracing::{debug, warn};

/// Name of the lag column for `variable` shifted back by `lag` steps
pub fn lag_column_name(variable: &str, lag: usize) -> String {
    format!("{}_lag{}", variable, lag)
}

/// Name of the target column for `variable` shifted forward by `step` steps
pub fn target_column_name(variable: &str, step: usize) -> String {
    format!("{}_t+{}", variable, step)
}

/// Table with lag features appended
#[derive(Debug, Clone)]
pub struct LaggedFrame {
    /// Original columns followed by the derived lag columns
    pub frame: DataFrame,
    /// Derived lag column names, grouped by variable then lag
    pub lag_columns: Vec<String>,
    /// Requested variables that were not present in the table
    pub skipped: Vec<String>,
}

/// Lagged table with forward-shifted target columns appended
#[derive(Debug, Clone)]
pub struct SupervisedFrame {
    pub frame: DataFrame,
    /// Derived target column names, grouped by variable then horizon
    pub target_columns: Vec<String>,
    /// Requested targets that were not present in the table
    pub skipped: Vec<String>,
}

/// Append `{var}_lag{l}` for every variable present and every l in 1..=lag_hours.
pub fn build_lags<S: AsRef<str>>(
    df: &DataFrame,
    variables: &[S],
    lag_hours: usize,
) -> Result<LaggedFrame> {
    let (frame, lag_columns, skipped) = append_shifted(
        df,
        variables,
        lag_hours,
        "feature",
        |var, lag| (lag_column_name(var, lag), lag as i64),
    )?;
    debug!(lags = lag_columns.len(), skipped = skipped.len(), "Built lag features");

    Ok(LaggedFrame { frame, lag_columns, skipped })
}

/// Append `{target}_t+{s}` for every target present and every s in 1..=forecast_hours.
pub fn build_targets<S: AsRef<str>>(
    df: &DataFrame,
    targets: &[S],
    forecast_hours: usize,
) -> Result<SupervisedFrame> {
    let (frame, target_columns, skipped) = append_shifted(
        df,
        targets,
        forecast_hours,
        "target",
        |var, step| (target_column_name(var, step), -(step as i64)),
    )?;
    debug!(targets = target_columns.len(), skipped = skipped.len(), "Built forecast targets");

    Ok(SupervisedFrame { frame, target_columns, skipped })
}

fn append_shifted<S: AsRef<str>>(
    df: &DataFrame,
    variables: &[S],
    steps: usize,
    kind: &str,
    derive: impl Fn(&str, usize) -> (String, i64),
) -> Result<(DataFrame, Vec<String>, Vec<String>)> {
    let mut derived: Vec<Series> = Vec::with_capacity(variables.len() * steps);
    let mut names = Vec::with_capacity(variables.len() * steps);
    let mut skipped = Vec::new();

    for var in variables {
        let var = var.as_ref();
        if df.column(var).is_err() {
            warn!(variable = %var, "Skipping missing {}", kind);
            skipped.push(var.to_string());
            continue;
        }

        let source = float_series(df, var)?;
        for step in 1..=steps {
            let (name, periods) = derive(var, step);
            derived.push(source.shift(periods).with_name(name.as_str().into()));
            names.push(name);
        }
    }

    let frame = if derived.is_empty() {
        df.clone()
    } else {
        df.hstack(&derived)?
    };

    Ok((frame, names, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::columns::numeric_column;

    fn series_df(n: usize) -> DataFrame {
        let x: Vec<f64> = (0..n).map(|i| i as f64 * 1.5).collect();
        let y: Vec<f64> = (0..n).map(|i| 100.0 - i as f64).collect();
        df!("x" => &x, "y" => &y).unwrap()
    }

    #[test]
    fn test_lag_values_match_earlier_rows() {
        let df = series_df(10);
        let lagged = build_lags(&df, &["x", "y"], 3).unwrap();

        assert_eq!(lagged.frame.height(), 10);
        assert_eq!(lagged.frame.width(), 2 + 6);
        assert_eq!(lagged.lag_columns[0], "x_lag1");
        assert_eq!(lagged.lag_columns[5], "y_lag3");

        let x = numeric_column(&df, "x").unwrap();
        for lag in 1..=3 {
            let col = numeric_column(&lagged.frame, &lag_column_name("x", lag)).unwrap();
            for i in 0..10 {
                if i >= lag {
                    assert_eq!(col[i], x[i - lag], "lag {} row {}", lag, i);
                } else {
                    assert_eq!(col[i], None, "lag {} row {} should be undefined", lag, i);
                }
            }
        }
    }

    #[test]
    fn test_lag_of_zero_reading_is_not_undefined() {
        let df = df!("x" => &[0.0, 0.0, 0.0]).unwrap();
        let lagged = build_lags(&df, &["x"], 1).unwrap();
        let col = numeric_column(&lagged.frame, "x_lag1").unwrap();
        assert_eq!(col, vec![None, Some(0.0), Some(0.0)]);
    }

    #[test]
    fn test_missing_variable_is_skipped() {
        let df = series_df(5);
        let lagged = build_lags(&df, &["x", "missing"], 2).unwrap();

        assert_eq!(lagged.skipped, vec!["missing".to_string()]);
        assert_eq!(lagged.lag_columns, vec!["x_lag1".to_string(), "x_lag2".to_string()]);
    }

    #[test]
    fn test_zero_lags_leaves_table_unchanged() {
        let df = series_df(4);
        let lagged = build_lags(&df, &["x"], 0).unwrap();
        assert!(lagged.lag_columns.is_empty());
        assert_eq!(lagged.frame.width(), 2);
    }

    #[test]
    fn test_target_values_match_later_rows() {
        let n = 8;
        let df = series_df(n);
        let supervised = build_targets(&df, &["y"], 3).unwrap();

        assert_eq!(supervised.frame.height(), n);
        assert_eq!(
            supervised.target_columns,
            vec!["y_t+1".to_string(), "y_t+2".to_string(), "y_t+3".to_string()]
        );

        let y = numeric_column(&df, "y").unwrap();
        for step in 1..=3 {
            let col = numeric_column(&supervised.frame, &target_column_name("y", step)).unwrap();
            for i in 0..n {
                if i + step <= n - 1 {
                    assert_eq!(col[i], y[i + step]);
                } else {
                    assert_eq!(col[i], None);
                }
            }
        }
    }

    #[test]
    fn test_missing_target_is_skipped() {
        let df = series_df(5);
        let supervised = build_targets(&df, &["nope", "x"], 1).unwrap();
        assert_eq!(supervised.skipped, vec!["nope".to_string()]);
        assert_eq!(supervised.target_columns, vec!["x_t+1".to_string()]);
    }

    #[test]
    fn test_text_column_is_cast_before_shifting() {
        let df = df!("x" => &["1.5", "oops", "3.0"]).unwrap();
        let lagged = build_lags(&df, &["x"], 1).unwrap();
        let col = numeric_column(&lagged.frame, "x_lag1").unwrap();
        assert_eq!(col, vec![None, Some(1.5), None]);
    }
}
