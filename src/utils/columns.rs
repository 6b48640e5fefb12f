//! Column extraction helpers shared by the feature builders, trainer and forecaster

use crate::error::{ForecastError, Result};
use ndarray::Array2;
use polars::prelude::*;

/// Name of the timestamp column carried through from the raw export
pub const TIME_COLUMN: &str = "time";

/// Fetch a column cast to Float64. Values that cannot be parsed become null.
pub fn float_series(df: &DataFrame, name: &str) -> Result<Series> {
    let series = df
        .column(name)
        .map_err(|_| ForecastError::FeatureNotFound(name.to_string()))?;
    series
        .cast(&DataType::Float64)
        .map_err(|e| ForecastError::DataError(e.to_string()))
}

/// Extract a column as optional floats. Null and NaN are both undefined.
pub fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = float_series(df, name)?;
    let values = series
        .f64()
        .map_err(|e| ForecastError::DataError(e.to_string()))?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect();
    Ok(values)
}

/// Every column except the timestamp, in table order
pub fn numeric_column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .filter(|name| name.as_str() != TIME_COLUMN)
        .map(|name| name.to_string())
        .collect()
}

/// Extract named columns into a row-major matrix.
///
/// Rows must already be free of undefined values; an undefined cell is an
/// error rather than being silently replaced.
pub fn columns_to_array2(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = col_names.len();

    let col_data: Vec<Vec<f64>> = col_names
        .iter()
        .map(|col_name| {
            numeric_column(df, col_name)?
                .into_iter()
                .enumerate()
                .map(|(row, v)| {
                    v.ok_or_else(|| {
                        ForecastError::DataError(format!(
                            "undefined value in column '{}' at row {}",
                            col_name, row
                        ))
                    })
                })
                .collect::<Result<Vec<f64>>>()
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| col_refs[c][r]))
}
