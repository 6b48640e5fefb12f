//! Raw export cleaning: numeric coercion, gap filling and time-order checks

use crate::error::{ForecastError, Result};
use crate::utils::columns::{numeric_column, TIME_COLUMN};
use crate::utils::data_loader::{DataLoader, DataSaver};
use chrono::NaiveDateTime;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Timestamp layouts accepted in the `time` column
const TIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Per-column summary used in cleaning logs and `info` output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub name: String,
    pub count: usize,
    pub null_count: usize,
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl ColumnSummary {
    fn from_values(name: &str, values: &[Option<f64>]) -> Self {
        let defined: Vec<f64> = values.iter().flatten().copied().collect();
        let (mean, min, max) = if defined.is_empty() {
            (None, None, None)
        } else {
            (
                Some(defined.iter().sum::<f64>() / defined.len() as f64),
                defined.iter().copied().reduce(f64::min),
                defined.iter().copied().reduce(f64::max),
            )
        };
        Self {
            name: name.to_string(),
            count: values.len(),
            null_count: values.len() - defined.len(),
            mean,
            min,
            max,
        }
    }
}

/// Result of checking the `time` column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeOrderReport {
    pub parsed: usize,
    pub unparseable: usize,
}

/// Turns a raw hourly export into a gap-free numeric table
#[derive(Debug, Clone)]
pub struct DataCleaner {
    skip_rows: usize,
}

impl Default for DataCleaner {
    fn default() -> Self {
        // Open-Meteo exports start with a location block and a blank line
        Self { skip_rows: 3 }
    }
}

impl DataCleaner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_skip_rows(mut self, n: usize) -> Self {
        self.skip_rows = n;
        self
    }

    /// Read a raw CSV export, skipping its metadata preamble
    pub fn load_raw(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let df = DataLoader::new()
            .with_skip_rows(self.skip_rows)
            .load_csv(path.as_ref())?;
        info!(path = %path.as_ref().display(), rows = df.height(), cols = df.width(), "Loaded raw export");
        Ok(df)
    }

    /// Cast every non-time column to Float64, then forward-fill and back-fill gaps.
    ///
    /// Unparseable cells and NaN count as gaps. A column with no defined value
    /// stays undefined.
    pub fn clean(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut columns: Vec<Series> = Vec::with_capacity(df.width());
        let mut filled_total = 0usize;

        for name in df.get_column_names() {
            let name = name.as_str();
            if name == TIME_COLUMN {
                columns.push(df.column(name)?.clone());
                continue;
            }

            let values = numeric_column(df, name)?;
            let gaps = values.iter().filter(|v| v.is_none()).count();
            let series = Series::new(name.into(), values)
                .fill_null(FillNullStrategy::Forward(None))?
                .fill_null(FillNullStrategy::Backward(None))?;

            let remaining = series.null_count();
            if remaining > 0 {
                warn!(column = %name, "Column has no defined values; left undefined");
            }
            filled_total += gaps - remaining;
            columns.push(series);
        }

        let cleaned = DataFrame::new(columns)?;
        info!(rows = cleaned.height(), filled = filled_total, "Cleaned table");
        Ok(cleaned)
    }

    /// Check that parseable timestamps strictly increase.
    ///
    /// Tables without a `time` column pass. Unparseable timestamps are
    /// counted and logged but do not fail the check.
    pub fn validate_time_order(&self, df: &DataFrame) -> Result<TimeOrderReport> {
        let mut report = TimeOrderReport::default();
        let Ok(column) = df.column(TIME_COLUMN) else {
            return Ok(report);
        };

        let strings = column.cast(&DataType::String)?;
        let mut previous: Option<(usize, NaiveDateTime)> = None;
        for (row, raw) in strings.str()?.into_iter().enumerate() {
            let Some(ts) = raw.and_then(parse_timestamp) else {
                report.unparseable += 1;
                continue;
            };
            report.parsed += 1;

            if let Some((prev_row, prev)) = previous {
                if ts <= prev {
                    return Err(ForecastError::ValidationError(format!(
                        "time at row {} ({}) does not follow row {} ({})",
                        row, ts, prev_row, prev
                    )));
                }
            }
            previous = Some((row, ts));
        }

        if report.unparseable > 0 {
            warn!(count = report.unparseable, "Unparseable timestamps in time column");
        }
        Ok(report)
    }

    /// Write the cleaned table as CSV
    pub fn save(&self, df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
        DataSaver::save_csv(df, path.as_ref())?;
        info!(path = %path.as_ref().display(), rows = df.height(), "Saved cleaned table");
        Ok(())
    }
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Summaries for every non-time column, in table order
pub fn summarize(df: &DataFrame) -> Result<Vec<ColumnSummary>> {
    df.get_column_names()
        .into_iter()
        .filter(|name| name.as_str() != TIME_COLUMN)
        .map(|name| {
            let values = numeric_column(df, name.as_str())?;
            Ok(ColumnSummary::from_values(name.as_str(), &values))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_then_backward_fill() {
        let df = df!(
            "time" => &["2024-01-01T00:00", "2024-01-01T01:00", "2024-01-01T02:00", "2024-01-01T03:00"],
            "t" => &[None, Some(1.0), None, Some(3.0)],
            "p" => &[Some(5.0), None, None, None]
        )
        .unwrap();

        let cleaned = DataCleaner::new().clean(&df).unwrap();
        assert_eq!(numeric_column(&cleaned, "t").unwrap(), vec![Some(1.0), Some(1.0), Some(1.0), Some(3.0)]);
        assert_eq!(numeric_column(&cleaned, "p").unwrap(), vec![Some(5.0); 4]);
        assert_eq!(cleaned.column("time").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_unparseable_text_becomes_gap() {
        let df = df!("v" => &["1.5", "n/a", "2.5"]).unwrap();
        let cleaned = DataCleaner::new().clean(&df).unwrap();
        assert_eq!(numeric_column(&cleaned, "v").unwrap(), vec![Some(1.5), Some(1.5), Some(2.5)]);
    }

    #[test]
    fn test_time_order() {
        let cleaner = DataCleaner::new();
        let ordered = df!("time" => &["2024-01-01T00:00", "bad", "2024-01-01 02:00:00"]).unwrap();
        let report = cleaner.validate_time_order(&ordered).unwrap();
        assert_eq!(report, TimeOrderReport { parsed: 2, unparseable: 1 });

        let repeated = df!("time" => &["2024-01-01T00:00", "2024-01-01T00:00"]).unwrap();
        assert!(matches!(
            cleaner.validate_time_order(&repeated),
            Err(ForecastError::ValidationError(_))
        ));

        let no_time = df!("v" => &[1.0]).unwrap();
        assert_eq!(cleaner.validate_time_order(&no_time).unwrap(), TimeOrderReport::default());
    }

    #[test]
    fn test_summarize() {
        let df = df!("time" => &["a", "b", "c"], "v" => &[Some(1.0), None, Some(3.0)]).unwrap();
        let summary = summarize(&df).unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].null_count, 1);
        assert_eq!(summary[0].mean, Some(2.0));
        assert_eq!(summary[0].max, Some(3.0));
    }

    #[test]
    fn test_load_raw_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("raw.csv");
        std::fs::write(
            &raw,
            "latitude,longitude,elevation\n13.1,80.2,15.0\n\ntime,v\n2024-01-01T00:00,1\n2024-01-01T01:00,\n",
        )
        .unwrap();

        let cleaner = DataCleaner::new();
        let df = cleaner.load_raw(&raw).unwrap();
        let mut cleaned = cleaner.clean(&df).unwrap();
        let out = dir.path().join("processed").join("clean.csv");
        cleaner.save(&mut cleaned, &out).unwrap();

        let reloaded = DataLoader::new().load_csv(&out).unwrap();
        assert_eq!(numeric_column(&reloaded, "v").unwrap(), vec![Some(1.0), Some(1.0)]);
    }
}
