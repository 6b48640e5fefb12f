//! Undefined-row filtering and ordered train/test splitting

use crate::error::{ForecastError, Result};
use crate::utils::columns::numeric_column;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Keep only rows where every listed column holds a defined value.
///
/// Row order is preserved. Applying it twice with the same columns is a no-op.
pub fn drop_undefined(df: &DataFrame, columns: &[String]) -> Result<DataFrame> {
    let mut keep = vec![true; df.height()];
    for name in columns {
        for (row, value) in numeric_column(df, name)?.into_iter().enumerate() {
            if value.is_none() {
                keep[row] = false;
            }
        }
    }

    if keep.iter().all(|&k| k) {
        return Ok(df.clone());
    }

    let mask = BooleanChunked::from_slice("defined".into(), &keep);
    df.filter(&mask).map_err(|e| ForecastError::DataError(e.to_string()))
}

/// Leading training block and trailing test block over row positions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalSplit {
    pub train: Range<usize>,
    pub test: Range<usize>,
}

impl TemporalSplit {
    /// Split `n_samples` rows, giving the first `floor(n * train_ratio)` rows to training.
    ///
    /// The rows are never shuffled: every training position precedes every
    /// test position.
    pub fn new(n_samples: usize, train_ratio: f64) -> Result<Self> {
        if !(train_ratio > 0.0 && train_ratio <= 1.0) {
            return Err(ForecastError::InvalidParameter {
                name: "split_ratio".to_string(),
                value: train_ratio.to_string(),
                reason: "must be in (0, 1]".to_string(),
            });
        }

        // Tolerance keeps products like 70 * 0.8 from rounding down to 55.
        let train_len = ((n_samples as f64) * train_ratio + 1e-9).floor() as usize;
        let train_len = train_len.min(n_samples);
        if train_len == 0 {
            return Err(ForecastError::EmptyInput(format!(
                "{} trainable rows leave an empty training block at split ratio {}",
                n_samples, train_ratio
            )));
        }

        Ok(Self {
            train: 0..train_len,
            test: train_len..n_samples,
        })
    }

    pub fn train_len(&self) -> usize {
        self.train.len()
    }

    pub fn test_len(&self) -> usize {
        self.test.len()
    }

    /// Slice a table into its (train, test) blocks
    pub fn apply(&self, df: &DataFrame) -> (DataFrame, DataFrame) {
        let train = df.slice(self.train.start as i64, self.train.len());
        let test = df.slice(self.test.start as i64, self.test.len());
        (train, test)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_undefined_only_considers_listed_columns() {
        let df = df!(
            "a" => &[None, Some(1.0), Some(2.0), Some(3.0)],
            "b" => &[Some(1.0), None, Some(2.0), Some(3.0)],
            "c" => &[None, None, None, Some(1.0)]
        )
        .unwrap();

        let kept = drop_undefined(&df, &["a".to_string(), "b".to_string()]).unwrap();
        assert_eq!(kept.height(), 2);
        assert_eq!(numeric_column(&kept, "a").unwrap(), vec![Some(2.0), Some(3.0)]);
    }

    #[test]
    fn test_drop_undefined_is_idempotent() {
        let df = df!(
            "a" => &[None, Some(1.0), Some(f64::NAN), Some(3.0)]
        )
        .unwrap();
        let cols = vec!["a".to_string()];

        let once = drop_undefined(&df, &cols).unwrap();
        let twice = drop_undefined(&once, &cols).unwrap();
        assert_eq!(once.height(), 2);
        assert!(once.equals_missing(&twice));
    }

    #[test]
    fn test_split_preserves_order() {
        let split = TemporalSplit::new(70, 0.8).unwrap();
        assert_eq!(split.train_len(), 56);
        assert_eq!(split.test_len(), 14);
        assert!(split.train.clone().all(|i| split.test.clone().all(|j| i < j)));
        assert_eq!(split.train.end, split.test.start);
    }

    #[test]
    fn test_split_full_ratio_has_empty_test_block() {
        let split = TemporalSplit::new(10, 1.0).unwrap();
        assert_eq!(split.train_len(), 10);
        assert_eq!(split.test_len(), 0);
    }

    #[test]
    fn test_split_rejects_empty_training_block() {
        assert!(matches!(TemporalSplit::new(0, 0.8), Err(ForecastError::EmptyInput(_))));
        assert!(matches!(TemporalSplit::new(1, 0.5), Err(ForecastError::EmptyInput(_))));
        assert!(TemporalSplit::new(10, 0.0).is_err());
    }

    #[test]
    fn test_apply_slices_contiguous_blocks() {
        let values: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let df = df!("t" => &values).unwrap();
        let split = TemporalSplit::new(10, 0.7).unwrap();
        let (train, test) = split.apply(&df);

        assert_eq!(numeric_column(&train, "t").unwrap().last(), Some(&Some(6.0)));
        assert_eq!(numeric_column(&test, "t").unwrap().first(), Some(&Some(7.0)));
    }
}
