//! Trained model representation, capability trait and evaluation metrics

use super::xgboost::XGBoostRegressor;
use crate::error::Result;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// What a regressor knows about the input it expects
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Capability<'a> {
    /// Trained on these columns, in this order
    SchemaAware(&'a [String]),
    /// No recorded schema; input is passed through as given
    SchemaOpaque,
}

/// A trained single-target regressor as seen by the inference side
pub trait Regressor: Send + Sync {
    /// Report whether the model carries its training feature schema
    fn capability(&self) -> Capability<'_>;

    /// Predict one sample; `values` must already be in the model's column order
    fn predict_row(&self, values: &[f64]) -> Result<f64>;

    /// Short model family label used in logs and metadata
    fn model_type(&self) -> &'static str {
        "regressor"
    }
}

/// Persisted form of a per-target forecaster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ForecastModel {
    /// Booster plus the ordered feature names it was fitted on
    Named {
        feature_names: Vec<String>,
        booster: XGBoostRegressor,
    },
    /// Booster exported without its feature schema
    Unnamed(XGBoostRegressor),
}

impl ForecastModel {
    pub fn named(feature_names: Vec<String>, booster: XGBoostRegressor) -> Self {
        ForecastModel::Named { feature_names, booster }
    }

    pub fn booster(&self) -> &XGBoostRegressor {
        match self {
            ForecastModel::Named { booster, .. } => booster,
            ForecastModel::Unnamed(booster) => booster,
        }
    }

    /// Drop the feature schema, keeping only the booster
    pub fn into_unnamed(self) -> Self {
        match self {
            ForecastModel::Named { booster, .. } => ForecastModel::Unnamed(booster),
            unnamed => unnamed,
        }
    }
}

impl Regressor for ForecastModel {
    fn capability(&self) -> Capability<'_> {
        match self {
            ForecastModel::Named { feature_names, .. } => Capability::SchemaAware(feature_names),
            ForecastModel::Unnamed(_) => Capability::SchemaOpaque,
        }
    }

    fn predict_row(&self, values: &[f64]) -> Result<f64> {
        self.booster().predict_row(values)
    }

    fn model_type(&self) -> &'static str {
        "xgboost_regressor"
    }
}

/// Regression metrics for one target
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    /// Root Mean Squared Error on the test block (None when the block is empty)
    pub rmse: Option<f64>,
    /// Mean Absolute Error on the test block
    pub mae: Option<f64>,
    /// R-squared on the test block
    pub r2: Option<f64>,
    /// Rows in the training block
    pub n_train: usize,
    /// Rows in the test block
    pub n_test: usize,
    /// Number of input features
    pub n_features: usize,
    /// Training time in seconds
    pub training_time_secs: f64,
}

impl ModelMetrics {
    /// Compute regression metrics; an empty test block leaves them unset
    pub fn compute_regression(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let mut metrics = Self {
            n_test: y_true.len(),
            ..Default::default()
        };
        if y_true.is_empty() {
            return metrics;
        }

        let n = y_true.len() as f64;
        let errors: Vec<f64> = y_true.iter().zip(y_pred.iter()).map(|(t, p)| t - p).collect();

        let mse: f64 = errors.iter().map(|e| e * e).sum::<f64>() / n;
        metrics.rmse = Some(mse.sqrt());
        metrics.mae = Some(errors.iter().map(|e| e.abs()).sum::<f64>() / n);

        let y_mean: f64 = y_true.iter().sum::<f64>() / n;
        let ss_tot: f64 = y_true.iter().map(|y| (y - y_mean).powi(2)).sum();
        let ss_res: f64 = errors.iter().map(|e| e.powi(2)).sum();
        metrics.r2 = if ss_tot > 0.0 { Some(1.0 - ss_res / ss_tot) } else { Some(0.0) };

        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::XGBoostConfig;
    use ndarray::{array, Array2};

    #[test]
    fn test_regression_metrics() {
        let y_true = array![1.0, 2.0, 3.0, 4.0, 5.0];
        let y_pred = array![1.1, 2.0, 2.9, 4.1, 5.0];

        let metrics = ModelMetrics::compute_regression(&y_true, &y_pred);

        let expected_rmse = (0.03f64 / 5.0).sqrt();
        assert!((metrics.rmse.unwrap() - expected_rmse).abs() < 1e-12);
        assert!(metrics.r2.unwrap() > 0.9);
        assert_eq!(metrics.n_test, 5);
    }

    #[test]
    fn test_empty_test_block_has_no_rmse() {
        let empty = Array1::<f64>::zeros(0);
        let metrics = ModelMetrics::compute_regression(&empty, &empty);
        assert_eq!(metrics.rmse, None);
        assert_eq!(metrics.n_test, 0);
    }

    #[test]
    fn test_capability_follows_variant() {
        let x = Array2::from_shape_vec((4, 1), vec![0.0, 1.0, 2.0, 3.0]).unwrap();
        let y = array![0.0, 1.0, 2.0, 3.0];
        let mut booster = XGBoostRegressor::new(XGBoostConfig { n_estimators: 5, ..Default::default() });
        booster.fit(&x, &y).unwrap();

        let named = ForecastModel::named(vec!["a_lag1".to_string()], booster);
        assert_eq!(named.capability(), Capability::SchemaAware(&["a_lag1".to_string()]));

        let opaque = named.clone().into_unnamed();
        assert_eq!(opaque.capability(), Capability::SchemaOpaque);
        assert_eq!(opaque.predict_row(&[2.0]).unwrap(), named.predict_row(&[2.0]).unwrap());
    }
}
