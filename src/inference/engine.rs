//! Latest-row forecasting over a model registry

use super::aligner::{predict_one, AlignState, FeatureRow, Prediction};
use crate::config::ForecastConfig;
use crate::error::{ForecastError, Result};
use crate::export::ModelRegistry;
use crate::timeseries::{build_lags, drop_undefined};
use crate::utils::columns::{numeric_column, numeric_column_names};
use polars::prelude::*;
use tracing::{error, info};

/// Outcome for one registry entry
#[derive(Debug, Clone, PartialEq)]
pub enum ModelForecast {
    Succeeded {
        key: String,
        prediction: Prediction,
    },
    Failed {
        key: String,
        /// State the model was in when it failed
        stage: AlignState,
        reason: String,
    },
}

impl ModelForecast {
    pub fn key(&self) -> &str {
        match self {
            ModelForecast::Succeeded { key, .. } | ModelForecast::Failed { key, .. } => key,
        }
    }

    /// Terminal state reached by the model
    pub fn state(&self) -> AlignState {
        match self {
            ModelForecast::Succeeded { .. } => AlignState::Succeeded,
            ModelForecast::Failed { .. } => AlignState::Failed,
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            ModelForecast::Succeeded { prediction, .. } => Some(prediction.value),
            ModelForecast::Failed { .. } => None,
        }
    }
}

/// One entry per registry model, in key order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastReport {
    pub forecasts: Vec<ModelForecast>,
}

impl ForecastReport {
    pub fn len(&self) -> usize {
        self.forecasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forecasts.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&ModelForecast> {
        self.forecasts.iter().find(|f| f.key() == key)
    }

    pub fn n_succeeded(&self) -> usize {
        self.forecasts.iter().filter(|f| f.value().is_some()).count()
    }

    pub fn n_failed(&self) -> usize {
        self.len() - self.n_succeeded()
    }
}

/// Runs every loaded model against the most recent fully-defined row
#[derive(Debug, Clone)]
pub struct ForecastEngine {
    config: ForecastConfig,
}

impl ForecastEngine {
    pub fn new(config: ForecastConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Lag every numeric column, drop undefined rows and return the last one.
    ///
    /// The row holds the original numeric columns followed by their lags.
    pub fn latest_row(&self, df: &DataFrame) -> Result<FeatureRow> {
        let variables = numeric_column_names(df);
        let lagged = build_lags(df, &variables, self.config.lag_hours)?;

        let mut columns = variables;
        columns.extend(lagged.lag_columns);
        let defined = drop_undefined(&lagged.frame, &columns)?;
        if defined.height() == 0 {
            return Err(ForecastError::EmptyInput(format!(
                "no row of {} has {} hours of defined history",
                df.height(),
                self.config.lag_hours
            )));
        }

        let last = defined.tail(Some(1));
        let values = columns
            .iter()
            .map(|name| {
                numeric_column(&last, name)?
                    .first()
                    .copied()
                    .flatten()
                    .ok_or_else(|| ForecastError::DataError(format!("undefined value in '{}'", name)))
            })
            .collect::<Result<Vec<f64>>>()?;

        FeatureRow::new(columns, values)
    }

    /// Forecast every registry model from the latest row of `df`.
    ///
    /// An empty registry gives an empty report. A failing model is recorded
    /// and the remaining models still run.
    pub fn forecast(&self, df: &DataFrame, registry: &ModelRegistry) -> Result<ForecastReport> {
        if registry.is_empty() {
            info!(dir = %registry.root().display(), "No models loaded; nothing to forecast");
            return Ok(ForecastReport::default());
        }

        let row = self.latest_row(df)?;
        info!(features = row.len(), models = registry.len(), "Forecasting from latest row");
        Ok(self.forecast_row(&row, registry))
    }

    /// Forecast every registry model from an already-built row
    pub fn forecast_row(&self, row: &FeatureRow, registry: &ModelRegistry) -> ForecastReport {
        let forecasts = registry
            .iter()
            .map(|entry| {
                match predict_one(row, &entry.model, self.config.missing_feature_fill) {
                    Ok(prediction) => {
                        info!(model = %entry.key, value = prediction.value, "Forecast");
                        ModelForecast::Succeeded {
                            key: entry.key.clone(),
                            prediction,
                        }
                    }
                    Err(failure) => {
                        error!(model = %entry.key, error = %failure, "Forecast failed");
                        ModelForecast::Failed {
                            key: entry.key.clone(),
                            stage: failure.stage,
                            reason: failure.error.to_string(),
                        }
                    }
                }
            })
            .collect();

        ForecastReport { forecasts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_row_skips_time_and_keeps_order() {
        let df = df!(
            "time" => &["t0", "t1", "t2", "t3"],
            "a" => &[1.0, 2.0, 3.0, 4.0],
            "b" => &[10.0, 20.0, 30.0, 40.0]
        )
        .unwrap();
        let engine = ForecastEngine::new(ForecastConfig::default().with_lag_hours(2));

        let row = engine.latest_row(&df).unwrap();
        assert_eq!(
            row.names(),
            &["a", "b", "a_lag1", "a_lag2", "b_lag1", "b_lag2"]
        );
        assert_eq!(row.values(), &[4.0, 40.0, 3.0, 2.0, 30.0, 20.0]);
    }

    #[test]
    fn test_latest_row_needs_full_history() {
        let df = df!("a" => &[1.0, 2.0]).unwrap();
        let engine = ForecastEngine::new(ForecastConfig::default().with_lag_hours(2));
        assert!(matches!(
            engine.latest_row(&df),
            Err(ForecastError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_latest_row_skips_trailing_gap() {
        let df = df!("a" => &[Some(1.0), Some(2.0), Some(3.0), None]).unwrap();
        let engine = ForecastEngine::new(ForecastConfig::default().with_lag_hours(1));

        let row = engine.latest_row(&df).unwrap();
        assert_eq!(row.get("a"), Some(3.0));
        assert_eq!(row.get("a_lag1"), Some(2.0));
    }

    #[test]
    fn test_forecast_outcomes_end_in_terminal_states() {
        let ok = ModelForecast::Succeeded {
            key: "a".to_string(),
            prediction: Prediction {
                value: 1.0,
                filled: Vec::new(),
            },
        };
        let failed = ModelForecast::Failed {
            key: "b".to_string(),
            stage: AlignState::Predicting,
            reason: "shape".to_string(),
        };

        assert_eq!(ok.state(), AlignState::Succeeded);
        assert_eq!(failed.state(), AlignState::Failed);
        assert!(ok.state().is_terminal() && failed.state().is_terminal());
    }

    #[test]
    fn test_empty_registry_gives_empty_report() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::load_all(dir.path()).unwrap();
        let engine = ForecastEngine::new(ForecastConfig::default());

        // Too short to build a row; never reached with no models
        let df = df!("a" => &[1.0]).unwrap();
        let report = engine.forecast(&df, &registry).unwrap();
        assert!(report.is_empty());
    }
}
