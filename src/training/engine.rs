//! Multi-target training orchestrator

use super::models::{ForecastModel, ModelMetrics, Regressor};
use super::xgboost::XGBoostRegressor;
use crate::config::ForecastConfig;
use crate::error::{ForecastError, Result};
use crate::export::{sanitize_name, save_artifact, ModelMetadata};
use crate::timeseries::{build_lags, build_targets, drop_undefined, target_column_name, TemporalSplit};
use crate::utils::columns::columns_to_array2;
use chrono::Utc;
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info, warn};

/// Result of training one target column
#[derive(Debug)]
pub enum TargetOutcome {
    /// Model fitted, evaluated and written to `artifact`
    Trained {
        model: ForecastModel,
        metrics: ModelMetrics,
        artifact: PathBuf,
    },
    /// Target column not present in the table
    Skipped { reason: String },
    /// Fit, evaluation or persistence failed; other targets were unaffected
    Failed { error: ForecastError },
}

impl TargetOutcome {
    pub fn is_trained(&self) -> bool {
        matches!(self, TargetOutcome::Trained { .. })
    }
}

#[derive(Debug)]
pub struct TargetReport {
    pub target: String,
    pub outcome: TargetOutcome,
}

/// Outcome of a training run, one entry per requested target in request order
#[derive(Debug)]
pub struct TrainingReport {
    pub outcomes: Vec<TargetReport>,
    /// Trainable rows after dropping undefined values
    pub n_rows: usize,
    /// None when no requested target was present
    pub split: Option<TemporalSplit>,
    pub feature_columns: Vec<String>,
}

impl TrainingReport {
    pub fn outcome(&self, target: &str) -> Option<&TargetOutcome> {
        self.outcomes
            .iter()
            .find(|r| r.target == target)
            .map(|r| &r.outcome)
    }

    pub fn trained(&self) -> impl Iterator<Item = &TargetReport> {
        self.outcomes.iter().filter(|r| r.outcome.is_trained())
    }

    pub fn n_trained(&self) -> usize {
        self.trained().count()
    }

    pub fn n_skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|r| matches!(r.outcome, TargetOutcome::Skipped { .. }))
            .count()
    }

    pub fn n_failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|r| matches!(r.outcome, TargetOutcome::Failed { .. }))
            .count()
    }
}

/// Trains one booster per forecast target and persists it
#[derive(Debug, Clone)]
pub struct ForecastTrainer {
    config: ForecastConfig,
}

impl ForecastTrainer {
    pub fn new(config: ForecastConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Build lag features and horizon targets for the configured variables, then train.
    ///
    /// Features are the lag columns of the target variables. Variables missing
    /// from the table produce a `Skipped` outcome for each of their horizons.
    pub fn run(&self, df: &DataFrame) -> Result<TrainingReport> {
        self.config.validate()?;
        info!(
            rows = df.height(),
            targets = self.config.targets.len(),
            lag_hours = self.config.lag_hours,
            forecast_hours = self.config.forecast_hours,
            "Preparing supervised table"
        );

        let lagged = build_lags(df, &self.config.targets, self.config.lag_hours)?;
        let supervised = build_targets(&lagged.frame, &self.config.targets, self.config.forecast_hours)?;

        let target_columns: Vec<String> = self
            .config
            .targets
            .iter()
            .flat_map(|t| (1..=self.config.forecast_hours).map(move |s| target_column_name(t, s)))
            .collect();

        self.train(&supervised.frame, &lagged.lag_columns, &target_columns)
    }

    /// Fit and persist one model per target column.
    ///
    /// Missing target columns are skipped with a warning. Fatal only when
    /// targets collide after sanitization, no trainable row remains, or the
    /// training block would be empty.
    pub fn train(
        &self,
        df: &DataFrame,
        feature_columns: &[String],
        target_columns: &[String],
    ) -> Result<TrainingReport> {
        check_distinct_identifiers(target_columns)?;

        let present: Vec<&String> = target_columns
            .iter()
            .filter(|t| df.column(t.as_str()).is_ok())
            .collect();

        let mut outcomes: Vec<TargetReport> = Vec::with_capacity(target_columns.len());
        if present.is_empty() {
            for target in target_columns {
                warn!(target = %target, "Target column not found; skipping");
                outcomes.push(skipped(target));
            }
            return Ok(TrainingReport {
                outcomes,
                n_rows: 0,
                split: None,
                feature_columns: feature_columns.to_vec(),
            });
        }

        let mut used: Vec<String> = feature_columns.to_vec();
        used.extend(present.iter().map(|t| t.to_string()));
        let trainable = drop_undefined(df, &used)?;
        let n_rows = trainable.height();
        if n_rows == 0 {
            return Err(ForecastError::EmptyInput(
                "no row has defined values for every feature and target".to_string(),
            ));
        }

        let split = TemporalSplit::new(n_rows, self.config.split_ratio)?;
        let (train_df, test_df) = split.apply(&trainable);
        info!(
            rows = n_rows,
            train = split.train_len(),
            test = split.test_len(),
            features = feature_columns.len(),
            "Split trainable rows"
        );

        let x_train = columns_to_array2(&train_df, feature_columns)?;
        let x_test = columns_to_array2(&test_df, feature_columns)?;

        for target in target_columns {
            if df.column(target.as_str()).is_err() {
                warn!(target = %target, "Target column not found; skipping");
                outcomes.push(skipped(target));
                continue;
            }

            let outcome = match self.train_target(target, feature_columns, &x_train, &x_test, &train_df, &test_df) {
                Ok(trained) => trained,
                Err(e) => {
                    error!(target = %target, error = %e, "Training failed");
                    TargetOutcome::Failed { error: e }
                }
            };
            outcomes.push(TargetReport {
                target: target.clone(),
                outcome,
            });
        }

        Ok(TrainingReport {
            outcomes,
            n_rows,
            split: Some(split),
            feature_columns: feature_columns.to_vec(),
        })
    }

    fn train_target(
        &self,
        target: &str,
        feature_columns: &[String],
        x_train: &Array2<f64>,
        x_test: &Array2<f64>,
        train_df: &DataFrame,
        test_df: &DataFrame,
    ) -> Result<TargetOutcome> {
        let start = Instant::now();
        let y_train = single_column(train_df, target)?;
        let y_test = single_column(test_df, target)?;

        let mut booster = XGBoostRegressor::new(self.config.booster.clone());
        booster.fit(x_train, &y_train)?;
        let model = ForecastModel::named(feature_columns.to_vec(), booster);

        let y_pred = model.booster().predict(x_test)?;
        let mut metrics = ModelMetrics::compute_regression(&y_test, &y_pred);
        metrics.n_train = y_train.len();
        metrics.n_features = model.booster().n_features();
        metrics.training_time_secs = start.elapsed().as_secs_f64();

        let metadata = self.metadata_for(target, &model, &metrics);
        let artifact = save_artifact(&model, &metadata, &self.config.model_dir, self.config.format)?;

        match metrics.rmse {
            Some(rmse) => info!(target = %target, rmse = rmse, path = %artifact.display(), "Trained model"),
            None => info!(target = %target, path = %artifact.display(), "Trained model (empty test block, no RMSE)"),
        }

        Ok(TargetOutcome::Trained { model, metrics, artifact })
    }

    fn metadata_for(&self, target: &str, model: &ForecastModel, metrics: &ModelMetrics) -> ModelMetadata {
        let booster = &self.config.booster;
        let mut metadata = ModelMetadata::for_target(target)
            .with_model_type(model.model_type())
            .with_features(feature_names(model))
            .with_trained_at(Utc::now().to_rfc3339())
            .add_hyperparameter("n_estimators", booster.n_estimators)
            .add_hyperparameter("learning_rate", booster.learning_rate)
            .add_hyperparameter("max_depth", booster.max_depth)
            .add_hyperparameter("subsample", booster.subsample)
            .add_hyperparameter("colsample_bytree", booster.colsample_bytree)
            .add_hyperparameter("lag_hours", self.config.lag_hours)
            .add_metric("n_train", metrics.n_train as f64)
            .add_metric("n_test", metrics.n_test as f64);
        if let Some(seed) = booster.random_state {
            metadata = metadata.add_hyperparameter("random_state", seed);
        }
        if let Some(rmse) = metrics.rmse {
            metadata = metadata.add_metric("rmse", rmse);
        }
        if let Some(mae) = metrics.mae {
            metadata = metadata.add_metric("mae", mae);
        }
        metadata
    }
}

fn skipped(target: &str) -> TargetReport {
    TargetReport {
        target: target.to_string(),
        outcome: TargetOutcome::Skipped {
            reason: format!("column '{}' not found", target),
        },
    }
}

fn feature_names(model: &ForecastModel) -> Vec<String> {
    match model {
        ForecastModel::Named { feature_names, .. } => feature_names.clone(),
        ForecastModel::Unnamed(_) => Vec::new(),
    }
}

fn single_column(df: &DataFrame, name: &str) -> Result<Array1<f64>> {
    let matrix = columns_to_array2(df, &[name.to_string()])?;
    Ok(matrix.column(0).to_owned())
}

/// Each target must own its artifact file within one run
fn check_distinct_identifiers(targets: &[String]) -> Result<()> {
    let mut seen: HashMap<String, &str> = HashMap::new();
    for target in targets {
        let id = sanitize_name(target);
        if let Some(previous) = seen.insert(id.clone(), target) {
            let reason = if previous == target.as_str() {
                format!("target '{}' is listed more than once", target)
            } else {
                format!("targets '{}' and '{}' both map to artifact name '{}'", previous, target, id)
            };
            return Err(ForecastError::ConfigError(reason));
        }
    }
    Ok(())
}
