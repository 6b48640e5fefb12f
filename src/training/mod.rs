//! Model training
//!
//! - Gradient boosted regression trees ([`XGBoostRegressor`])
//! - Persisted model form and the capability trait used at inference time
//! - Per-target orchestration with isolated failures ([`ForecastTrainer`])

mod engine;
mod models;
pub mod xgboost;

pub use engine::{ForecastTrainer, TargetOutcome, TargetReport, TrainingReport};
pub use models::{Capability, ForecastModel, ModelMetrics, Regressor};
pub use xgboost::{XGBoostConfig, XGBoostRegressor};
