//! Kolosal Forecast - multi-horizon weather forecasting
//!
//! Turns an hourly, time-ordered weather table into one gradient boosted
//! regressor per (variable, horizon) pair and serves forecasts from the most
//! recent observation.
//!
//! # Modules
//!
//! ## Pipeline
//! - [`preprocessing`] - Raw export cleaning and time-order checks
//! - [`timeseries`] - Lag features, forecast targets, temporal split
//! - [`training`] - Booster, per-target training orchestration
//! - [`export`] - Artifact naming, serialization, model registry
//! - [`inference`] - Feature alignment and latest-row forecasting
//!
//! ## Support
//! - [`config`] - Pipeline configuration
//! - [`utils`] - Data loading and column extraction
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;
pub mod config;

// Pipeline stages
pub mod preprocessing;
pub mod timeseries;
pub mod training;
pub mod export;
pub mod inference;

// Utilities
pub mod utils;

// Services
pub mod cli;

pub use error::{ForecastError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{ForecastError, Result};

    // Configuration
    pub use crate::config::{ForecastConfig, DEFAULT_TARGETS};

    // Preprocessing
    pub use crate::preprocessing::DataCleaner;

    // Time series
    pub use crate::timeseries::{build_lags, build_targets, drop_undefined, TemporalSplit};

    // Training
    pub use crate::training::{
        ForecastModel, ForecastTrainer, Regressor, TargetOutcome, TrainingReport, XGBoostConfig,
        XGBoostRegressor,
    };

    // Export
    pub use crate::export::{ModelMetadata, ModelRegistry, SerializationFormat};

    // Inference
    pub use crate::inference::{predict_one, FeatureRow, ForecastEngine, ForecastReport, ModelForecast};

    // Utilities
    pub use crate::utils::{DataLoader, DataSaver};
}
