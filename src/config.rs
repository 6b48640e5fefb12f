//! Forecast pipeline configuration

use crate::error::{ForecastError, Result};
use crate::export::SerializationFormat;
use crate::training::XGBoostConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Variables forecast by default (Open-Meteo hourly export column names)
pub const DEFAULT_TARGETS: [&str; 5] = [
    "wind_speed_100m (km/h)",
    "wind_direction_100m (°)",
    "pressure_msl (hPa)",
    "vapour_pressure_deficit (kPa)",
    "soil_moisture_100_to_255cm (m³/m³)",
];

/// Configuration shared by the training and prediction stages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Lag window length H (hours of history per variable)
    pub lag_hours: usize,

    /// Number of forecast horizons F
    pub forecast_hours: usize,

    /// Variables to forecast
    pub targets: Vec<String>,

    /// Fraction of trainable rows used for training; the rest is the test block
    pub split_ratio: f64,

    /// Directory holding one artifact per target
    pub model_dir: PathBuf,

    /// Artifact format written by the trainer
    pub format: SerializationFormat,

    /// Value used for model features absent from the inference row
    pub missing_feature_fill: f64,

    /// Booster hyperparameters (fixed per run)
    pub booster: XGBoostConfig,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            lag_hours: 24,
            forecast_hours: 6,
            targets: DEFAULT_TARGETS.iter().map(|s| s.to_string()).collect(),
            split_ratio: 0.8,
            model_dir: PathBuf::from("app/models"),
            format: SerializationFormat::Binary,
            missing_feature_fill: 0.0,
            booster: XGBoostConfig::default(),
        }
    }
}

impl ForecastConfig {
    /// Create a configuration for the given targets
    pub fn new<S: Into<String>>(targets: impl IntoIterator<Item = S>) -> Self {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Builder method to set the lag window
    pub fn with_lag_hours(mut self, hours: usize) -> Self {
        self.lag_hours = hours;
        self
    }

    /// Builder method to set the number of forecast horizons
    pub fn with_forecast_hours(mut self, hours: usize) -> Self {
        self.forecast_hours = hours;
        self
    }

    /// Builder method to set the train/test split ratio
    pub fn with_split_ratio(mut self, ratio: f64) -> Self {
        self.split_ratio = ratio;
        self
    }

    /// Builder method to set the model directory
    pub fn with_model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.model_dir = dir.into();
        self
    }

    /// Builder method to set the artifact format
    pub fn with_format(mut self, format: SerializationFormat) -> Self {
        self.format = format;
        self
    }

    /// Builder method to set the fill value for missing inference features
    pub fn with_missing_feature_fill(mut self, value: f64) -> Self {
        self.missing_feature_fill = value;
        self
    }

    /// Builder method to set booster hyperparameters
    pub fn with_booster(mut self, booster: XGBoostConfig) -> Self {
        self.booster = booster;
        self
    }

    /// Check invariants that the pipeline relies on
    pub fn validate(&self) -> Result<()> {
        if !(self.split_ratio > 0.0 && self.split_ratio <= 1.0) {
            return Err(ForecastError::InvalidParameter {
                name: "split_ratio".to_string(),
                value: self.split_ratio.to_string(),
                reason: "must be in (0, 1]".to_string(),
            });
        }
        if self.lag_hours == 0 {
            return Err(ForecastError::InvalidParameter {
                name: "lag_hours".to_string(),
                value: "0".to_string(),
                reason: "at least one lag is required to build features".to_string(),
            });
        }
        if self.forecast_hours == 0 {
            return Err(ForecastError::InvalidParameter {
                name: "forecast_hours".to_string(),
                value: "0".to_string(),
                reason: "at least one horizon is required".to_string(),
            });
        }
        if self.targets.is_empty() {
            return Err(ForecastError::ConfigError("no target variables configured".to_string()));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.targets.iter().find(|t| !seen.insert(t.as_str())) {
            return Err(ForecastError::ConfigError(format!(
                "target '{}' is listed more than once",
                dup
            )));
        }
        if !self.missing_feature_fill.is_finite() {
            return Err(ForecastError::InvalidParameter {
                name: "missing_feature_fill".to_string(),
                value: self.missing_feature_fill.to_string(),
                reason: "must be finite".to_string(),
            });
        }
        Ok(())
    }

    /// Load configuration from a JSON file; missing fields take defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref()).map_err(|e| {
            ForecastError::ConfigError(format!("Failed to open {}: {}", path.as_ref().display(), e))
        })?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Write configuration as pretty JSON
    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path.as_ref())?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }
}
