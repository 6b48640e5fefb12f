//! Inference
//!
//! Aligns the most recent observation to each loaded model's feature schema
//! and collects one forecast per model. Failures are reported per model.

mod aligner;
mod engine;

pub use aligner::{align, predict_one, AlignFailure, AlignState, AlignedRow, FeatureRow, Prediction};
pub use engine::{ForecastEngine, ForecastReport, ModelForecast};
