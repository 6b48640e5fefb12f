//! Single-row feature alignment and prediction

use crate::error::{ForecastError, Result};
use crate::training::{Capability, Regressor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{trace, warn};

/// One observation: column names with their values, in table order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureRow {
    names: Vec<String>,
    values: Vec<f64>,
}

impl FeatureRow {
    pub fn new(names: Vec<String>, values: Vec<f64>) -> Result<Self> {
        if names.len() != values.len() {
            return Err(ForecastError::ShapeError {
                expected: format!("{} values", names.len()),
                actual: format!("{} values", values.len()),
            });
        }
        Ok(Self { names, values })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }
}

/// Per-model progress through alignment and prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlignState {
    Aligning,
    Aligned,
    Predicting,
    Succeeded,
    Failed,
}

impl AlignState {
    /// `Succeeded` and `Failed` end a model's run
    pub fn is_terminal(self) -> bool {
        matches!(self, AlignState::Succeeded | AlignState::Failed)
    }
}

impl fmt::Display for AlignState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AlignState::Aligning => "aligning",
            AlignState::Aligned => "aligned",
            AlignState::Predicting => "predicting",
            AlignState::Succeeded => "succeeded",
            AlignState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A single forecast value
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub value: f64,
    /// Model features that were absent from the row and replaced by the fill value
    pub filled: Vec<String>,
}

/// Why a model produced no prediction, and in which state it stopped
#[derive(Debug)]
pub struct AlignFailure {
    /// Last state entered before moving to `Failed`
    pub stage: AlignState,
    pub error: ForecastError,
}

impl fmt::Display for AlignFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} while {}", self.error, self.stage)
    }
}

/// Input vector in the model's expected order
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedRow {
    pub values: Vec<f64>,
    pub filled: Vec<String>,
}

/// Reorder `row` to what the model expects.
///
/// Schema-aware models get exactly their training columns in training order,
/// with absent columns set to `fill_value`. Schema-opaque models get the row
/// unchanged.
pub fn align(row: &FeatureRow, capability: Capability<'_>, fill_value: f64) -> AlignedRow {
    match capability {
        Capability::SchemaOpaque => AlignedRow {
            values: row.values.clone(),
            filled: Vec::new(),
        },
        Capability::SchemaAware(expected) => {
            let index: HashMap<&str, f64> = row
                .names
                .iter()
                .map(String::as_str)
                .zip(row.values.iter().copied())
                .collect();

            let mut filled = Vec::new();
            let values = expected
                .iter()
                .map(|name| match index.get(name.as_str()) {
                    Some(&v) => v,
                    None => {
                        filled.push(name.clone());
                        fill_value
                    }
                })
                .collect();

            AlignedRow { values, filled }
        }
    }
}

/// Align `row` for `model` and produce one prediction.
///
/// Walks `Aligning → Aligned → Predicting` and ends in `Succeeded` or
/// `Failed`. A failure carries the state it happened in.
pub fn predict_one(
    row: &FeatureRow,
    model: &dyn Regressor,
    fill_value: f64,
) -> std::result::Result<Prediction, AlignFailure> {
    let mut state = AlignState::Aligning;
    match run_stages(row, model, fill_value, &mut state) {
        Ok(prediction) => {
            transition(model, state, AlignState::Succeeded);
            Ok(prediction)
        }
        Err(error) => {
            transition(model, state, AlignState::Failed);
            Err(AlignFailure { stage: state, error })
        }
    }
}

fn transition(model: &dyn Regressor, from: AlignState, to: AlignState) -> AlignState {
    trace!(model = model.model_type(), from = %from, to = %to, "Align state");
    to
}

fn run_stages(
    row: &FeatureRow,
    model: &dyn Regressor,
    fill_value: f64,
    state: &mut AlignState,
) -> Result<Prediction> {
    if !fill_value.is_finite() {
        return Err(ForecastError::InvalidParameter {
            name: "missing_feature_fill".to_string(),
            value: fill_value.to_string(),
            reason: "must be finite".to_string(),
        });
    }

    let aligned = align(row, model.capability(), fill_value);
    *state = transition(model, *state, AlignState::Aligned);
    if !aligned.filled.is_empty() {
        warn!(
            model = model.model_type(),
            missing = aligned.filled.len(),
            first = %aligned.filled[0],
            fill = fill_value,
            "Input row is missing model features; filling"
        );
    }

    *state = transition(model, *state, AlignState::Predicting);
    let value = model.predict_row(&aligned.values)?;
    if !value.is_finite() {
        return Err(ForecastError::InferenceError(format!(
            "model returned non-finite value {}",
            value
        )));
    }

    Ok(Prediction {
        value,
        filled: aligned.filled,
    })
}
