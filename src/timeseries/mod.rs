//! Time series module
//!
//! Turns a time-ordered table into a supervised learning table:
//! - Lag features (inputs)
//! - Forward-shifted forecast targets (outputs)
//! - Undefined-row filtering and ordered train/test splitting

mod features;
mod validation;

pub use features::{
    build_lags, build_targets, lag_column_name, target_column_name, LaggedFrame, SupervisedFrame,
};
pub use validation::{drop_undefined, TemporalSplit};
