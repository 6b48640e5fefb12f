//! Raw data preparation ahead of training

mod cleaner;

pub use cleaner::{summarize, ColumnSummary, DataCleaner, TimeOrderReport};
