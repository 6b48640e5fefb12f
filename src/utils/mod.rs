//! Utility functions and types

pub mod columns;
pub mod data_loader;

pub use columns::{columns_to_array2, numeric_column, numeric_column_names, TIME_COLUMN};
pub use data_loader::{DataLoader, DataSaver};
