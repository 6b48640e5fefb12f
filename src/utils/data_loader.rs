//! Table loading and saving (CSV and Parquet)

use crate::error::{ForecastError, Result};
use polars::prelude::*;
use std::fs::{self, File};
use std::io::Cursor;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Rows used to infer CSV column types
const INFER_SCHEMA_ROWS: usize = 1000;

/// Reads weather tables from disk
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Lines to skip before the CSV header
    skip_rows: usize,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self { skip_rows: 0 }
    }

    /// Skip leading metadata lines before the header row
    pub fn with_skip_rows(mut self, n: usize) -> Self {
        self.skip_rows = n;
        self
    }

    /// Load a CSV file
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let start = Instant::now();
        let options = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(INFER_SCHEMA_ROWS));

        let df = if self.skip_rows == 0 {
            options
                .try_into_reader_with_file_path(Some(path.to_path_buf()))
                .and_then(|reader| reader.finish())
        } else {
            // Metadata lines can have a different field count than the table
            let text = fs::read_to_string(path)?;
            let body: String = text.split_inclusive('\n').skip(self.skip_rows).collect();
            options
                .into_reader_with_file_handle(Cursor::new(body.into_bytes()))
                .finish()
        }
        .map_err(|e| ForecastError::DataError(format!("{}: {}", path.display(), e)))?;

        debug!(path = %path.display(), skipped = self.skip_rows, elapsed = ?start.elapsed(), "Read CSV");
        Ok(df)
    }

    /// Load a Parquet file
    pub fn load_parquet(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| ForecastError::DataError(format!("{}: {}", path.display(), e)))?;

        ParquetReader::new(file)
            .finish()
            .map_err(|e| ForecastError::DataError(format!("{}: {}", path.display(), e)))
    }

    /// Load a file, choosing the reader from its extension
    pub fn load_auto(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let df = match ext.as_str() {
            "csv" => self.load_csv(path)?,
            "parquet" => self.load_parquet(path)?,
            _ => {
                return Err(ForecastError::DataError(format!(
                    "Unsupported file format: {}",
                    path.display()
                )))
            }
        };

        info!(path = %path.display(), rows = df.height(), cols = df.width(), "Loaded data");
        Ok(df)
    }
}

/// Writes tables to disk, creating parent directories as needed
pub struct DataSaver;

impl DataSaver {
    pub fn save_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
        let mut file = create_with_parents(path.as_ref())?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(df)
            .map_err(|e| ForecastError::DataError(e.to_string()))
    }

    pub fn save_parquet(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
        let file = create_with_parents(path.as_ref())?;
        ParquetWriter::new(file)
            .finish(df)
            .map(|_| ())
            .map_err(|e| ForecastError::DataError(e.to_string()))
    }

    /// Save by extension; anything other than `parquet` is written as CSV
    pub fn save_auto(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("parquet") => Self::save_parquet(df, path),
            _ => Self::save_csv(df, path),
        }
    }
}

fn create_with_parents(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(File::create(path)?)
}
