//! CSV loading with fallback strategies.

use crate::error::{ProcessingError, Result};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Where a raw dataset comes from.
#[derive(Debug, Clone)]
pub enum DataSource {
    /// A CSV file on disk.
    Path(PathBuf),
    /// CSV content already in memory.
    Bytes(Vec<u8>),
    /// A frame loaded by the caller.
    Frame(DataFrame),
}

impl From<PathBuf> for DataSource {
    fn from(path: PathBuf) -> Self {
        DataSource::Path(path)
    }
}

impl From<&Path> for DataSource {
    fn from(path: &Path) -> Self {
        DataSource::Path(path.to_path_buf())
    }
}

impl From<&str> for DataSource {
    fn from(path: &str) -> Self {
        DataSource::Path(PathBuf::from(path))
    }
}

impl From<Vec<u8>> for DataSource {
    fn from(bytes: Vec<u8>) -> Self {
        DataSource::Bytes(bytes)
    }
}

impl From<DataFrame> for DataSource {
    fn from(df: DataFrame) -> Self {
        DataSource::Frame(df)
    }
}

impl DataSource {
    /// Materialize the source as a raw, uncleaned frame.
    pub fn into_frame(self) -> Result<DataFrame> {
        match self {
            DataSource::Path(path) => load_csv_with_fallbacks(&path),
            DataSource::Bytes(bytes) => load_csv_bytes(bytes),
            DataSource::Frame(df) => Ok(df),
        }
    }
}

/// Load a CSV file, retrying with progressively more lenient strategies.
pub fn load_csv_with_fallbacks(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(ProcessingError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("dataset file not found: {}", path.display()),
        )));
    }

    // Strategy 1: Standard loading with quote handling
    match CsvReadOptions::default()
        .with_infer_schema_length(None)
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
    {
        Ok(df) => return Ok(df),
        Err(e) => {
            debug!("Standard loading failed: {}", e);
        }
    }

    // Strategy 2: Without quote handling
    match CsvReadOptions::default()
        .with_infer_schema_length(None)
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(None))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
    {
        Ok(df) => return Ok(df),
        Err(e) => {
            debug!("Loading without quotes failed: {}", e);
        }
    }

    // Strategy 3: Pre-clean content
    match std::fs::read_to_string(path) {
        Ok(content) => load_csv_bytes(clean_csv_content(&content).into_bytes()),
        Err(e) => {
            error!("Could not read file: {}", e);
            Err(e.into())
        }
    }
}

/// Load CSV content held in memory.
pub fn load_csv_bytes(bytes: Vec<u8>) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_infer_schema_length(None)
        .with_has_header(true)
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()?;
    Ok(df)
}

/// Collapse doubled quotes and drop blank lines.
fn clean_csv_content(content: &str) -> String {
    content
        .replace("\"\"\"", "\"")
        .replace("\"\"", "\"")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
