//! Dataset loader and writer for CSV and Parquet files

use polars::prelude::*;
use std::path::Path;
use tracing::debug;

use crate::error::{RiskError, RiskResult};
use crate::utils::write_atomic_with;

/// Lowercased file extension, or the empty string.
fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Load a dataset from a file (CSV or Parquet based on extension)
///
/// `infer_schema_length` rows are used for CSV type inference; 0 scans the
/// whole file.
pub fn load_dataset(path: &Path, infer_schema_length: usize) -> RiskResult<DataFrame> {
    if !path.is_file() {
        return Err(RiskError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "dataset file not found"),
        ));
    }

    // 0 means full scan
    let schema_length = if infer_schema_length == 0 {
        None
    } else {
        Some(infer_schema_length)
    };

    let lf = match extension_of(path).as_str() {
        "csv" => LazyCsvReader::new(path)
            .with_infer_schema_length(schema_length)
            .finish()?,
        "parquet" => LazyFrame::scan_parquet(path, Default::default())?,
        other => {
            return Err(RiskError::Schema(format!(
                "Unsupported file format: '{}'. Supported formats: csv, parquet",
                other
            )))
        }
    };

    let df = lf.collect()?;
    debug!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "loaded dataset"
    );
    Ok(df)
}

/// Save dataset to file (CSV or Parquet based on extension), atomically
pub fn save_dataset(df: &DataFrame, path: &Path) -> RiskResult<()> {
    let mut df = df.clone();

    match extension_of(path).as_str() {
        "csv" => write_atomic_with(path, |file| {
            CsvWriter::new(file).finish(&mut df)?;
            Ok(())
        }),
        "parquet" => write_atomic_with(path, |file| {
            ParquetWriter::new(file).finish(&mut df)?;
            Ok(())
        }),
        other => Err(RiskError::Schema(format!(
            "Unsupported output format: '{}'. Supported formats: csv, parquet",
            other
        ))),
    }
}

/// Get column names from a DataFrame
pub fn get_column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect()
}
