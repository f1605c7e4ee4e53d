use std::fs;
use std::path::Path;

use dbx_core::response::Row;
use dbx_core::session::ExportSummary;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("there are no rows to export")]
    NoRows,
    #[error("failed to write export file at {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize JSON export: {0}")]
    Json(#[from] serde_json::Error),
}

/// `<prefix>_<unix seconds>.json`
#[must_use]
pub fn export_file_name(prefix: &str, unix_seconds: i64) -> String {
    format!("{prefix}_{unix_seconds}.json")
}

/// Writes `rows` as a pretty JSON array to `<dir>/<prefix>_<unix>.json`.
pub fn export_results(
    dir: &Path,
    prefix: &str,
    rows: &[Row],
    unix_seconds: i64,
) -> Result<ExportSummary, ExportError> {
    if rows.is_empty() {
        return Err(ExportError::NoRows);
    }

    let file_name = export_file_name(prefix, unix_seconds);
    let path = dir.join(&file_name);
    let written = export_rows_to_json(&path, rows)?;
    Ok(ExportSummary {
        path,
        file_name,
        rows: written,
    })
}

pub fn export_rows_to_json(path: &Path, rows: &[Row]) -> Result<usize, ExportError> {
    let payload = serde_json::to_string_pretty(rows)?;
    fs::write(path, payload).map_err(|source| ExportError::Write {
        path: path.display().to_string(),
        source,
    })?;
    Ok(rows.len())
}
