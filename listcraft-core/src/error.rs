//! Error taxonomy for the reconciliation engine
//!
//! Fatal conditions abort the run before any output is written; non-fatal
//! conditions are accumulated as advisories on the report instead (see
//! [`crate::report`]).

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReconcileError>;

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Wrapper for I/O failures such as reading or writing files
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The base or supplier file cannot be opened or parsed
    #[error("failed to load {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    /// Errors bubbled up from the spreadsheet reader
    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    /// Errors bubbled up from the CSV reader
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The base list is missing a column required by the configuration
    #[error("base list is missing required column '{column}' ({role})")]
    Schema { column: String, role: String },
}

impl ReconcileError {
    pub fn load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ReconcileError::Load {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn schema(column: impl Into<String>, role: impl Into<String>) -> Self {
        ReconcileError::Schema {
            column: column.into(),
            role: role.into(),
        }
    }
}
