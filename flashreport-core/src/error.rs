//! Error taxonomy for report generation
//!
//! Every variant is fatal for the run. Nothing is retried and no partial
//! workbook is written once one of these surfaces.

use std::path::PathBuf;

/// Failure raised anywhere in the report pipeline
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Malformed or inconsistent timestamp arguments, rejected before any query runs
    #[error("invalid input: {0}")]
    Input(String),

    /// Connection or query failure against the flash database
    #[error("storage error while {context}")]
    Storage {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    /// A measurement that must be numeric was not
    #[error("flash {flash_id}: measurement {key:?} is not an integer (got {value:?})")]
    DataFormat {
        flash_id: i64,
        key: String,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// Workbook serialization or file write failure
    #[error("failed to write report {}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

impl ReportError {
    pub(crate) fn storage(context: impl Into<String>, source: rusqlite::Error) -> Self {
        ReportError::Storage {
            context: context.into(),
            source,
        }
    }
}

/// Result alias used across the library
pub type Result<T, E = ReportError> = std::result::Result<T, E>;
