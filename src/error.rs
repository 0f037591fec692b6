// src/error.rs

use thiserror::Error;

/// Result type for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Failure reported by a [`crate::source::TableSource`].
#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Sql(#[from] sqlx::Error),
    #[error("unsupported column `{column}` of type {type_name}")]
    UnsupportedColumn { column: String, type_name: String },
    #[error("{0}")]
    Other(String),
}

/// Request rejected before any query runs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing table name")]
    MissingTable,
    #[error("table `{0}` is not exportable")]
    UnknownTable(String),
    #[error("invalid {field} `{value}`, expected YYYY-MM-DD")]
    InvalidDate { field: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("counting records in `{table}` failed")]
    CountFailed {
        table: String,
        #[source]
        source: SourceError,
    },
    #[error("fetching chunk at offset {offset} of `{table}` failed")]
    ChunkFailed {
        table: String,
        offset: u64,
        #[source]
        source: SourceError,
    },
}

#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("writing spreadsheet failed")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error("spreadsheet task failed: {0}")]
    Task(String),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
    #[error(transparent)]
    Serialization(#[from] SerializationError),
}

impl ExportError {
    /// Generic message safe to hand back to a client. Details stay in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            ExportError::Validation(ValidationError::InvalidDate { .. }) => {
                "Invalid request parameters"
            }
            ExportError::Validation(_) => "Invalid or missing table name",
            ExportError::Retrieval(RetrievalError::CountFailed { .. }) => {
                "Failed to get record count"
            }
            ExportError::Retrieval(RetrievalError::ChunkFailed { .. }) => "Failed to process data",
            ExportError::Serialization(_) => "Failed to create Excel file",
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self, ExportError::Validation(_))
    }
}
