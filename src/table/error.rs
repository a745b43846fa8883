//! Table collaborator error types.

use thiserror::Error;

/// Errors reported by a table collaborator.
#[derive(Error, Debug)]
pub enum TableError {
    #[error("Field index {index} out of bounds for table with {field_count} fields")]
    FieldIndexOutOfBounds { index: usize, field_count: usize },

    #[error("Invalid record number {recno} (record count: {record_count})")]
    InvalidRecordNumber { recno: u32, record_count: u32 },

    #[error("No current record")]
    NoCurrentRecord,

    #[error("Invalid data for field {field}: {reason}")]
    InvalidFieldValue { field: String, reason: String },

    #[error("Invalid field definition: {0}")]
    InvalidFieldDef(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TableError {
    /// Legacy xBase return code for this error.
    pub fn code(&self) -> i16 {
        match self {
            TableError::FieldIndexOutOfBounds { .. } => -301,
            TableError::InvalidRecordNumber { .. } => -218,
            TableError::NoCurrentRecord => -214,
            TableError::InvalidFieldValue { .. } => -302,
            TableError::InvalidFieldDef(_) => -305,
            TableError::Io(_) => -212,
        }
    }
}

/// Result type for table operations.
pub type TableResult<T> = Result<T, TableError>;
