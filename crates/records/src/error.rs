//! Error types for the records crate.
//!
//! Loading errors come in two flavours:
//! - file-level problems (I/O, duplicate patients) abort the load
//! - line-level problems (bad JSON, bad field values) are captured as
//!   [`crate::index::RejectedRecord`]s so one broken document never sinks a batch

use thiserror::Error;

/// Errors that can occur while loading or reading patient records
#[derive(Error, Debug)]
pub enum DataLoadError {
    /// File could not be found or opened
    #[error("Failed to open file: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A line of the patient file couldn't be parsed
    #[error("Parse error at line {line} in {file}: {reason}")]
    ParseError {
        file: String,
        line: usize,
        reason: String,
    },

    /// A data field had an invalid value
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    /// A field needed for evaluation is absent from the record
    #[error("Patient {patient} is missing {field}")]
    MissingField { patient: String, field: String },

    /// Two documents share the same patient id
    #[error("Duplicate patient id {id} (lines {first_line} and {second_line})")]
    DuplicatePatient {
        id: String,
        first_line: usize,
        second_line: usize,
    },
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, DataLoadError>;
