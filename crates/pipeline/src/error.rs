//! Errors raised while building criteria.
//!
//! Everything here is structural: it means a measure definition is broken,
//! so it surfaces when the definition is loaded, never per patient.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CriteriaError {
    /// Positional criterion arguments that match none of the supported shapes
    #[error("Ambiguous criterion arguments ({shape}); expected dates and numbers in a supported order")]
    AmbiguousParameterShape { shape: String },

    /// A condition pattern that is not a valid regular expression
    #[error("Invalid code pattern {pattern:?} for {system}: {source}")]
    InvalidPattern {
        system: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A code set with no systems, or a system with no codes
    #[error("Empty code set{}", .system.as_ref().map(|s| format!(" for {}", s)).unwrap_or_default())]
    EmptyCodeSet { system: Option<String> },

    #[error("Invalid date bound {value:?}: {reason}")]
    InvalidDateBound { value: String, reason: String },

    #[error("Invalid value range: min {min} is greater than max {max}")]
    InvertedRange { min: f64, max: f64 },
}

pub type Result<T> = std::result::Result<T, CriteriaError>;
