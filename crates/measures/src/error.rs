//! Error types for the measures crate.
//!
//! [`MeasureError`] is structural: a catalogue that produces one is never
//! evaluated. [`EvaluationError`] belongs to a single patient and leaves the
//! rest of the batch untouched.

use pipeline::CriteriaError;
use records::PatientId;
use thiserror::Error;

/// Errors raised while loading and compiling a measure catalogue
#[derive(Error, Debug)]
pub enum MeasureError {
    #[error("Failed to read measure catalogue {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse measure catalogue: {0}")]
    Syntax(#[from] toml::de::Error),

    /// A criterion that does not compile (codes, arguments or value range)
    #[error("Measure {measure}, criterion {criterion}: {source}")]
    Criterion {
        measure: String,
        criterion: String,
        #[source]
        source: CriteriaError,
    },

    /// A predicate names a criterion the measure does not define
    #[error("Measure {measure} refers to unknown criterion {criterion:?}")]
    UnknownCriterion { measure: String, criterion: String },

    #[error("Measure {measure} has an empty {operator:?} predicate")]
    EmptyPredicate { measure: String, operator: String },

    #[error("Measure {measure}: {field} {value:?} is invalid")]
    InvalidField {
        measure: String,
        field: String,
        value: String,
    },

    #[error("Measure {measure}: age minimum {min} is greater than maximum {max}")]
    InvalidAgeRange { measure: String, min: u32, max: u32 },

    #[error("Measure {measure} uses unknown provider group {group:?}")]
    UnknownProviderGroup { measure: String, group: String },

    #[error("Measure id {id:?} is defined more than once")]
    DuplicateMeasure { id: String },

    #[error("No measure with id {id:?} in the catalogue")]
    UnknownMeasure { id: String },
}

/// Why a single patient could not be evaluated
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("Patient {patient} has no birthdate but the measure checks age")]
    MissingBirthdate { patient: PatientId },

    #[error("Patient {patient} has no primary care provider")]
    MissingProvider { patient: PatientId },
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, MeasureError>;
