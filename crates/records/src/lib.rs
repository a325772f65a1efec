//! # Records Crate
//!
//! Patient records and the entry collections the measure engine filters.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (Entry, EntryCategory, Value, PatientRecord)
//! - **collection**: EntryCollection, the ordered per-category view filters work on
//! - **parser**: Parse JSON Lines patient documents
//! - **index**: PatientIndex, lookups by patient and provider
//! - **error**: Error types for record loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use records::PatientIndex;
//! use std::path::Path;
//!
//! let index = PatientIndex::load_from_file(Path::new("data/patients.jsonl"))?;
//!
//! let patient = index.get_patient("p1").unwrap();
//! let labs = patient.results();
//! println!("{} has {} lab results", patient.id, labs.len());
//! ```

pub mod collection;
pub mod error;
pub mod index;
pub mod parser;
pub mod types;

pub use collection::EntryCollection;
pub use error::{DataLoadError, Result};
pub use index::{PatientIndex, RejectedRecord};
pub use types::{
    // Type aliases
    CodeMap,
    PatientId,
    ProviderId,
    // Core types
    Entry,
    EntryCategory,
    PatientRecord,
    Value,
};
