//! Batch runner for quality measures.
//!
//! This crate contains the orchestrator that evaluates a measure catalogue
//! over a patient index, the upstream provider filter, and the run report.

pub mod orchestrator;
pub mod provider_filter;
pub mod report;

pub use orchestrator::{MeasureRun, MeasureRunner, PatientOutcome, evaluate_measure, evaluate_patient};
pub use provider_filter::ProviderFilter;
pub use report::{MeasureSummary, PatientFailure, PatientWarning, RunReport};
