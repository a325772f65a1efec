//! Run report: what happened to every patient, apart from the emissions.

use chrono::NaiveDate;
use measures::EvaluationError;
use pipeline::DataQualityWarning;
use records::PatientId;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

/// A patient that could not be evaluated for a measure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientFailure {
    pub measure_id: String,
    pub patient_id: PatientId,
    pub reason: String,
}

/// An entry skipped while evaluating a patient
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientWarning {
    pub measure_id: String,
    pub patient_id: PatientId,
    pub warning: DataQualityWarning,
}

/// Per-measure tallies.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MeasureSummary {
    pub measure_id: String,
    pub evaluated_on: Option<NaiveDate>,
    pub evaluated: usize,
    pub excluded: usize,
    pub failed: usize,
    pub warnings: usize,
    pub emissions: usize,
    #[serde(skip)]
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub run_as_of: Option<NaiveDate>,
    /// Malformed input lines dropped while loading patients
    pub rejected_records: usize,
    pub measures: Vec<MeasureSummary>,
    pub failures: Vec<PatientFailure>,
    pub warnings: Vec<PatientWarning>,
}

impl RunReport {
    pub fn new(run_as_of: NaiveDate, rejected_records: usize) -> Self {
        Self {
            run_as_of: Some(run_as_of),
            rejected_records,
            ..Self::default()
        }
    }

    pub fn record_failure(&mut self, measure_id: &str, error: &EvaluationError) {
        let patient_id = match error {
            EvaluationError::MissingBirthdate { patient } | EvaluationError::MissingProvider { patient } => {
                patient.clone()
            }
        };
        self.failures.push(PatientFailure {
            measure_id: measure_id.to_string(),
            patient_id,
            reason: error.to_string(),
        });
    }

    pub fn record_warnings(&mut self, measure_id: &str, patient_id: &str, warnings: Vec<DataQualityWarning>) {
        self.warnings.extend(warnings.into_iter().map(|warning| PatientWarning {
            measure_id: measure_id.to_string(),
            patient_id: patient_id.to_string(),
            warning,
        }));
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn total_emissions(&self) -> usize {
        self.measures.iter().map(|m| m.emissions).sum()
    }

    /// Log one line per measure plus totals.
    pub fn log_summary(&self) {
        for summary in &self.measures {
            info!(
                "Measure {}: evaluated={} excluded={} failed={} warnings={} emissions={} ({:.2?})",
                summary.measure_id,
                summary.evaluated,
                summary.excluded,
                summary.failed,
                summary.warnings,
                summary.emissions,
                summary.elapsed
            );
        }
        if self.rejected_records > 0 {
            warn!("{} patient records were rejected while loading", self.rejected_records);
        }
        if self.has_failures() {
            warn!("{} patient evaluations failed", self.failures.len());
        }
    }
}
