//! PatientIndex building and lookups.
//!
//! The index owns every successfully parsed patient record, keeps the lines
//! that failed to parse for operator visibility, and offers lookups by
//! patient id and by provider.

use crate::error::{DataLoadError, Result};
use crate::parser;
use crate::types::*;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// A line of the input that could not become a patient record.
#[derive(Debug)]
pub struct RejectedRecord {
    pub line: usize,
    pub error: DataLoadError,
}

/// In-memory store of patient records.
#[derive(Debug, Default)]
pub struct PatientIndex {
    patients: Vec<PatientRecord>,
    /// Source line of each patient, parallel to `patients`
    lines: Vec<usize>,
    by_id: HashMap<PatientId, usize>,
    by_provider: HashMap<ProviderId, Vec<usize>>,
    rejected: Vec<RejectedRecord>,
}

impl PatientIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON Lines patient file.
    ///
    /// Steps:
    /// 1. Parse every line (in parallel)
    /// 2. Insert the good records, keep the bad lines as rejections
    /// 3. Validate (duplicate patient ids abort the load)
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading patient records from {:?}", path);

        let parsed = parser::parse_patients(path)?;

        let mut index = PatientIndex::new();
        for (line, outcome) in parsed {
            match outcome {
                Ok(patient) => index.insert_at_line(patient, line),
                Err(error) => {
                    warn!("Rejected patient document: {}", error);
                    index.rejected.push(RejectedRecord { line, error });
                }
            }
        }

        index.validate()?;

        info!(
            "Loaded {} patients ({} rejected lines)",
            index.patients.len(),
            index.rejected.len()
        );
        Ok(index)
    }

    /// Insert a record built in memory.
    pub fn insert_patient(&mut self, patient: PatientRecord) {
        let line = self.patients.len() + 1;
        self.insert_at_line(patient, line);
    }

    fn insert_at_line(&mut self, patient: PatientRecord, line: usize) {
        let position = self.patients.len();
        // Keep the first position for lookups; validate() reports the clash
        self.by_id.entry(patient.id.clone()).or_insert(position);
        if let Some(provider) = &patient.provider_id {
            self.by_provider
                .entry(provider.clone())
                .or_insert_with(Vec::new)
                .push(position);
        }
        self.patients.push(patient);
        self.lines.push(line);
    }

    /// Check that every patient id is unique.
    pub fn validate(&self) -> Result<()> {
        for (position, patient) in self.patients.iter().enumerate() {
            if let Some(&first) = self.by_id.get(&patient.id) {
                if first != position {
                    return Err(DataLoadError::DuplicatePatient {
                        id: patient.id.clone(),
                        first_line: self.lines[first],
                        second_line: self.lines[position],
                    });
                }
            }
        }
        Ok(())
    }

    pub fn get_patient(&self, id: &str) -> Option<&PatientRecord> {
        self.by_id.get(id).map(|&position| &self.patients[position])
    }

    /// All patients in load order
    pub fn patients(&self) -> &[PatientRecord] {
        &self.patients
    }

    pub fn patients_for_provider<'a>(
        &'a self,
        provider: &str,
    ) -> impl Iterator<Item = &'a PatientRecord> + 'a {
        self.by_provider
            .get(provider)
            .map(|positions| positions.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(move |&position| &self.patients[position])
    }

    /// Distinct provider ids, sorted
    pub fn provider_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.by_provider.keys().map(|id| id.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn rejected(&self) -> &[RejectedRecord] {
        &self.rejected
    }

    /// (patients, entries, rejected lines)
    pub fn counts(&self) -> (usize, usize, usize) {
        let entries = self.patients.iter().map(|p| p.entry_count()).sum();
        (self.patients.len(), entries, self.rejected.len())
    }
}
