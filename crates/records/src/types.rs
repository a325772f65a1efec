//! Core domain types for patient records.
//!
//! A patient record is a bag of coded clinical entries, split by category,
//! plus the handful of demographic fields a measure needs (birthdate for age
//! checks, primary care provider for emission keys).

use crate::collection::EntryCollection;
use crate::error::{DataLoadError, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// Type Aliases
// =============================================================================

/// Unique identifier for a patient document
pub type PatientId = String;

/// Identifier of the clinician/practice that emissions are grouped by
pub type ProviderId = String;

/// Code-system name (e.g. "LOINC", "ICD9", "whoATC") to the entry's codes in it
pub type CodeMap = BTreeMap<String, Vec<String>>;

// =============================================================================
// Entry Types
// =============================================================================

/// Clinical category of an entry.
///
/// The category decides how codes are matched: conditions use anchored
/// regular expressions, everything else uses exact/prefix matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryCategory {
    Condition,
    Medication,
    Result,
    VitalSign,
}

impl EntryCategory {
    pub const ALL: [EntryCategory; 4] = [
        EntryCategory::Condition,
        EntryCategory::Medication,
        EntryCategory::Result,
        EntryCategory::VitalSign,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryCategory::Condition => "condition",
            EntryCategory::Medication => "medication",
            EntryCategory::Result => "result",
            EntryCategory::VitalSign => "vital_sign",
        }
    }
}

impl fmt::Display for EntryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded measurement attached to an entry.
///
/// `scalar` is `None` when the source document carried something that is not
/// a number (e.g. "positive"); the value filter reports those as data-quality
/// warnings instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Value {
    pub scalar: Option<f64>,
    pub units: Option<String>,
}

impl Value {
    pub fn new(scalar: f64, units: impl Into<String>) -> Self {
        Self {
            scalar: Some(scalar),
            units: Some(units.into()),
        }
    }
}

/// One clinical fact: a condition, medication order, lab result or vital sign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: Option<String>,
    pub category: EntryCategory,
    pub codes: CodeMap,
    /// Effective date (conditions, results, vital signs)
    pub date: Option<NaiveDate>,
    /// Order start (medications)
    pub start_date: Option<NaiveDate>,
    /// Nominal order stop (medications)
    pub stop_date: Option<NaiveDate>,
    pub values: Vec<Value>,
    pub description: Option<String>,
}

impl Entry {
    /// Create an entry with no codes, dates or values.
    pub fn new(category: EntryCategory) -> Self {
        Self {
            id: None,
            category,
            codes: CodeMap::new(),
            date: None,
            start_date: None,
            stop_date: None,
            values: Vec::new(),
            description: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_code(mut self, system: impl Into<String>, code: impl Into<String>) -> Self {
        self.codes.entry(system.into()).or_default().push(code.into());
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_period(mut self, start: NaiveDate, stop: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.stop_date = Some(stop);
        self
    }

    pub fn with_value(mut self, scalar: f64, units: impl Into<String>) -> Self {
        self.values.push(Value::new(scalar, units));
        self
    }

    /// Codes recorded under `system`, empty if the entry has none.
    pub fn codes_for(&self, system: &str) -> &[String] {
        self.codes.get(system).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// The date temporal filters compare against.
    ///
    /// Medications are dated by their order start; a medication without one
    /// falls back to its effective date.
    pub fn relevant_date(&self) -> Option<NaiveDate> {
        match self.category {
            EntryCategory::Medication => self.start_date.or(self.date),
            _ => self.date,
        }
    }

    /// First recorded value, if any
    pub fn first_value(&self) -> Option<&Value> {
        self.values.first()
    }

    /// Short human-readable handle for diagnostics.
    pub fn label(&self) -> String {
        if let Some(id) = &self.id {
            return id.clone();
        }
        if let Some(description) = &self.description {
            return description.clone();
        }
        self.codes
            .iter()
            .find_map(|(system, codes)| codes.first().map(|code| format!("{}:{}", system, code)))
            .unwrap_or_else(|| format!("<uncoded {}>", self.category))
    }
}

// =============================================================================
// Patient Record
// =============================================================================

/// Everything the engine knows about one patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: PatientId,
    pub provider_id: Option<ProviderId>,
    pub birthdate: Option<NaiveDate>,
    pub gender: Option<String>,
    pub conditions: Vec<Entry>,
    pub medications: Vec<Entry>,
    pub results: Vec<Entry>,
    pub vital_signs: Vec<Entry>,
}

impl PatientRecord {
    /// Create an empty record for `id`.
    pub fn new(id: impl Into<PatientId>) -> Self {
        Self {
            id: id.into(),
            provider_id: None,
            birthdate: None,
            gender: None,
            conditions: Vec::new(),
            medications: Vec::new(),
            results: Vec::new(),
            vital_signs: Vec::new(),
        }
    }

    pub fn with_provider(mut self, provider_id: impl Into<ProviderId>) -> Self {
        self.provider_id = Some(provider_id.into());
        self
    }

    pub fn with_birthdate(mut self, birthdate: NaiveDate) -> Self {
        self.birthdate = Some(birthdate);
        self
    }

    /// Append an entry to the list matching its category.
    pub fn push_entry(&mut self, entry: Entry) {
        self.entries_mut(entry.category).push(entry);
    }

    pub fn with_entry(mut self, entry: Entry) -> Self {
        self.push_entry(entry);
        self
    }

    fn entries_mut(&mut self, category: EntryCategory) -> &mut Vec<Entry> {
        match category {
            EntryCategory::Condition => &mut self.conditions,
            EntryCategory::Medication => &mut self.medications,
            EntryCategory::Result => &mut self.results,
            EntryCategory::VitalSign => &mut self.vital_signs,
        }
    }

    /// Raw entries for a category
    pub fn entries_slice(&self, category: EntryCategory) -> &[Entry] {
        match category {
            EntryCategory::Condition => &self.conditions,
            EntryCategory::Medication => &self.medications,
            EntryCategory::Result => &self.results,
            EntryCategory::VitalSign => &self.vital_signs,
        }
    }

    /// Entry collection for a category, borrowing from this record.
    pub fn entries(&self, category: EntryCategory) -> EntryCollection<'_> {
        EntryCollection::from_slice(category, self.entries_slice(category))
    }

    pub fn conditions(&self) -> EntryCollection<'_> {
        self.entries(EntryCategory::Condition)
    }

    pub fn medications(&self) -> EntryCollection<'_> {
        self.entries(EntryCategory::Medication)
    }

    pub fn results(&self) -> EntryCollection<'_> {
        self.entries(EntryCategory::Result)
    }

    pub fn vital_signs(&self) -> EntryCollection<'_> {
        self.entries(EntryCategory::VitalSign)
    }

    /// Age in whole years on `date`.
    ///
    /// Returns `None` when the birthdate is unknown or after `date`.
    pub fn age_on(&self, date: NaiveDate) -> Option<u32> {
        let birthdate = self.birthdate?;
        if date < birthdate {
            return None;
        }
        let mut years = date.year() - birthdate.year();
        if (date.month(), date.day()) < (birthdate.month(), birthdate.day()) {
            years -= 1;
        }
        u32::try_from(years).ok()
    }

    /// Like [`age_on`](Self::age_on) but reports the missing field as an error.
    pub fn require_age_on(&self, date: NaiveDate) -> Result<u32> {
        self.age_on(date).ok_or_else(|| DataLoadError::MissingField {
            patient: self.id.clone(),
            field: "birthdate".to_string(),
        })
    }

    /// Provider id used for emission keys.
    pub fn require_provider(&self) -> Result<&str> {
        match self.provider_id.as_deref() {
            Some(id) if !id.trim().is_empty() => Ok(id),
            _ => Err(DataLoadError::MissingField {
                patient: self.id.clone(),
                field: "primary_care_provider_id".to_string(),
            }),
        }
    }

    /// Total number of entries across all categories
    pub fn entry_count(&self) -> usize {
        EntryCategory::ALL
            .iter()
            .map(|&category| self.entries_slice(category).len())
            .sum()
    }
}
