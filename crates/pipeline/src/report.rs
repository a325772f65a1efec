//! Data-quality diagnostics gathered while filtering.
//!
//! Filters never fail on messy data. An entry that cannot be judged is
//! skipped and a [`DataQualityWarning`] is pushed onto the caller's
//! [`QualityReport`], which stays separate from measure output.

use records::{Entry, EntryCategory};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Value filtering needed a scalar but the entry has no values
    MissingValue,
    /// The first value is present but not numeric
    NonNumericValue,
    /// Active-medication filtering needs both order dates
    MissingMedicationDates,
    /// The padded order interval falls outside the representable date range
    InvalidMedicationDates,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            WarningKind::MissingValue => "values key is missing",
            WarningKind::NonNumericValue => "first value is not numeric",
            WarningKind::MissingMedicationDates => "medication start/stop date is missing",
            WarningKind::InvalidMedicationDates => "medication order interval is out of range",
        };
        f.write_str(text)
    }
}

/// One skipped entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataQualityWarning {
    pub entry: String,
    pub category: EntryCategory,
    pub kind: WarningKind,
}

impl DataQualityWarning {
    pub fn new(entry: &Entry, kind: WarningKind) -> Self {
        Self {
            entry: entry.label(),
            category: entry.category,
            kind,
        }
    }
}

impl fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.category, self.entry, self.kind)
    }
}

/// The scalar a value filter compares, or why there is none.
pub fn first_scalar(entry: &Entry) -> Result<f64, DataQualityWarning> {
    let value = entry
        .first_value()
        .ok_or_else(|| DataQualityWarning::new(entry, WarningKind::MissingValue))?;
    value
        .scalar
        .filter(|x| x.is_finite())
        .ok_or_else(|| DataQualityWarning::new(entry, WarningKind::NonNumericValue))
}

/// Warnings collected over one or more filter runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QualityReport {
    warnings: Vec<DataQualityWarning>,
}

impl QualityReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, warning: DataQualityWarning) {
        self.warnings.push(warning);
    }

    pub fn extend(&mut self, other: QualityReport) {
        self.warnings.extend(other.warnings);
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn warnings(&self) -> &[DataQualityWarning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<DataQualityWarning> {
        self.warnings
    }
}
