//! Parser for patient documents.
//!
//! Patients arrive as JSON Lines, one document per line:
//!
//! ```text
//! {"id":"p1","primary_care_provider_id":"cpsid-1","birthdate":"1950-02-01",
//!  "conditions":[{"codes":{"ICD9":["250.00"]},"date":"2019-04-01"}],
//!  "medications":[], "results":[], "vital_signs":[]}
//! ```
//!
//! Each line parses independently; the caller decides what to do with the
//! lines that fail.

use crate::error::{DataLoadError, Result};
use crate::types::*;
use chrono::{DateTime, NaiveDate};
use rayon::prelude::*;
use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct PatientDocument {
    #[serde(alias = "_id")]
    id: Option<String>,
    #[serde(alias = "provider_id")]
    primary_care_provider_id: Option<String>,
    birthdate: Option<String>,
    gender: Option<String>,
    #[serde(default)]
    conditions: Vec<EntryDocument>,
    #[serde(default)]
    medications: Vec<EntryDocument>,
    #[serde(default)]
    results: Vec<EntryDocument>,
    #[serde(default, alias = "vitalSigns")]
    vital_signs: Vec<EntryDocument>,
}

#[derive(Debug, Deserialize)]
struct EntryDocument {
    id: Option<String>,
    #[serde(default)]
    codes: CodeMap,
    date: Option<String>,
    start_date: Option<String>,
    stop_date: Option<String>,
    #[serde(default)]
    values: Vec<ValueDocument>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ValueDocument {
    #[serde(default, deserialize_with = "lenient_scalar")]
    scalar: Option<f64>,
    units: Option<String>,
}

/// Accept numbers and numeric strings; anything else becomes `None`.
fn lenient_scalar<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Parse a date field.
///
/// Accepts a plain `YYYY-MM-DD` date or an RFC 3339 timestamp (the date part
/// is kept).
pub fn parse_date(field: &str, raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|timestamp| timestamp.date_naive())
        .map_err(|_| DataLoadError::InvalidValue {
            field: field.to_string(),
            value: raw.to_string(),
        })
}

fn parse_optional_date(field: &str, raw: Option<&str>) -> Result<Option<NaiveDate>> {
    raw.map(|s| parse_date(field, s)).transpose()
}

fn convert_entries(category: EntryCategory, documents: Vec<EntryDocument>) -> Result<Vec<Entry>> {
    documents
        .into_iter()
        .map(|doc| {
            Ok(Entry {
                id: doc.id,
                category,
                codes: doc.codes,
                date: parse_optional_date("date", doc.date.as_deref())?,
                start_date: parse_optional_date("start_date", doc.start_date.as_deref())?,
                stop_date: parse_optional_date("stop_date", doc.stop_date.as_deref())?,
                values: doc
                    .values
                    .into_iter()
                    .map(|v| Value {
                        scalar: v.scalar,
                        units: v.units,
                    })
                    .collect(),
                description: doc.description,
            })
        })
        .collect()
}

/// Parse a single patient document.
pub fn parse_patient(json: &str) -> Result<PatientRecord> {
    let doc: PatientDocument =
        serde_json::from_str(json).map_err(|e| DataLoadError::InvalidValue {
            field: "document".to_string(),
            value: e.to_string(),
        })?;

    let id = doc
        .id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| DataLoadError::InvalidValue {
            field: "id".to_string(),
            value: "<missing>".to_string(),
        })?;

    Ok(PatientRecord {
        birthdate: parse_optional_date("birthdate", doc.birthdate.as_deref())?,
        provider_id: doc.primary_care_provider_id,
        gender: doc.gender,
        conditions: convert_entries(EntryCategory::Condition, doc.conditions)?,
        medications: convert_entries(EntryCategory::Medication, doc.medications)?,
        results: convert_entries(EntryCategory::Result, doc.results)?,
        vital_signs: convert_entries(EntryCategory::VitalSign, doc.vital_signs)?,
        id,
    })
}

/// Parse a JSON Lines patient file.
///
/// Returns one `(line_number, outcome)` per non-blank line, in file order.
/// Lines are parsed in parallel with Rayon.
pub fn parse_patients(path: &Path) -> Result<Vec<(usize, Result<PatientRecord>)>> {
    if !path.exists() {
        return Err(DataLoadError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let content = fs::read_to_string(path)?;
    let file = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let lines: Vec<(usize, &str)> = content
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .collect();

    let parsed = lines
        .par_iter()
        .map(|&(line_no, line)| {
            let outcome = parse_patient(line).map_err(|e| DataLoadError::ParseError {
                file: file.clone(),
                line: line_no,
                reason: e.to_string(),
            });
            (line_no, outcome)
        })
        .collect();

    Ok(parsed)
}
