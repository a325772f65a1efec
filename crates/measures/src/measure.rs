//! Compiled, ready-to-evaluate measures.
//!
//! A [`Measure`] owns one [`FilterPipeline`] per named criterion and refers to
//! criteria by index from its predicate trees, so evaluation never looks a
//! name up or re-parses anything.

use crate::emission::EmitFormat;
use chrono::NaiveDate;
use pipeline::{BoundaryPolicy, Criterion, FilterContext, FilterPipeline, QualityReport};
use records::{EntryCategory, EntryCollection, PatientRecord};
use std::fmt;

/// Inclusive age range in whole years; either end may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AgeRange {
    pub min: Option<u32>,
    pub max: Option<u32>,
}

impl AgeRange {
    pub fn new(min: Option<u32>, max: Option<u32>) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, age: u32) -> bool {
        self.min.is_none_or(|min| min <= age) && self.max.is_none_or(|max| age <= max)
    }
}

impl fmt::Display for AgeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            (Some(min), Some(max)) => write!(f, "{}-{}", min, max),
            (Some(min), None) => write!(f, "{}+", min),
            (None, Some(max)) => write!(f, "up to {}", max),
            (None, None) => f.write_str("any"),
        }
    }
}

/// One named criterion and the pipeline it compiled to.
pub struct CompiledCriterion {
    pub name: String,
    pub category: EntryCategory,
    pub criterion: Criterion,
    pub boundary: BoundaryPolicy,
    pub active: bool,
    pub description: Option<String>,
    pipeline: FilterPipeline,
}

impl CompiledCriterion {
    pub fn new(
        name: impl Into<String>,
        category: EntryCategory,
        criterion: Criterion,
        boundary: BoundaryPolicy,
        active: bool,
        pipeline: FilterPipeline,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            criterion,
            boundary,
            active,
            description: None,
            pipeline,
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// The patient's entries of this criterion's category that pass it.
    pub fn select<'a>(
        &self,
        patient: &'a PatientRecord,
        context: &FilterContext,
        report: &mut QualityReport,
    ) -> EntryCollection<'a> {
        self.pipeline.apply(patient.entries(self.category), context, report)
    }
}

impl fmt::Debug for CompiledCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledCriterion")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("criterion", &self.criterion)
            .field("boundary", &self.boundary)
            .field("active", &self.active)
            .field("filters", &self.pipeline.filter_names())
            .finish()
    }
}

/// Boolean tree over a measure's criteria, by index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Has(usize),
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
    Not(Box<Predicate>),
    AtLeast { criterion: usize, count: usize },
}

#[derive(Debug)]
pub struct Measure {
    pub id: String,
    pub title: Option<String>,
    pub boundary: BoundaryPolicy,
    pub emit_as: EmitFormat,
    pub provider_group: Option<String>,
    /// Pinned evaluation date; the run date is used when absent
    pub reference_date: Option<NaiveDate>,
    pub age: Option<AgeRange>,
    pub criteria: Vec<CompiledCriterion>,
    /// `None` means the age check alone decides the denominator
    pub denominator: Option<Predicate>,
    pub numerator: Predicate,
}

impl Measure {
    /// The date this measure is evaluated as of, given the run date.
    pub fn evaluation_date(&self, run_as_of: NaiveDate) -> NaiveDate {
        self.reference_date.unwrap_or(run_as_of)
    }

    pub fn criterion(&self, name: &str) -> Option<&CompiledCriterion> {
        self.criteria.iter().find(|c| c.name == name)
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }
}
