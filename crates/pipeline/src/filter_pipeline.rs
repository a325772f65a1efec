//! The FilterPipeline orchestrates multiple filters.
//!
//! This module provides the main FilterPipeline struct that chains
//! multiple filters together using the builder pattern, and the standard
//! pipeline a criterion compiles to.

use crate::bounds::BoundaryPolicy;
use crate::code_set::CodeMatcher;
use crate::criterion::Criterion;
use crate::error::Result;
use crate::filters::{ActiveMedicationFilter, CodeFilter, TemporalFilter, ValueFilter};
use crate::report::QualityReport;
use crate::traits::{EntryFilter, FilterContext};
use records::EntryCollection;
use tracing;

/// Chains multiple filters together into a processing pipeline.
///
/// ## Usage
/// ```ignore
/// let pipeline = FilterPipeline::new()
///     .add_filter(CodeFilter::new(matcher))
///     .add_filter(TemporalFilter::new(window))
///     .add_filter(ActiveMedicationFilter);
///
/// let kept = pipeline.apply(patient.medications(), &context, &mut report);
/// ```
pub struct FilterPipeline {
    filters: Vec<Box<dyn EntryFilter>>,
}

impl FilterPipeline {
    /// Create a new empty FilterPipeline.
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Add a filter to the pipeline (builder pattern).
    pub fn add_filter(mut self, filter: impl EntryFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// The standard pipeline for one criterion.
    ///
    /// ## Order
    /// 1. Code set
    /// 2. Date window (skipped when unbounded)
    /// 3. Value range (only when the criterion gives a minimum)
    /// 4. Active on the evaluation date (only when `active`)
    ///
    /// Fails when the criterion's value bounds are inverted.
    pub fn from_criterion(
        matcher: CodeMatcher,
        criterion: &Criterion,
        policy: BoundaryPolicy,
        active: bool,
    ) -> Result<Self> {
        let mut pipeline = Self::new().add_filter(CodeFilter::new(matcher));

        let window = criterion.window();
        if !window.is_unbounded() {
            pipeline = pipeline.add_filter(TemporalFilter::new(window));
        }
        if let Some(range) = criterion.value_range(policy)? {
            pipeline = pipeline.add_filter(ValueFilter::new(range));
        }
        if active {
            pipeline = pipeline.add_filter(ActiveMedicationFilter);
        }
        Ok(pipeline)
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Filter names in application order.
    pub fn filter_names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Apply all filters in sequence.
    ///
    /// ## Algorithm
    /// 1. Start with the input entries
    /// 2. For each filter in order:
    ///    a. Log filter name and input count
    ///    b. Apply the filter
    ///    c. Log output count
    /// 3. Return the surviving entries
    ///
    /// Stops early once nothing is left; later filters could only warn about
    /// entries that are already gone.
    pub fn apply<'a>(
        &self,
        entries: EntryCollection<'a>,
        context: &FilterContext,
        report: &mut QualityReport,
    ) -> EntryCollection<'a> {
        let mut current = entries;
        for filter in &self.filters {
            if current.is_empty() {
                break;
            }
            tracing::debug!(
                "Applying filter: {} (input count: {})",
                filter.name(),
                current.len()
            );
            current = filter.apply(current, context, report);
            tracing::debug!(
                "Filter applied: {} (output count: {})",
                filter.name(),
                current.len()
            );
        }
        current
    }
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self::new()
    }
}
