//! Core traits for the filtering pipeline.
//!
//! This module defines the EntryFilter trait that allows composable,
//! extensible filters to be applied to entry collections.

use crate::report::QualityReport;
use chrono::NaiveDate;
use records::EntryCollection;

/// Per-evaluation inputs shared by every filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterContext {
    /// Date relative bounds and medication activity are judged against
    pub as_of: NaiveDate,
}

impl FilterContext {
    pub fn new(as_of: NaiveDate) -> Self {
        Self { as_of }
    }
}

/// Core trait for filtering entries.
///
/// ## Design Note
/// - `Send + Sync` allows a compiled measure to be shared across Rayon workers
/// - Filters take ownership of the collection and return the survivors;
///   the entries themselves stay borrowed from the patient record
/// - Entries that cannot be judged are dropped and reported, never fatal
pub trait EntryFilter: Send + Sync {
    /// Returns the name of this filter (for logging/debugging)
    fn name(&self) -> &str;

    /// Apply this filter to a collection.
    ///
    /// # Arguments
    /// * `entries` - The entries to filter (takes ownership)
    /// * `context` - Evaluation date
    /// * `report` - Receives data-quality warnings for skipped entries
    fn apply<'a>(
        &self,
        entries: EntryCollection<'a>,
        context: &FilterContext,
        report: &mut QualityReport,
    ) -> EntryCollection<'a>;
}
