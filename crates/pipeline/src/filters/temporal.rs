//! Filter entries to an inclusive date window.

use crate::bounds::DateWindow;
use crate::report::QualityReport;
use crate::traits::{EntryFilter, FilterContext};
use chrono::NaiveDate;
use records::EntryCollection;

/// Keep entries whose relevant date lies in `[start, end]`.
///
/// A missing bound is unbounded on that side. An entry without a relevant
/// date survives only when both bounds are missing.
pub fn filter_by_date<'a>(
    entries: EntryCollection<'a>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> EntryCollection<'a> {
    if start.is_none() && end.is_none() {
        return entries;
    }
    entries.retain_where(|entry| match entry.relevant_date() {
        Some(date) => start.is_none_or(|s| s <= date) && end.is_none_or(|e| date <= e),
        None => false,
    })
}

/// Restricts entries to a date window resolved against the evaluation date.
pub struct TemporalFilter {
    window: DateWindow,
}

impl TemporalFilter {
    pub fn new(window: DateWindow) -> Self {
        Self { window }
    }
}

impl EntryFilter for TemporalFilter {
    fn name(&self) -> &str {
        "TemporalFilter"
    }

    fn apply<'a>(
        &self,
        entries: EntryCollection<'a>,
        context: &FilterContext,
        _report: &mut QualityReport,
    ) -> EntryCollection<'a> {
        let (start, end) = self.window.resolve(context.as_of);
        filter_by_date(entries, start, end)
    }
}
