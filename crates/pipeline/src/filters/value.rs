//! Filter entries by their first recorded scalar.

use crate::bounds::{BoundaryPolicy, ValueRange};
use crate::report::{first_scalar, QualityReport};
use crate::traits::{EntryFilter, FilterContext};
use records::EntryCollection;
use tracing::debug;

/// Keep entries whose first scalar lies in `range`.
///
/// Entries without a usable scalar are dropped and reported; the rest of the
/// collection is still filtered.
pub fn filter_by_range<'a>(
    entries: EntryCollection<'a>,
    range: &ValueRange,
    report: &mut QualityReport,
) -> EntryCollection<'a> {
    entries.retain_where(|entry| match first_scalar(entry) {
        Ok(scalar) => range.contains(scalar),
        Err(warning) => {
            debug!("Skipping entry in value filter: {}", warning);
            report.push(warning);
            false
        }
    })
}

/// [`filter_by_range`] with the bounds spelled out.
pub fn filter_by_value<'a>(
    entries: EntryCollection<'a>,
    min: Option<f64>,
    max: Option<f64>,
    policy: BoundaryPolicy,
    report: &mut QualityReport,
) -> EntryCollection<'a> {
    let range = ValueRange { min, max, policy };
    filter_by_range(entries, &range, report)
}

/// Restricts entries to a scalar range.
///
/// The boundary policy travels with the range, so two measures can compare
/// the same kind of lab value inclusively and exclusively.
pub struct ValueFilter {
    range: ValueRange,
}

impl ValueFilter {
    pub fn new(range: ValueRange) -> Self {
        Self { range }
    }
}

impl EntryFilter for ValueFilter {
    fn name(&self) -> &str {
        "ValueFilter"
    }

    fn apply<'a>(
        &self,
        entries: EntryCollection<'a>,
        _context: &FilterContext,
        report: &mut QualityReport,
    ) -> EntryCollection<'a> {
        filter_by_range(entries, &self.range, report)
    }
}
