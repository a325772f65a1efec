//! Filter entries by code-set membership.
//!
//! Usually the first filter of a criterion pipeline: everything after it only
//! looks at entries that carry one of the measure's codes.

use crate::code_set::CodeMatcher;
use crate::report::QualityReport;
use crate::traits::{EntryFilter, FilterContext};
use records::EntryCollection;

/// Keep the entries `matcher` accepts, in their original order.
pub fn filter_by_code<'a>(entries: EntryCollection<'a>, matcher: &CodeMatcher) -> EntryCollection<'a> {
    entries.retain_where(|entry| matcher.matches(entry))
}

/// Keeps entries whose codes intersect a compiled code set.
///
/// ## Algorithm
/// For each entry, for each code system known to both sides, test the
/// entry's codes against the set (exact/prefix or anchored regex, decided
/// when the matcher was compiled).
pub struct CodeFilter {
    matcher: CodeMatcher,
}

impl CodeFilter {
    pub fn new(matcher: CodeMatcher) -> Self {
        Self { matcher }
    }
}

impl EntryFilter for CodeFilter {
    fn name(&self) -> &str {
        "CodeFilter"
    }

    fn apply<'a>(
        &self,
        entries: EntryCollection<'a>,
        _context: &FilterContext,
        _report: &mut QualityReport,
    ) -> EntryCollection<'a> {
        filter_by_code(entries, &self.matcher)
    }
}
