//! Keep only medications considered in effect on the evaluation date.
//!
//! An order is in effect from its start until its nominal stop plus a 20%
//! grace extension of the full ordered duration, which absorbs refill lag:
//!
//! ```text
//! end = start + 1.2 * (stop - start)
//! ```

use crate::report::{DataQualityWarning, QualityReport, WarningKind};
use crate::traits::{EntryFilter, FilterContext};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use records::{Entry, EntryCollection};
use tracing::debug;

/// The padded in-effect interval of a medication order, at millisecond
/// resolution from midnight of each date.
pub fn active_interval(entry: &Entry) -> Result<(NaiveDateTime, NaiveDateTime), DataQualityWarning> {
    let (Some(start), Some(stop)) = (entry.start_date, entry.stop_date) else {
        return Err(DataQualityWarning::new(entry, WarningKind::MissingMedicationDates));
    };
    let start = start.and_time(NaiveTime::MIN);
    let stop = stop.and_time(NaiveTime::MIN);
    // 1.2x in integer milliseconds keeps whole-day orders exact
    let end = stop
        .signed_duration_since(start)
        .num_milliseconds()
        .checked_mul(6)
        .and_then(|ms| Duration::try_milliseconds(ms / 5))
        .and_then(|padding| start.checked_add_signed(padding))
        .ok_or_else(|| DataQualityWarning::new(entry, WarningKind::InvalidMedicationDates))?;
    Ok((start, end))
}

/// Keep the orders whose padded interval contains `as_of`.
pub fn filter_active<'a>(
    entries: EntryCollection<'a>,
    as_of: NaiveDate,
    report: &mut QualityReport,
) -> EntryCollection<'a> {
    let now = as_of.and_time(NaiveTime::MIN);
    entries.retain_where(|entry| match active_interval(entry) {
        Ok((start, end)) => start <= now && now <= end,
        Err(warning) => {
            debug!("Skipping entry in active medication filter: {}", warning);
            report.push(warning);
            false
        }
    })
}

/// Retains medication orders active on the evaluation date.
pub struct ActiveMedicationFilter;

impl EntryFilter for ActiveMedicationFilter {
    fn name(&self) -> &str {
        "ActiveMedicationFilter"
    }

    fn apply<'a>(
        &self,
        entries: EntryCollection<'a>,
        context: &FilterContext,
        report: &mut QualityReport,
    ) -> EntryCollection<'a> {
        filter_active(entries, context.as_of, report)
    }
}
