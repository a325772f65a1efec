//! Date windows and value ranges.
//!
//! Both are built from optional bounds: a missing bound means "unbounded on
//! that side". Date bounds may be relative to the evaluation date so that a
//! measure defined once ("in the last two years") stays correct on every run.

use crate::error::{CriteriaError, Result};
use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Date bounds
// =============================================================================

/// A years/months/weeks/days span counted back from the evaluation date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Period {
    pub years: u32,
    pub months: u32,
    pub days: u32,
}

impl Period {
    pub fn years(years: u32) -> Self {
        Self { years, ..Self::default() }
    }

    pub fn months(months: u32) -> Self {
        Self { months, ..Self::default() }
    }

    pub fn days(days: u32) -> Self {
        Self { days, ..Self::default() }
    }

    /// Years and months as a month count, `None` if it does not fit.
    pub fn total_months(&self) -> Option<u32> {
        self.years.checked_mul(12)?.checked_add(self.months)
    }

    /// The date `self` before `date`.
    ///
    /// Month arithmetic clamps to the end of the month, so one year before
    /// 2024-02-29 is 2023-02-28.
    pub fn before(&self, date: NaiveDate) -> Option<NaiveDate> {
        date.checked_sub_months(Months::new(self.total_months()?))?
            .checked_sub_days(Days::new(u64::from(self.days)))
    }
}

impl FromStr for Period {
    type Err = CriteriaError;

    /// Parse `2y`, `6m`, `30d`, `2w` or combinations such as `1y6m`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| CriteriaError::InvalidDateBound {
            value: s.to_string(),
            reason: reason.to_string(),
        };

        let mut period = Period::default();
        let mut digits = String::new();
        let mut saw_unit = false;

        for ch in s.trim().chars() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                continue;
            }
            let amount: u32 = digits
                .parse()
                .map_err(|_| invalid("expected a number before each unit"))?;
            digits.clear();
            let too_long = || invalid("period is too long");
            match ch.to_ascii_lowercase() {
                'y' => period.years = period.years.checked_add(amount).ok_or_else(too_long)?,
                'm' => period.months = period.months.checked_add(amount).ok_or_else(too_long)?,
                'w' => {
                    let days = amount.checked_mul(7).ok_or_else(too_long)?;
                    period.days = period.days.checked_add(days).ok_or_else(too_long)?;
                }
                'd' => period.days = period.days.checked_add(amount).ok_or_else(too_long)?,
                _ => return Err(invalid("units must be y, m, w or d")),
            }
            saw_unit = true;
        }

        if !digits.is_empty() || !saw_unit {
            return Err(invalid("every number needs a unit (y, m, w or d)"));
        }
        if period.total_months().is_none() {
            return Err(invalid("period is too long"));
        }
        Ok(period)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.years > 0 {
            write!(f, "{}y", self.years)?;
        }
        if self.months > 0 {
            write!(f, "{}m", self.months)?;
        }
        if self.days > 0 || (self.years == 0 && self.months == 0) {
            write!(f, "{}d", self.days)?;
        }
        Ok(())
    }
}

/// One end of a date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBound {
    /// A fixed calendar date
    Absolute(NaiveDate),
    /// The evaluation date itself
    EvaluationDate,
    /// A period before the evaluation date
    Before(Period),
}

impl DateBound {
    /// Turn the bound into a calendar date for one evaluation.
    pub fn resolve(&self, as_of: NaiveDate) -> NaiveDate {
        match self {
            DateBound::Absolute(date) => *date,
            DateBound::EvaluationDate => as_of,
            DateBound::Before(period) => period.before(as_of).unwrap_or(NaiveDate::MIN),
        }
    }
}

impl FromStr for DateBound {
    type Err = CriteriaError;

    /// `now` (or `today`), `-<period>` such as `-2y`, or `YYYY-MM-DD`.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "now" | "today" => return Ok(DateBound::EvaluationDate),
            _ => {}
        }
        if let Some(period) = trimmed.strip_prefix('-') {
            return Ok(DateBound::Before(period.parse()?));
        }
        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .map(DateBound::Absolute)
            .map_err(|e| CriteriaError::InvalidDateBound {
                value: s.to_string(),
                reason: e.to_string(),
            })
    }
}

impl fmt::Display for DateBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateBound::Absolute(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            DateBound::EvaluationDate => f.write_str("now"),
            DateBound::Before(period) => write!(f, "-{}", period),
        }
    }
}

/// Inclusive date window with optional ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateWindow {
    pub start: Option<DateBound>,
    pub end: Option<DateBound>,
}

impl DateWindow {
    pub fn new(start: Option<DateBound>, end: Option<DateBound>) -> Self {
        Self { start, end }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Calendar dates of both ends for one evaluation
    pub fn resolve(&self, as_of: NaiveDate) -> (Option<NaiveDate>, Option<NaiveDate>) {
        (
            self.start.map(|bound| bound.resolve(as_of)),
            self.end.map(|bound| bound.resolve(as_of)),
        )
    }
}

// =============================================================================
// Value ranges
// =============================================================================

/// How a value range treats scalars equal to its bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryPolicy {
    /// `min <= x <= max`
    #[default]
    Inclusive,
    /// `min < x < max`
    Exclusive,
}

impl BoundaryPolicy {
    fn above(&self, x: f64, min: f64) -> bool {
        match self {
            BoundaryPolicy::Inclusive => min <= x,
            BoundaryPolicy::Exclusive => min < x,
        }
    }

    fn below(&self, x: f64, max: f64) -> bool {
        match self {
            BoundaryPolicy::Inclusive => x <= max,
            BoundaryPolicy::Exclusive => x < max,
        }
    }
}

impl fmt::Display for BoundaryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryPolicy::Inclusive => f.write_str("inclusive"),
            BoundaryPolicy::Exclusive => f.write_str("exclusive"),
        }
    }
}

/// Scalar range with optional bounds and an explicit boundary policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub policy: BoundaryPolicy,
}

impl ValueRange {
    pub fn new(min: Option<f64>, max: Option<f64>, policy: BoundaryPolicy) -> Result<Self> {
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(CriteriaError::InvertedRange { min, max });
            }
        }
        Ok(Self { min, max, policy })
    }

    pub fn contains(&self, x: f64) -> bool {
        if x.is_nan() {
            return false;
        }
        let above = self.min.is_none_or(|min| self.policy.above(x, min));
        let below = self.max.is_none_or(|max| self.policy.below(x, max));
        above && below
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_date_bounds() {
        assert_eq!("now".parse::<DateBound>().unwrap(), DateBound::EvaluationDate);
        assert_eq!(
            "-2y".parse::<DateBound>().unwrap(),
            DateBound::Before(Period::years(2))
        );
        assert_eq!(
            "-1y6m".parse::<DateBound>().unwrap(),
            DateBound::Before(Period { years: 1, months: 6, days: 0 })
        );
        assert_eq!(
            "2024-01-01".parse::<DateBound>().unwrap(),
            DateBound::Absolute(date(2024, 1, 1))
        );
        assert!("-2x".parse::<DateBound>().is_err());
        assert!("-12".parse::<DateBound>().is_err());
        assert!("yesterday".parse::<DateBound>().is_err());
    }

    #[test]
    fn test_period_before() {
        let as_of = date(2024, 6, 15);
        assert_eq!(Period::years(2).before(as_of), Some(date(2022, 6, 15)));
        assert_eq!(Period::days(15).before(as_of), Some(date(2024, 5, 31)));
        assert_eq!(Period::years(1).before(date(2024, 2, 29)), Some(date(2023, 2, 28)));
    }

    #[test]
    fn test_period_overflow_is_rejected() {
        for raw in ["400000000y", "357913941y12m", "4294967295m1m", "613566757w"] {
            assert!(
                matches!(raw.parse::<Period>(), Err(CriteriaError::InvalidDateBound { .. })),
                "{} parsed",
                raw
            );
        }
        // Fits, but reaches past the earliest date
        let deep: Period = "300000y".parse().unwrap();
        assert_eq!(deep.before(date(2024, 1, 1)), None);
        assert_eq!(DateBound::Before(deep).resolve(date(2024, 1, 1)), NaiveDate::MIN);
        assert_eq!(Period::years(u32::MAX).before(date(2024, 1, 1)), None);
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for raw in ["now", "-2y", "-1y6m", "-30d", "2020-03-04"] {
            let bound: DateBound = raw.parse().unwrap();
            assert_eq!(bound.to_string(), raw);
        }
    }

    #[test]
    fn test_inclusive_range_keeps_bounds() {
        let range = ValueRange::new(Some(2.5), Some(5.0), BoundaryPolicy::Inclusive).unwrap();
        assert!(range.contains(2.5));
        assert!(range.contains(5.0));
        assert!(!range.contains(2.4999));
        assert!(!range.contains(f64::NAN));
    }

    #[test]
    fn test_exclusive_range_drops_bounds() {
        let range = ValueRange::new(Some(2.5), Some(5.0), BoundaryPolicy::Exclusive).unwrap();
        assert!(!range.contains(2.5));
        assert!(!range.contains(5.0));
        assert!(range.contains(3.0));
    }

    #[test]
    fn test_open_ended_range() {
        let range = ValueRange::new(Some(0.0), None, BoundaryPolicy::Inclusive).unwrap();
        assert!(range.contains(0.0));
        assert!(range.contains(1.0e12));
        assert!(!range.contains(-0.1));
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        assert!(ValueRange::new(Some(5.0), Some(1.0), BoundaryPolicy::Inclusive).is_err());
    }
}
