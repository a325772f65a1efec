//! Criterion shapes: which date and value constraints follow the code set.
//!
//! Measure authors list constraints positionally after the codes, e.g.
//! `["-2y", "now"]` or `[2.5, "-1y"]`. The shape of that list (how many
//! arguments, and which are dates and which numbers) decides what each one
//! means. [`Criterion::from_args`] classifies the list once, when the measure
//! is loaded, into an explicit [`Criterion`] variant; shapes that fit no
//! variant are rejected there instead of silently meaning "no constraint".
//!
//! | arguments              | meaning                                  |
//! |------------------------|------------------------------------------|
//! | `()`                   | codes only                               |
//! | `(date)`               | on or after `date`                       |
//! | `(date, date)`         | window                                   |
//! | `(date, date, n [,n])` | window, then value `>= n` (`<= n`)       |
//! | `(date, n [,n])`       | on or after `date`, value range          |
//! | `(n)`                  | value `>= n`                             |
//! | `(n, n)`               | value range                              |
//! | `(n, n, date [,date])` | value range, then window                 |
//! | `(n, date [,date])`    | value `>= n`, then window                |

use crate::bounds::{BoundaryPolicy, DateBound, DateWindow, ValueRange};
use crate::error::{CriteriaError, Result};
use std::fmt;

/// One positional constraint argument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CriterionArg {
    Date(DateBound),
    Number(f64),
}

impl CriterionArg {
    fn kind(&self) -> &'static str {
        match self {
            CriterionArg::Date(_) => "date",
            CriterionArg::Number(_) => "number",
        }
    }
}

impl From<DateBound> for CriterionArg {
    fn from(bound: DateBound) -> Self {
        CriterionArg::Date(bound)
    }
}

impl From<f64> for CriterionArg {
    fn from(n: f64) -> Self {
        CriterionArg::Number(n)
    }
}

/// The constraints applied after code matching, one variant per call shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Criterion {
    CodesOnly,
    Since {
        start: DateBound,
    },
    DateWindow {
        start: DateBound,
        end: DateBound,
    },
    DateWindowWithRange {
        start: DateBound,
        end: DateBound,
        min: f64,
        max: Option<f64>,
    },
    SinceWithRange {
        start: DateBound,
        min: f64,
        max: Option<f64>,
    },
    Min {
        min: f64,
    },
    ValueRange {
        min: f64,
        max: f64,
    },
    RangeWithWindow {
        min: f64,
        max: f64,
        start: DateBound,
        end: Option<DateBound>,
    },
    MinWithWindow {
        min: f64,
        start: DateBound,
        end: Option<DateBound>,
    },
}

impl Criterion {
    /// Classify positional arguments by their shape.
    pub fn from_args(args: &[CriterionArg]) -> Result<Self> {
        use CriterionArg::{Date as D, Number as N};

        let criterion = match *args {
            [] => Criterion::CodesOnly,
            [D(start)] => Criterion::Since { start },
            [D(start), D(end)] => Criterion::DateWindow { start, end },
            [D(start), D(end), N(min)] => Criterion::DateWindowWithRange { start, end, min, max: None },
            [D(start), D(end), N(min), N(max)] => Criterion::DateWindowWithRange {
                start,
                end,
                min,
                max: Some(max),
            },
            [D(start), N(min)] => Criterion::SinceWithRange { start, min, max: None },
            [D(start), N(min), N(max)] => Criterion::SinceWithRange { start, min, max: Some(max) },
            [N(min)] => Criterion::Min { min },
            [N(min), N(max)] => Criterion::ValueRange { min, max },
            [N(min), N(max), D(start)] => Criterion::RangeWithWindow { min, max, start, end: None },
            [N(min), N(max), D(start), D(end)] => Criterion::RangeWithWindow {
                min,
                max,
                start,
                end: Some(end),
            },
            [N(min), D(start)] => Criterion::MinWithWindow { min, start, end: None },
            [N(min), D(start), D(end)] => Criterion::MinWithWindow { min, start, end: Some(end) },
            _ => {
                return Err(CriteriaError::AmbiguousParameterShape {
                    shape: describe_shape(args),
                });
            }
        };

        if args.iter().any(|arg| matches!(arg, N(n) if !n.is_finite())) {
            return Err(CriteriaError::AmbiguousParameterShape {
                shape: describe_shape(args),
            });
        }
        Ok(criterion)
    }

    /// Date constraints of this criterion.
    pub fn window(&self) -> DateWindow {
        match *self {
            Criterion::CodesOnly | Criterion::Min { .. } | Criterion::ValueRange { .. } => {
                DateWindow::unbounded()
            }
            Criterion::Since { start } | Criterion::SinceWithRange { start, .. } => {
                DateWindow::new(Some(start), None)
            }
            Criterion::DateWindow { start, end } | Criterion::DateWindowWithRange { start, end, .. } => {
                DateWindow::new(Some(start), Some(end))
            }
            Criterion::RangeWithWindow { start, end, .. } | Criterion::MinWithWindow { start, end, .. } => {
                DateWindow::new(Some(start), end)
            }
        }
    }

    /// `(min, max)` when the criterion constrains values.
    ///
    /// Value filtering happens only when a minimum was given; a missing
    /// maximum means no upper bound.
    pub fn value_bounds(&self) -> Option<(f64, Option<f64>)> {
        match *self {
            Criterion::CodesOnly
            | Criterion::Since { .. }
            | Criterion::DateWindow { .. } => None,
            Criterion::Min { min } | Criterion::MinWithWindow { min, .. } => Some((min, None)),
            Criterion::ValueRange { min, max } | Criterion::RangeWithWindow { min, max, .. } => {
                Some((min, Some(max)))
            }
            Criterion::DateWindowWithRange { min, max, .. } | Criterion::SinceWithRange { min, max, .. } => {
                Some((min, max))
            }
        }
    }

    /// The value range under `policy`, if any.
    pub fn value_range(&self, policy: BoundaryPolicy) -> Result<Option<ValueRange>> {
        self.value_bounds()
            .map(|(min, max)| ValueRange::new(Some(min), max, policy))
            .transpose()
    }
}

fn describe_shape(args: &[CriterionArg]) -> String {
    if args.is_empty() {
        return "no arguments".to_string();
    }
    args.iter().map(|arg| arg.kind()).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let window = self.window();
        let mut parts = Vec::new();
        match (window.start, window.end) {
            (None, None) => {}
            (Some(start), None) => parts.push(format!("since {}", start)),
            (Some(start), Some(end)) => parts.push(format!("{} to {}", start, end)),
            (None, Some(end)) => parts.push(format!("until {}", end)),
        }
        match self.value_bounds() {
            Some((min, Some(max))) => parts.push(format!("value {}..{}", min, max)),
            Some((min, None)) => parts.push(format!("value from {}", min)),
            None => {}
        }
        if parts.is_empty() {
            f.write_str("codes only")
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::Period;
    use chrono::NaiveDate;

    fn date_a() -> DateBound {
        DateBound::Absolute(NaiveDate::from_ymd_opt(2022, 1, 1).unwrap())
    }

    fn date_b() -> DateBound {
        DateBound::Absolute(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
    }

    #[test]
    fn test_two_dates_is_a_pure_window() {
        let criterion = Criterion::from_args(&[date_a().into(), date_b().into()]).unwrap();

        assert_eq!(criterion, Criterion::DateWindow { start: date_a(), end: date_b() });
        assert_eq!(criterion.window(), DateWindow::new(Some(date_a()), Some(date_b())));
        assert_eq!(criterion.value_bounds(), None);
    }

    #[test]
    fn test_number_then_date_is_min_with_open_window() {
        let criterion = Criterion::from_args(&[2.5.into(), date_a().into()]).unwrap();

        assert_eq!(
            criterion,
            Criterion::MinWithWindow { min: 2.5, start: date_a(), end: None }
        );
        assert_eq!(criterion.window(), DateWindow::new(Some(date_a()), None));
        assert_eq!(criterion.value_bounds(), Some((2.5, None)));
    }

    #[test]
    fn test_every_supported_shape() {
        let d = |b: DateBound| CriterionArg::Date(b);
        let n = CriterionArg::Number;

        let cases: Vec<(Vec<CriterionArg>, Option<DateBound>, Option<DateBound>, Option<(f64, Option<f64>)>)> = vec![
            (vec![], None, None, None),
            (vec![d(date_a())], Some(date_a()), None, None),
            (vec![d(date_a()), d(date_b()), n(1.0)], Some(date_a()), Some(date_b()), Some((1.0, None))),
            (vec![d(date_a()), d(date_b()), n(1.0), n(2.0)], Some(date_a()), Some(date_b()), Some((1.0, Some(2.0)))),
            (vec![d(date_a()), n(1.0)], Some(date_a()), None, Some((1.0, None))),
            (vec![d(date_a()), n(1.0), n(2.0)], Some(date_a()), None, Some((1.0, Some(2.0)))),
            (vec![n(1.0)], None, None, Some((1.0, None))),
            (vec![n(0.0), n(49.9)], None, None, Some((0.0, Some(49.9)))),
            (vec![n(1.0), n(2.0), d(date_a())], Some(date_a()), None, Some((1.0, Some(2.0)))),
            (vec![n(1.0), n(2.0), d(date_a()), d(date_b())], Some(date_a()), Some(date_b()), Some((1.0, Some(2.0)))),
            (vec![n(1.0), d(date_a()), d(date_b())], Some(date_a()), Some(date_b()), Some((1.0, None))),
        ];

        for (args, start, end, values) in cases {
            let criterion = Criterion::from_args(&args).unwrap();
            assert_eq!(criterion.window(), DateWindow::new(start, end), "{:?}", args);
            assert_eq!(criterion.value_bounds(), values, "{:?}", args);
        }
    }

    #[test]
    fn test_zero_minimum_is_a_constraint() {
        let criterion = Criterion::from_args(&[0.0.into()]).unwrap();
        let range = criterion.value_range(BoundaryPolicy::Inclusive).unwrap().unwrap();
        assert_eq!(range.min, Some(0.0));
        assert!(!range.contains(-1.0));
    }

    #[test]
    fn test_unsupported_shapes_are_ambiguous() {
        let relative = DateBound::Before(Period::years(1));
        let bad_shapes: Vec<Vec<CriterionArg>> = vec![
            vec![date_a().into(), date_b().into(), relative.into()],
            vec![date_a().into(), 1.0.into(), date_b().into()],
            vec![1.0.into(), 2.0.into(), 3.0.into()],
            vec![1.0.into(), date_a().into(), 2.0.into()],
            vec![date_a().into(), date_b().into(), 1.0.into(), 2.0.into(), 3.0.into()],
            vec![f64::NAN.into()],
        ];

        for args in bad_shapes {
            let err = Criterion::from_args(&args).unwrap_err();
            assert!(
                matches!(err, CriteriaError::AmbiguousParameterShape { .. }),
                "{:?}",
                args
            );
        }
    }

    #[test]
    fn test_inverted_range_is_rejected_at_build() {
        let criterion = Criterion::from_args(&[5.0.into(), 1.0.into()]).unwrap();
        assert!(criterion.value_range(BoundaryPolicy::Exclusive).is_err());
    }

    #[test]
    fn test_display() {
        let criterion = Criterion::from_args(&[
            DateBound::Before(Period::years(2)).into(),
            DateBound::EvaluationDate.into(),
        ])
        .unwrap();
        assert_eq!(criterion.to_string(), "-2y to now");
        assert_eq!(Criterion::CodesOnly.to_string(), "codes only");
    }
}
