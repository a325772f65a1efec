//! Criterion filtering over one patient's entries.
//!
//! This crate provides:
//! - CodeSet/CodeMatcher for exact, prefix and pattern code matching
//! - Date windows relative to the evaluation date, and value ranges with an
//!   explicit boundary policy
//! - Criterion, the resolved shape of a measure's positional constraints
//! - EntryFilter trait and implementations, composed by FilterPipeline
//! - QualityReport for entries that were skipped instead of judged
//!
//! ## Architecture
//! A criterion is compiled once per measure into a FilterPipeline:
//! 1. Code filter keeps entries carrying one of the measure's codes
//! 2. Temporal filter keeps entries inside the date window
//! 3. Value filter keeps entries whose first scalar is in range
//! 4. Active-medication filter keeps orders still active on the evaluation date
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::{Criterion, CodeMatcher, FilterContext, FilterPipeline, QualityReport};
//!
//! let criterion = Criterion::from_args(&args)?;
//! let pipeline = FilterPipeline::from_criterion(matcher, &criterion, policy, false)?;
//!
//! let mut report = QualityReport::new();
//! let kept = pipeline.apply(patient.results(), &FilterContext::new(as_of), &mut report);
//! let matched = kept.has_match();
//! ```

pub mod bounds;
pub mod code_set;
pub mod criterion;
pub mod error;
pub mod filter_pipeline;
pub mod filters;
pub mod report;
pub mod traits;

// Re-export main types
pub use bounds::{BoundaryPolicy, DateBound, DateWindow, Period, ValueRange};
pub use code_set::{CodeMatcher, CodeSet, MatchMode};
pub use criterion::{Criterion, CriterionArg};
pub use error::{CriteriaError, Result};
pub use filter_pipeline::FilterPipeline;
pub use report::{DataQualityWarning, QualityReport, WarningKind};
pub use traits::{EntryFilter, FilterContext};
