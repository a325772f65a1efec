//! Denominator/numerator evaluation for one patient and one measure.
//!
//! ## Algorithm
//! 1. Resolve the provider (required: emissions are keyed by it)
//! 2. Resolve the evaluation date (measure pin, else the run date)
//! 3. Age check, when the measure has one (requires a birthdate)
//! 4. Denominator predicate, only if the age check passed
//! 5. Numerator predicate, only if the patient is in the denominator
//!
//! Criteria are evaluated lazily and at most once per patient; a criterion
//! the predicates never reach costs nothing.

use crate::error::EvaluationError;
use crate::measure::{Measure, Predicate};
use chrono::NaiveDate;
use pipeline::{DataQualityWarning, FilterContext, QualityReport};
use records::{PatientId, PatientRecord, ProviderId};
use tracing::trace;

/// Membership of one patient in one measure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasureResult {
    pub patient_id: PatientId,
    pub provider: ProviderId,
    pub evaluated_on: NaiveDate,
    pub in_denominator: bool,
    pub in_numerator: bool,
}

/// A result plus the data-quality warnings raised while computing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub result: MeasureResult,
    pub warnings: Vec<DataQualityWarning>,
}

/// Evaluate `patient` against `measure`.
///
/// `run_as_of` is the evaluation date of the run; a measure with a pinned
/// reference date ignores it.
pub fn evaluate(
    patient: &PatientRecord,
    measure: &Measure,
    run_as_of: NaiveDate,
) -> Result<Evaluation, EvaluationError> {
    let provider = patient
        .require_provider()
        .map_err(|_| EvaluationError::MissingProvider {
            patient: patient.id.clone(),
        })?
        .to_string();

    let as_of = measure.evaluation_date(run_as_of);

    let in_age = match measure.age {
        Some(range) => {
            let age = patient
                .require_age_on(as_of)
                .map_err(|_| EvaluationError::MissingBirthdate {
                    patient: patient.id.clone(),
                })?;
            range.contains(age)
        }
        None => true,
    };

    let mut state = CriterionState::new(patient, measure, as_of);

    let in_denominator = in_age
        && match &measure.denominator {
            Some(predicate) => state.holds(predicate),
            None => true,
        };
    let in_numerator = in_denominator && state.holds(&measure.numerator);

    trace!(
        "Evaluated {} for patient {}: denominator={} numerator={}",
        measure.id, patient.id, in_denominator, in_numerator
    );

    Ok(Evaluation {
        result: MeasureResult {
            patient_id: patient.id.clone(),
            provider,
            evaluated_on: as_of,
            in_denominator,
            in_numerator,
        },
        warnings: state.report.into_warnings(),
    })
}

/// Entry counts per criterion for one patient, filled on first use.
struct CriterionState<'a> {
    patient: &'a PatientRecord,
    measure: &'a Measure,
    context: FilterContext,
    counts: Vec<Option<usize>>,
    report: QualityReport,
}

impl<'a> CriterionState<'a> {
    fn new(patient: &'a PatientRecord, measure: &'a Measure, as_of: NaiveDate) -> Self {
        Self {
            patient,
            measure,
            context: FilterContext::new(as_of),
            counts: vec![None; measure.criteria.len()],
            report: QualityReport::new(),
        }
    }

    fn count(&mut self, index: usize) -> usize {
        if let Some(count) = self.counts[index] {
            return count;
        }
        let criterion = &self.measure.criteria[index];
        let count = criterion
            .select(self.patient, &self.context, &mut self.report)
            .len();
        self.counts[index] = Some(count);
        count
    }

    fn holds(&mut self, predicate: &Predicate) -> bool {
        match predicate {
            Predicate::Has(index) => self.count(*index) > 0,
            Predicate::AtLeast { criterion, count } => self.count(*criterion) >= *count,
            Predicate::All(children) => children.iter().all(|child| self.holds(child)),
            Predicate::Any(children) => children.iter().any(|child| self.holds(child)),
            Predicate::Not(child) => !self.holds(child),
        }
    }
}
