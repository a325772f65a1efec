//! # Measure Orchestrator
//!
//! This module coordinates a whole measure run:
//! 1. Evaluate every selected measure concurrently (one blocking task each)
//! 2. Inside a measure, evaluate patients in parallel with Rayon
//! 3. Apply the measure's provider filter before evaluating a patient
//! 4. Once every task has finished, emit results in catalogue and patient
//!    order, so emitters never see interleaved output
//! 5. Collect failures and data-quality warnings into a RunReport

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::{debug, info, instrument};

use measures::{Emitter, Evaluation, EvaluationError, Measure, emit_result, evaluate};
use records::{PatientId, PatientIndex, PatientRecord, ProviderId};

use crate::provider_filter::ProviderFilter;
use crate::report::{MeasureSummary, RunReport};

/// What happened to one patient for one measure
#[derive(Debug, Clone, PartialEq)]
pub enum PatientOutcome {
    /// Evaluated; emits two values
    Evaluated(Evaluation),
    /// Provider outside the measure's provider group; emits nothing
    Excluded {
        patient_id: PatientId,
        provider: ProviderId,
    },
    /// Could not be evaluated; emits nothing
    Failed(EvaluationError),
}

/// Outcomes of one measure over every patient, in patient order
#[derive(Debug)]
pub struct MeasureRun {
    pub measure: Arc<Measure>,
    pub outcomes: Vec<PatientOutcome>,
    pub elapsed: Duration,
}

/// Decide one patient's outcome for one measure.
pub fn evaluate_patient(
    patient: &PatientRecord,
    measure: &Measure,
    provider_filter: &ProviderFilter,
    run_as_of: NaiveDate,
) -> PatientOutcome {
    if let Ok(provider) = patient.require_provider() {
        if !provider_filter.admits(measure.provider_group.as_deref(), provider) {
            return PatientOutcome::Excluded {
                patient_id: patient.id.clone(),
                provider: provider.to_string(),
            };
        }
    }
    match evaluate(patient, measure, run_as_of) {
        Ok(evaluation) => PatientOutcome::Evaluated(evaluation),
        Err(error) => PatientOutcome::Failed(error),
    }
}

/// Evaluate one measure over `patients` using the Rayon pool.
pub fn evaluate_measure(
    patients: &[PatientRecord],
    measure: Arc<Measure>,
    provider_filter: &ProviderFilter,
    run_as_of: NaiveDate,
) -> MeasureRun {
    let start = Instant::now();
    let outcomes: Vec<PatientOutcome> = patients
        .par_iter()
        .map(|patient| evaluate_patient(patient, &measure, provider_filter, run_as_of))
        .collect();
    let elapsed = start.elapsed();
    debug!("Evaluated measure {} over {} patients in {:.2?}", measure.id, outcomes.len(), elapsed);
    MeasureRun {
        measure,
        outcomes,
        elapsed,
    }
}

/// Runs measures over a loaded patient index
#[derive(Clone)]
pub struct MeasureRunner {
    patients: Arc<PatientIndex>,
    provider_filter: Arc<ProviderFilter>,
    run_as_of: NaiveDate,
}

impl MeasureRunner {
    /// Create a runner
    ///
    /// # Arguments
    /// * `patients` - Shared, already loaded patient index
    /// * `provider_filter` - Provider groups measures may restrict themselves to
    /// * `run_as_of` - Evaluation date for measures without a pinned reference date
    pub fn new(patients: Arc<PatientIndex>, provider_filter: ProviderFilter, run_as_of: NaiveDate) -> Self {
        Self {
            patients,
            provider_filter: Arc::new(provider_filter),
            run_as_of,
        }
    }

    pub fn run_as_of(&self) -> NaiveDate {
        self.run_as_of
    }

    /// Main entry point: evaluate `measures` and emit every result.
    ///
    /// # Returns
    /// The run report; emission errors (e.g. a closed output) abort the run.
    #[instrument(skip_all, fields(measures = measures.len(), patients = self.patients.patients().len()))]
    pub async fn run(&self, measures: &[Arc<Measure>], emitter: &mut dyn Emitter) -> Result<RunReport> {
        let start_time = Instant::now();
        info!("Starting measure run as of {}", self.run_as_of);

        // One blocking task per measure; each fans out over patients with Rayon
        let handles: Vec<_> = measures
            .iter()
            .map(|measure| {
                let patients = self.patients.clone();
                let provider_filter = self.provider_filter.clone();
                let measure = measure.clone();
                let run_as_of = self.run_as_of;
                tokio::task::spawn_blocking(move || {
                    evaluate_measure(patients.patients(), measure, &provider_filter, run_as_of)
                })
            })
            .collect();

        let mut report = RunReport::new(self.run_as_of, self.patients.rejected().len());
        for (measure, handle) in measures.iter().zip(handles) {
            let run = handle
                .await
                .with_context(|| format!("Evaluation task for measure {} panicked", measure.id))?;
            let summary = self.emit_run(run, emitter, &mut report)?;
            report.measures.push(summary);
        }

        info!(
            "Measure run complete: {} measures, {} emissions, {} failures in {:.2?}",
            report.measures.len(),
            report.total_emissions(),
            report.failures.len(),
            start_time.elapsed()
        );
        Ok(report)
    }

    /// Emit one finished measure and fold its outcomes into the report
    fn emit_run(&self, run: MeasureRun, emitter: &mut dyn Emitter, report: &mut RunReport) -> Result<MeasureSummary> {
        let measure = run.measure;
        let mut summary = MeasureSummary {
            measure_id: measure.id.clone(),
            evaluated_on: Some(measure.evaluation_date(self.run_as_of)),
            elapsed: run.elapsed,
            ..MeasureSummary::default()
        };

        for outcome in run.outcomes {
            match outcome {
                PatientOutcome::Evaluated(evaluation) => {
                    emit_result(&measure, &evaluation.result, emitter)
                        .with_context(|| format!("Failed to emit results for measure {}", measure.id))?;
                    summary.evaluated += 1;
                    summary.emissions += 2;
                    summary.warnings += evaluation.warnings.len();
                    report.record_warnings(&measure.id, &evaluation.result.patient_id, evaluation.warnings);
                }
                PatientOutcome::Excluded { .. } => summary.excluded += 1,
                PatientOutcome::Failed(error) => {
                    debug!("Measure {}: {}", measure.id, error);
                    summary.failed += 1;
                    report.record_failure(&measure.id, &error);
                }
            }
        }
        Ok(summary)
    }

    /// Evaluate a single patient against `measures`, without emitting.
    pub fn evaluate_one(&self, patient_id: &str, measures: &[Arc<Measure>]) -> Result<Vec<(Arc<Measure>, PatientOutcome)>> {
        let patient = self
            .patients
            .get_patient(patient_id)
            .ok_or_else(|| anyhow!("Patient {} not found", patient_id))?;
        Ok(measures
            .iter()
            .map(|measure| {
                let outcome = evaluate_patient(patient, measure, &self.provider_filter, self.run_as_of);
                (measure.clone(), outcome)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use measures::{CollectingEmitter, EmittedValue, MeasureCatalogue};
    use records::{Entry, EntryCategory};

    // ============================================================================
    // Test Fixtures
    // ============================================================================

    const CATALOGUE: &str = r#"
[providers]
PPhRR = ["cpsid-1"]

[[measure]]
id = "PDC-001"
age = { min = 65 }

[measure.criteria.any_condition]
category = "condition"
codes = { ICD9 = ["[0-9]"] }

[measure.numerator]
has = "any_condition"

[[measure]]
id = "PDC-002"
emit_as = "count"
provider_group = "PPhRR"

[measure.criteria.statin]
category = "medication"
codes = { whoATC = ["C10AA*"] }

[measure.numerator]
has = "statin"
"#;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn build_test_index() -> Arc<PatientIndex> {
        let mut index = PatientIndex::new();
        index.insert_patient(
            PatientRecord::new("p1")
                .with_provider("cpsid-1")
                .with_birthdate(date(1940, 1, 1))
                .with_entry(Entry::new(EntryCategory::Condition).with_code("ICD9", "401.9"))
                .with_entry(Entry::new(EntryCategory::Medication).with_code("whoATC", "C10AA01")),
        );
        index.insert_patient(
            PatientRecord::new("p2")
                .with_provider("cpsid-2")
                .with_birthdate(date(1990, 1, 1)),
        );
        // No birthdate: fails the age-checked measure only
        index.insert_patient(PatientRecord::new("p3").with_provider("cpsid-1"));
        // No provider: fails everywhere
        index.insert_patient(PatientRecord::new("p4").with_birthdate(date(1950, 1, 1)));
        Arc::new(index)
    }

    fn build_runner() -> (MeasureRunner, MeasureCatalogue) {
        let catalogue = MeasureCatalogue::from_toml_str(CATALOGUE).unwrap();
        let filter = ProviderFilter::new(catalogue.provider_groups().clone());
        let runner = MeasureRunner::new(build_test_index(), filter, date(2024, 1, 1));
        (runner, catalogue)
    }

    #[tokio::test]
    async fn test_run_emits_in_order() {
        let (runner, catalogue) = build_runner();
        let mut emitter = CollectingEmitter::new();

        let report = runner.run(catalogue.measures(), &mut emitter).await.unwrap();

        let keys: Vec<_> = emitter
            .emissions()
            .iter()
            .map(|e| format!("{} {} {}", e.measure_id, e.key, e.value))
            .collect();
        assert_eq!(
            keys,
            vec![
                "PDC-001 denominator_cpsid-1 true",
                "PDC-001 numerator_cpsid-1 true",
                "PDC-001 denominator_cpsid-2 false",
                "PDC-001 numerator_cpsid-2 false",
                "PDC-002 denominator_cpsid-1 1",
                "PDC-002 numerator_cpsid-1 1",
                "PDC-002 denominator_cpsid-1 1",
                "PDC-002 numerator_cpsid-1 0",
            ]
        );
        assert_eq!(report.total_emissions(), emitter.len());
    }

    #[tokio::test]
    async fn test_run_report_counts() {
        let (runner, catalogue) = build_runner();
        let mut emitter = CollectingEmitter::new();

        let report = runner.run(catalogue.measures(), &mut emitter).await.unwrap();

        let first = &report.measures[0];
        assert_eq!((first.evaluated, first.excluded, first.failed), (2, 0, 2));

        // p2 is outside the provider group, p4 has no provider at all
        let second = &report.measures[1];
        assert_eq!((second.evaluated, second.excluded, second.failed), (2, 1, 1));

        let failed: Vec<_> = report
            .failures
            .iter()
            .map(|f| (f.measure_id.as_str(), f.patient_id.as_str()))
            .collect();
        assert_eq!(failed, vec![("PDC-001", "p3"), ("PDC-001", "p4"), ("PDC-002", "p4")]);
    }

    #[tokio::test]
    async fn test_run_with_no_measures() {
        let (runner, _) = build_runner();
        let mut emitter = CollectingEmitter::new();

        let report = runner.run(&[], &mut emitter).await.unwrap();
        assert!(report.measures.is_empty());
        assert!(emitter.is_empty());
    }

    #[tokio::test]
    async fn test_unrepresentable_order_dates_do_not_abort_run() {
        let catalogue = MeasureCatalogue::from_toml_str(
            r#"
[[measure]]
id = "PDC-053"

[measure.criteria.digoxin]
category = "medication"
codes = { whoATC = ["C01AA*"] }
active = true

[measure.numerator]
has = "digoxin"
"#,
        )
        .unwrap();
        let digoxin = |stop: NaiveDate| {
            Entry::new(EntryCategory::Medication)
                .with_code("whoATC", "C01AA05")
                .with_period(date(2024, 1, 1), stop)
        };
        let mut index = PatientIndex::new();
        index.insert_patient(
            PatientRecord::new("p1")
                .with_provider("cpsid-1")
                .with_entry(digoxin(date(2024, 3, 1))),
        );
        index.insert_patient(
            PatientRecord::new("p2")
                .with_provider("cpsid-1")
                .with_entry(digoxin(NaiveDate::MAX)),
        );
        let runner = MeasureRunner::new(Arc::new(index), ProviderFilter::default(), date(2024, 2, 1));
        let mut emitter = CollectingEmitter::new();

        let report = runner.run(catalogue.measures(), &mut emitter).await.unwrap();

        let values: Vec<_> = emitter.emissions().iter().map(|e| e.value.to_string()).collect();
        assert_eq!(values, vec!["true", "true", "true", "false"]);
        assert_eq!(report.measures[0].evaluated, 2);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].patient_id, "p2");
    }

    #[test]
    fn test_evaluate_one() {
        let (runner, catalogue) = build_runner();

        let outcomes = runner.evaluate_one("p2", catalogue.measures()).unwrap();
        assert_eq!(outcomes.len(), 2);
        match &outcomes[0].1 {
            PatientOutcome::Evaluated(evaluation) => {
                assert!(!evaluation.result.in_denominator);
                let value = catalogue.measures()[0].emit_as.value(evaluation.result.in_denominator);
                assert_eq!(value, EmittedValue::Flag(false));
            }
            other => panic!("expected an evaluation, got {:?}", other),
        }
        assert!(matches!(outcomes[1].1, PatientOutcome::Excluded { .. }));

        assert!(runner.evaluate_one("nobody", catalogue.measures()).is_err());
    }
}
