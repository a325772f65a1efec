//! End-to-end measure scenarios: catalogue text in, emissions out.

use chrono::NaiveDate;
use measures::{
    CollectingEmitter, EmittedValue, MeasureCatalogue, Population, emit_result, evaluate,
};
use pipeline::WarningKind;
use records::{Entry, EntryCategory, PatientRecord};

const CATALOGUE: &str = r#"
[[measure]]
id = "PDC-008"
title = "BMI or WC documented in last 2 yrs, age 12-18"
age = { min = 12, max = 18 }

[measure.criteria.bmi]
category = "vital_sign"
codes = { LOINC = ["39156-5"] }
args = ["-2y", "now"]

[measure.criteria.wc]
category = "vital_sign"
codes = { LOINC = ["56115-9", "56114-2"] }
args = ["-2y", "now"]

[measure.criteria.height]
category = "vital_sign"
codes = { LOINC = ["8302-2"] }
args = ["-2y", "now"]

[measure.criteria.weight]
category = "vital_sign"
codes = { LOINC = ["3141-9"] }
args = ["-2y", "now"]

[measure.numerator]
any = [{ has = "bmi" }, { has = "wc" }, { all = [{ has = "height" }, { has = "weight" }] }]

[[measure]]
id = "PDC-053"
title = "Age 65+ currently on digoxin"
emit_as = "count"
age = { min = 65 }

[measure.criteria.digoxin]
category = "medication"
codes = { whoATC = ["C01AA*"] }
active = true

[measure.numerator]
has = "digoxin"

[[measure]]
id = "PDC-027"
title = "Diabetics with an HbA1c of 7 or less in the last year"
age = { min = 18 }

[measure.criteria.diabetes]
category = "condition"
codes = { ICD9 = ["250"] }

[measure.criteria.hba1c]
category = "result"
codes = { LOINC = ["4548-4"] }
args = ["-1y", "now", 0, 7]

[measure.denominator]
has = "diabetes"

[measure.numerator]
has = "hba1c"
"#;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn catalogue() -> MeasureCatalogue {
    MeasureCatalogue::from_toml_str(CATALOGUE).unwrap()
}

#[test]
fn test_teenager_with_recent_bmi() {
    let catalogue = catalogue();
    let measure = catalogue.get("PDC-008").unwrap();
    let as_of = date(2024, 3, 1);

    let patient = PatientRecord::new("teen")
        .with_provider("cpsid-1")
        .with_birthdate(date(2008, 9, 1))
        .with_entry(
            Entry::new(EntryCategory::VitalSign)
                .with_code("LOINC", "39156-5")
                .with_date(date(2023, 3, 1))
                .with_value(21.4, "kg/m2"),
        );

    let evaluation = evaluate(&patient, measure, as_of).unwrap();
    assert!(evaluation.result.in_denominator);
    assert!(evaluation.result.in_numerator);

    let mut emitter = CollectingEmitter::new();
    emit_result(measure, &evaluation.result, &mut emitter).unwrap();

    let emissions = emitter.into_emissions();
    assert_eq!(emissions.len(), 2);
    assert_eq!(emissions[0].key.to_string(), "denominator_cpsid-1");
    assert_eq!(emissions[0].value, EmittedValue::Flag(true));
    assert_eq!(emissions[1].key.population, Population::Numerator);
    assert_eq!(emissions[1].value, EmittedValue::Flag(true));
}

#[test]
fn test_teenager_needs_both_height_and_weight() {
    let catalogue = catalogue();
    let measure = catalogue.get("PDC-008").unwrap();
    let as_of = date(2024, 3, 1);

    let vital = |code: &str, on: NaiveDate, value: f64| {
        Entry::new(EntryCategory::VitalSign)
            .with_code("LOINC", code)
            .with_date(on)
            .with_value(value, "")
    };
    let teen = || {
        PatientRecord::new("teen")
            .with_provider("cpsid-1")
            .with_birthdate(date(2008, 9, 1))
    };

    let height_only = teen().with_entry(vital("8302-2", date(2023, 9, 1), 162.0));
    let result = evaluate(&height_only, measure, as_of).unwrap().result;
    assert!(result.in_denominator);
    assert!(!result.in_numerator);

    let both = teen()
        .with_entry(vital("8302-2", date(2023, 9, 1), 162.0))
        .with_entry(vital("3141-9", date(2023, 9, 1), 51.5));
    assert!(evaluate(&both, measure, as_of).unwrap().result.in_numerator);

    // Weight taken three years ago falls outside the window
    let stale_weight = teen()
        .with_entry(vital("8302-2", date(2023, 9, 1), 162.0))
        .with_entry(vital("3141-9", date(2021, 3, 1), 40.0));
    assert!(!evaluate(&stale_weight, measure, as_of).unwrap().result.in_numerator);
}

#[test]
fn test_senior_whose_prescription_ran_out() {
    let catalogue = catalogue();
    let measure = catalogue.get("PDC-053").unwrap();

    // Ten days ordered, twelve with the grace extension: active through 01-13
    let patient = PatientRecord::new("senior")
        .with_provider("cpsid-2")
        .with_birthdate(date(1943, 6, 1))
        .with_entry(
            Entry::new(EntryCategory::Medication)
                .with_code("whoATC", "C01AA05")
                .with_period(date(2024, 1, 1), date(2024, 1, 11)),
        );

    let still_covered = evaluate(&patient, measure, date(2024, 1, 13)).unwrap();
    assert!(still_covered.result.in_numerator);

    let evaluation = evaluate(&patient, measure, date(2024, 1, 14)).unwrap();
    assert!(evaluation.result.in_denominator);
    assert!(!evaluation.result.in_numerator);

    let mut emitter = CollectingEmitter::new();
    emit_result(measure, &evaluation.result, &mut emitter).unwrap();
    let values: Vec<_> = emitter.emissions().iter().map(|e| e.value).collect();
    assert_eq!(values, vec![EmittedValue::Count(1), EmittedValue::Count(0)]);
}

#[test]
fn test_one_unusable_result_among_ten() {
    let catalogue = catalogue();
    let measure = catalogue.get("PDC-027").unwrap();
    let as_of = date(2024, 6, 1);

    let mut patient = PatientRecord::new("diabetic")
        .with_provider("cpsid-1")
        .with_birthdate(date(1970, 1, 1))
        .with_entry(Entry::new(EntryCategory::Condition).with_code("ICD9", "250.00"));

    for month in 1..=10 {
        let mut entry = Entry::new(EntryCategory::Result)
            .with_id(format!("a1c-{}", month))
            .with_code("LOINC", "4548-4")
            .with_date(date(2023, month + 1, 15));
        // Only the ninth result is within range, the seventh has no value at all
        if month == 9 {
            entry = entry.with_value(6.8, "%");
        } else if month != 7 {
            entry = entry.with_value(8.5, "%");
        }
        patient.push_entry(entry);
    }

    let evaluation = evaluate(&patient, measure, as_of).unwrap();
    assert!(evaluation.result.in_denominator);
    assert!(evaluation.result.in_numerator);
    assert_eq!(evaluation.warnings.len(), 1);
    assert_eq!(evaluation.warnings[0].kind, WarningKind::MissingValue);
    assert_eq!(evaluation.warnings[0].entry, "a1c-7");
}

#[test]
fn test_numerator_implies_denominator() {
    let catalogue = catalogue();
    let as_of = date(2024, 6, 1);

    let hba1c = Entry::new(EntryCategory::Result)
        .with_code("LOINC", "4548-4")
        .with_date(date(2024, 1, 1))
        .with_value(6.0, "%");
    let bmi = Entry::new(EntryCategory::VitalSign)
        .with_code("LOINC", "39156-5")
        .with_date(date(2024, 1, 1))
        .with_value(30.0, "kg/m2");
    let digoxin = Entry::new(EntryCategory::Medication)
        .with_code("whoATC", "C01AA05")
        .with_period(date(2024, 5, 1), date(2024, 8, 1));

    let birthdates = [date(1930, 1, 1), date(1960, 1, 1), date(2010, 1, 1), date(2020, 1, 1)];
    let mut patients = Vec::new();
    for (i, birthdate) in birthdates.iter().enumerate() {
        patients.push(
            PatientRecord::new(format!("p{}", i))
                .with_provider("cpsid-1")
                .with_birthdate(*birthdate)
                .with_entry(hba1c.clone())
                .with_entry(bmi.clone())
                .with_entry(digoxin.clone()),
        );
    }

    let mut denominators = 0;
    for measure in catalogue.measures() {
        for patient in &patients {
            let result = evaluate(patient, measure, as_of).unwrap().result;
            assert!(!result.in_numerator || result.in_denominator, "{} {}", measure.id, patient.id);
            denominators += usize::from(result.in_denominator);
        }
    }
    // PDC-008: the 14 year old; PDC-053: the 94 year old; PDC-027: nobody has the condition
    assert_eq!(denominators, 2);
}

#[test]
fn test_boundary_policy_per_measure() {
    let text = CATALOGUE.replace(
        "id = \"PDC-027\"",
        "id = \"PDC-027\"\nboundary = \"exclusive\"",
    );
    let catalogue = MeasureCatalogue::from_toml_str(&text).unwrap();
    let measure = catalogue.get("PDC-027").unwrap();

    let patient = PatientRecord::new("edge")
        .with_provider("cpsid-1")
        .with_birthdate(date(1970, 1, 1))
        .with_entry(Entry::new(EntryCategory::Condition).with_code("ICD9", "250.00"))
        .with_entry(
            Entry::new(EntryCategory::Result)
                .with_code("LOINC", "4548-4")
                .with_date(date(2024, 1, 1))
                .with_value(7.0, "%"),
        );

    let result = evaluate(&patient, measure, date(2024, 6, 1)).unwrap().result;
    assert!(result.in_denominator);
    assert!(!result.in_numerator);
}
