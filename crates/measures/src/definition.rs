//! Measure catalogue documents as written in TOML.
//!
//! ```toml
//! [providers]
//! PPhRR = ["cpsid-1", "cpsid-2"]
//!
//! [[measure]]
//! id = "PDC-008"
//! title = "BMI or WC documented in last 2 yrs, age 12-18"
//! emit_as = "flag"
//! provider_group = "PPhRR"
//! age = { min = 12, max = 18 }
//!
//! [measure.criteria.bmi]
//! category = "vital_sign"
//! codes = { LOINC = ["39156-5"] }
//! args = ["-2y", "now"]
//!
//! [measure.numerator]
//! any = [{ has = "bmi" }, { has = "wc" }]
//! ```
//!
//! These types only mirror the document. Nothing here is validated; the
//! loader compiles them into [`crate::Measure`]s.

use crate::emission::EmitFormat;
use pipeline::{BoundaryPolicy, CodeSet};
use records::EntryCategory;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A whole catalogue file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogueDefinition {
    /// Provider groups by name
    #[serde(default)]
    pub providers: BTreeMap<String, Vec<String>>,
    #[serde(default, rename = "measure")]
    pub measures: Vec<MeasureDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MeasureDefinition {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub boundary: BoundaryPolicy,
    #[serde(default)]
    pub emit_as: EmitFormat,
    #[serde(default)]
    pub provider_group: Option<String>,
    /// `YYYY-MM-DD`; overrides the run date for this measure
    #[serde(default)]
    pub reference_date: Option<String>,
    #[serde(default)]
    pub age: Option<AgeDefinition>,
    #[serde(default)]
    pub criteria: BTreeMap<String, CriterionDefinition>,
    /// Missing means "everyone in the age range"
    #[serde(default)]
    pub denominator: Option<PredicateDefinition>,
    pub numerator: PredicateDefinition,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgeDefinition {
    #[serde(default)]
    pub min: Option<u32>,
    #[serde(default)]
    pub max: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CriterionDefinition {
    pub category: EntryCategory,
    pub codes: CodeSet,
    /// Positional dates and numbers, e.g. `["-2y", "now", 7.0]`
    #[serde(default)]
    pub args: Vec<RawArg>,
    /// Keep only medications active on the evaluation date
    #[serde(default)]
    pub active: bool,
    /// Overrides the measure's boundary policy for this criterion
    #[serde(default)]
    pub boundary: Option<BoundaryPolicy>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A positional argument before its date/number shape is checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawArg {
    Number(f64),
    Text(String),
}

/// Boolean tree over named criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateDefinition {
    /// The criterion matched at least one entry
    Has(String),
    All(Vec<PredicateDefinition>),
    Any(Vec<PredicateDefinition>),
    Not(Box<PredicateDefinition>),
    /// The criterion matched at least `count` entries
    AtLeast { criterion: String, count: usize },
}

impl PredicateDefinition {
    /// Names of every criterion the tree refers to.
    pub fn criterion_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            PredicateDefinition::Has(name) => names.push(name),
            PredicateDefinition::AtLeast { criterion, .. } => names.push(criterion),
            PredicateDefinition::All(children) | PredicateDefinition::Any(children) => {
                for child in children {
                    child.collect_names(names);
                }
            }
            PredicateDefinition::Not(child) => child.collect_names(names),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOGUE: &str = r#"
[providers]
PPhRR = ["cpsid-1", "cpsid-2"]

[[measure]]
id = "PDC-008"
title = "BMI or WC documented"
emit_as = "count"
provider_group = "PPhRR"
age = { min = 12, max = 18 }

[measure.criteria.bmi]
category = "vital_sign"
codes = { LOINC = ["39156-5"] }
args = ["-2y", "now"]

[measure.criteria.lipid]
category = "result"
codes = { LOINC = ["2089-1"] }
args = [0, 3.4, "-1y"]
boundary = "exclusive"

[measure.numerator]
any = [{ has = "bmi" }, { not = { has = "lipid" } }, { at_least = { criterion = "bmi", count = 2 } }]
"#;

    #[test]
    fn test_parse_catalogue() {
        let catalogue: CatalogueDefinition = toml::from_str(CATALOGUE).unwrap();

        assert_eq!(catalogue.providers["PPhRR"], vec!["cpsid-1", "cpsid-2"]);
        assert_eq!(catalogue.measures.len(), 1);

        let measure = &catalogue.measures[0];
        assert_eq!(measure.emit_as, EmitFormat::Count);
        assert_eq!(measure.boundary, BoundaryPolicy::Inclusive);
        assert_eq!(measure.age, Some(AgeDefinition { min: Some(12), max: Some(18) }));
        assert!(measure.denominator.is_none());

        let bmi = &measure.criteria["bmi"];
        assert_eq!(bmi.category, EntryCategory::VitalSign);
        assert_eq!(bmi.args, vec![RawArg::Text("-2y".into()), RawArg::Text("now".into())]);

        let lipid = &measure.criteria["lipid"];
        assert_eq!(
            lipid.args,
            vec![RawArg::Number(0.0), RawArg::Number(3.4), RawArg::Text("-1y".into())]
        );
        assert_eq!(lipid.boundary, Some(BoundaryPolicy::Exclusive));
    }

    #[test]
    fn test_predicate_tree() {
        let catalogue: CatalogueDefinition = toml::from_str(CATALOGUE).unwrap();
        let numerator = &catalogue.measures[0].numerator;

        assert_eq!(numerator.criterion_names(), vec!["bmi", "lipid", "bmi"]);
        let PredicateDefinition::Any(children) = numerator else {
            panic!("expected any, got {:?}", numerator);
        };
        assert_eq!(children[0], PredicateDefinition::Has("bmi".into()));
        assert_eq!(
            children[1],
            PredicateDefinition::Not(Box::new(PredicateDefinition::Has("lipid".into())))
        );
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let text = r#"
[[measure]]
id = "X"
boundry = "exclusive"
numerator = { has = "a" }
"#;
        assert!(toml::from_str::<CatalogueDefinition>(text).is_err());
    }
}
