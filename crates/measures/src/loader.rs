//! Load a TOML catalogue and compile it into measures.
//!
//! Everything that can be checked without a patient is checked here:
//! criterion argument shapes, code patterns, value ranges, predicate
//! references, provider groups and duplicate ids. A catalogue that loads
//! can be evaluated against any patient without structural failures.

use crate::definition::{CatalogueDefinition, CriterionDefinition, MeasureDefinition, PredicateDefinition, RawArg};
use crate::error::{MeasureError, Result};
use crate::measure::{AgeRange, CompiledCriterion, Measure, Predicate};
use pipeline::{BoundaryPolicy, CodeMatcher, CriteriaError, Criterion, CriterionArg, DateBound, FilterPipeline};
use records::parser::parse_date;
use records::ProviderId;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Compiled measures plus the provider groups they may refer to.
#[derive(Debug, Default)]
pub struct MeasureCatalogue {
    measures: Vec<Arc<Measure>>,
    provider_groups: BTreeMap<String, BTreeSet<ProviderId>>,
}

impl MeasureCatalogue {
    /// Read and compile a catalogue file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading measure catalogue from {}", path.display());
        let text = fs::read_to_string(path).map_err(|source| MeasureError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let catalogue = Self::from_toml_str(&text)?;
        info!(
            "Loaded {} measures and {} provider groups",
            catalogue.measures.len(),
            catalogue.provider_groups.len()
        );
        Ok(catalogue)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let definition: CatalogueDefinition = toml::from_str(text)?;
        Self::compile(definition)
    }

    /// Compile parsed definitions, failing on the first structural error.
    pub fn compile(definition: CatalogueDefinition) -> Result<Self> {
        let provider_groups: BTreeMap<String, BTreeSet<ProviderId>> = definition
            .providers
            .into_iter()
            .map(|(name, ids)| (name, ids.into_iter().collect()))
            .collect();

        let mut seen = HashSet::new();
        let mut measures = Vec::with_capacity(definition.measures.len());
        for measure in definition.measures {
            if !seen.insert(measure.id.clone()) {
                return Err(MeasureError::DuplicateMeasure { id: measure.id });
            }
            if let Some(group) = &measure.provider_group {
                if !provider_groups.contains_key(group) {
                    return Err(MeasureError::UnknownProviderGroup {
                        measure: measure.id.clone(),
                        group: group.clone(),
                    });
                }
            }
            measures.push(Arc::new(compile_measure(measure)?));
        }

        Ok(Self {
            measures,
            provider_groups,
        })
    }

    pub fn measures(&self) -> &[Arc<Measure>] {
        &self.measures
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Measure>> {
        self.measures.iter().find(|m| m.id == id)
    }

    /// The measures named in `ids`, in that order; every measure when empty.
    pub fn select(&self, ids: &[String]) -> Result<Vec<Arc<Measure>>> {
        if ids.is_empty() {
            return Ok(self.measures.clone());
        }
        ids.iter()
            .map(|id| {
                self.get(id)
                    .cloned()
                    .ok_or_else(|| MeasureError::UnknownMeasure { id: id.clone() })
            })
            .collect()
    }

    pub fn provider_groups(&self) -> &BTreeMap<String, BTreeSet<ProviderId>> {
        &self.provider_groups
    }

    pub fn len(&self) -> usize {
        self.measures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measures.is_empty()
    }
}

/// Compile one measure definition.
pub fn compile_measure(definition: MeasureDefinition) -> Result<Measure> {
    let id = definition.id;
    if id.trim().is_empty() {
        return Err(MeasureError::InvalidField {
            measure: id,
            field: "id".to_string(),
            value: String::new(),
        });
    }

    let reference_date = definition
        .reference_date
        .as_deref()
        .map(|raw| {
            parse_date("reference_date", raw).map_err(|_| MeasureError::InvalidField {
                measure: id.clone(),
                field: "reference_date".to_string(),
                value: raw.to_string(),
            })
        })
        .transpose()?;

    let age = match definition.age {
        Some(age) => {
            if let (Some(min), Some(max)) = (age.min, age.max) {
                if min > max {
                    return Err(MeasureError::InvalidAgeRange { measure: id, min, max });
                }
            }
            Some(AgeRange::new(age.min, age.max))
        }
        None => None,
    };

    let mut criteria = Vec::with_capacity(definition.criteria.len());
    let mut indices = HashMap::new();
    for (name, criterion) in definition.criteria {
        let compiled = compile_criterion(&name, criterion, definition.boundary).map_err(|source| {
            MeasureError::Criterion {
                measure: id.clone(),
                criterion: name.clone(),
                source,
            }
        })?;
        indices.insert(name, criteria.len());
        criteria.push(compiled);
    }

    let denominator = definition
        .denominator
        .as_ref()
        .map(|predicate| compile_predicate(&id, predicate, &indices))
        .transpose()?;
    let numerator = compile_predicate(&id, &definition.numerator, &indices)?;

    let referenced: HashSet<&str> = definition
        .denominator
        .iter()
        .chain(std::iter::once(&definition.numerator))
        .flat_map(|predicate| predicate.criterion_names())
        .collect();
    for criterion in &criteria {
        if !referenced.contains(criterion.name.as_str()) {
            warn!("Measure {}: criterion {} is never used", id, criterion.name);
        }
    }

    debug!("Compiled measure {} with {} criteria", id, criteria.len());

    Ok(Measure {
        id,
        title: definition.title,
        boundary: definition.boundary,
        emit_as: definition.emit_as,
        provider_group: definition.provider_group,
        reference_date,
        age,
        criteria,
        denominator,
        numerator,
    })
}

fn compile_criterion(
    name: &str,
    definition: CriterionDefinition,
    measure_boundary: BoundaryPolicy,
) -> std::result::Result<CompiledCriterion, CriteriaError> {
    let args = resolve_args(&definition.args)?;
    let criterion = Criterion::from_args(&args)?;
    let boundary = definition.boundary.unwrap_or(measure_boundary);
    let matcher = CodeMatcher::for_category(&definition.codes, definition.category)?;
    let pipeline = FilterPipeline::from_criterion(matcher, &criterion, boundary, definition.active)?;

    debug!("Criterion {} ({}): {}", name, definition.category, criterion);

    Ok(CompiledCriterion::new(
        name,
        definition.category,
        criterion,
        boundary,
        definition.active,
        pipeline,
    )
    .with_description(definition.description))
}

/// Numbers stay numbers; strings must be date bounds.
pub fn resolve_args(raw: &[RawArg]) -> std::result::Result<Vec<CriterionArg>, CriteriaError> {
    raw.iter()
        .map(|arg| match arg {
            RawArg::Number(n) => Ok(CriterionArg::Number(*n)),
            RawArg::Text(text) => text.parse::<DateBound>().map(CriterionArg::Date),
        })
        .collect()
}

fn compile_predicate(
    measure: &str,
    definition: &PredicateDefinition,
    indices: &HashMap<String, usize>,
) -> Result<Predicate> {
    let lookup = |name: &str| {
        indices
            .get(name)
            .copied()
            .ok_or_else(|| MeasureError::UnknownCriterion {
                measure: measure.to_string(),
                criterion: name.to_string(),
            })
    };
    let children = |operator: &str, list: &[PredicateDefinition]| -> Result<Vec<Predicate>> {
        if list.is_empty() {
            return Err(MeasureError::EmptyPredicate {
                measure: measure.to_string(),
                operator: operator.to_string(),
            });
        }
        list.iter()
            .map(|child| compile_predicate(measure, child, indices))
            .collect()
    };

    Ok(match definition {
        PredicateDefinition::Has(name) => Predicate::Has(lookup(name)?),
        PredicateDefinition::AtLeast { criterion, count } => Predicate::AtLeast {
            criterion: lookup(criterion)?,
            count: *count,
        },
        PredicateDefinition::All(list) => Predicate::All(children("all", list)?),
        PredicateDefinition::Any(list) => Predicate::Any(children("any", list)?),
        PredicateDefinition::Not(child) => Predicate::Not(Box::new(compile_predicate(measure, child, indices)?)),
    })
}
