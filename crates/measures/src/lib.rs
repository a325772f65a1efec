//! Quality measures: definitions, evaluation and emission.
//!
//! This crate provides:
//! - TOML measure catalogue documents and their loader
//! - Compiled measures (criteria pipelines plus denominator/numerator trees)
//! - The per-patient evaluator
//! - The `(key, value)` emission protocol and two emitters
//!
//! ## Example Usage
//! ```ignore
//! use measures::{evaluate, emit_result, JsonLinesEmitter, MeasureCatalogue};
//!
//! let catalogue = MeasureCatalogue::load_from_file(Path::new("measures.toml"))?;
//! let mut emitter = JsonLinesEmitter::new(std::io::stdout());
//!
//! for measure in catalogue.measures() {
//!     let evaluation = evaluate(&patient, measure, as_of)?;
//!     emit_result(measure, &evaluation.result, &mut emitter)?;
//! }
//! ```

pub mod definition;
pub mod emission;
pub mod error;
pub mod evaluator;
pub mod loader;
pub mod measure;

// Re-export main types
pub use definition::{CatalogueDefinition, CriterionDefinition, MeasureDefinition, PredicateDefinition, RawArg};
pub use emission::{
    CollectingEmitter, EmissionKey, Emission, EmitFormat, EmittedValue, Emitter, JsonLinesEmitter, Population,
    emit_result,
};
pub use error::{EvaluationError, MeasureError, Result};
pub use evaluator::{Evaluation, MeasureResult, evaluate};
pub use loader::MeasureCatalogue;
pub use measure::{AgeRange, CompiledCriterion, Measure, Predicate};
