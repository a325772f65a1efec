//! The emission protocol between measure evaluation and the reducer.
//!
//! Every evaluated patient produces exactly two emissions, denominator first:
//!
//! ```text
//! denominator_<provider>  true | 1
//! numerator_<provider>    false | 0
//! ```
//!
//! The external reducer sums them per provider. Whether values are JSON
//! booleans or 0/1 numbers is a per-measure choice ([`EmitFormat`]).

use crate::evaluator::MeasureResult;
use crate::measure::Measure;
use records::ProviderId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Population {
    Denominator,
    Numerator,
}

impl Population {
    pub fn as_str(&self) -> &'static str {
        match self {
            Population::Denominator => "denominator",
            Population::Numerator => "numerator",
        }
    }
}

impl fmt::Display for Population {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `denominator_<provider>` or `numerator_<provider>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmissionKey {
    pub population: Population,
    pub provider: ProviderId,
}

impl EmissionKey {
    pub fn new(population: Population, provider: impl Into<ProviderId>) -> Self {
        Self {
            population,
            provider: provider.into(),
        }
    }
}

impl fmt::Display for EmissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.population, self.provider)
    }
}

/// How a measure writes its membership flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmitFormat {
    /// JSON `true` / `false`
    #[default]
    Flag,
    /// `1` / `0`
    Count,
}

impl EmitFormat {
    pub fn value(&self, member: bool) -> EmittedValue {
        match self {
            EmitFormat::Flag => EmittedValue::Flag(member),
            EmitFormat::Count => EmittedValue::Count(u8::from(member)),
        }
    }
}

impl fmt::Display for EmitFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmitFormat::Flag => f.write_str("flag"),
            EmitFormat::Count => f.write_str("count"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EmittedValue {
    Flag(bool),
    Count(u8),
}

impl EmittedValue {
    pub fn is_member(&self) -> bool {
        match self {
            EmittedValue::Flag(flag) => *flag,
            EmittedValue::Count(n) => *n > 0,
        }
    }
}

impl fmt::Display for EmittedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmittedValue::Flag(flag) => write!(f, "{}", flag),
            EmittedValue::Count(n) => write!(f, "{}", n),
        }
    }
}

/// Receives `(key, value)` pairs.
pub trait Emitter {
    fn emit(&mut self, measure_id: &str, key: &EmissionKey, value: EmittedValue) -> io::Result<()>;
}

/// Emit both populations of one result, denominator first.
pub fn emit_result(measure: &Measure, result: &MeasureResult, emitter: &mut dyn Emitter) -> io::Result<()> {
    let populations = [
        (Population::Denominator, result.in_denominator),
        (Population::Numerator, result.in_numerator),
    ];
    for (population, member) in populations {
        let key = EmissionKey::new(population, result.provider.clone());
        emitter.emit(&measure.id, &key, measure.emit_as.value(member))?;
    }
    Ok(())
}

/// One recorded emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emission {
    pub measure_id: String,
    pub key: EmissionKey,
    pub value: EmittedValue,
}

/// Keeps every emission in memory, in order.
#[derive(Debug, Default)]
pub struct CollectingEmitter {
    emissions: Vec<Emission>,
}

impl CollectingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emissions(&self) -> &[Emission] {
        &self.emissions
    }

    pub fn into_emissions(self) -> Vec<Emission> {
        self.emissions
    }

    pub fn len(&self) -> usize {
        self.emissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emissions.is_empty()
    }
}

impl Emitter for CollectingEmitter {
    fn emit(&mut self, measure_id: &str, key: &EmissionKey, value: EmittedValue) -> io::Result<()> {
        self.emissions.push(Emission {
            measure_id: measure_id.to_string(),
            key: key.clone(),
            value,
        });
        Ok(())
    }
}

#[derive(Serialize)]
struct EmissionLine<'a> {
    measure: &'a str,
    key: String,
    value: EmittedValue,
}

/// Writes one JSON object per emission:
///
/// ```text
/// {"measure":"PDC-008","key":"denominator_cpsid-1","value":true}
/// ```
pub struct JsonLinesEmitter<W: Write> {
    writer: W,
    written: usize,
}

impl<W: Write> JsonLinesEmitter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Lines written so far
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Emitter for JsonLinesEmitter<W> {
    fn emit(&mut self, measure_id: &str, key: &EmissionKey, value: EmittedValue) -> io::Result<()> {
        let line = EmissionLine {
            measure: measure_id,
            key: key.to_string(),
            value,
        };
        serde_json::to_writer(&mut self.writer, &line)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }
}
