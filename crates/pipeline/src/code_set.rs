//! Code sets and the matchers compiled from them.
//!
//! A [`CodeSet`] is plain data: code-system name to codes or patterns. It is
//! compiled into a [`CodeMatcher`] once, when a measure is loaded, using the
//! matching mode of the category it will be applied to:
//!
//! - **Exact** (medications, results, vital signs): a code equals a listed
//!   code, or starts with the prefix of a listed code ending in `*`
//! - **Pattern** (conditions): every listed code is a regular expression
//!   anchored at the start of the entry's code

use crate::error::{CriteriaError, Result};
use records::{Entry, EntryCategory};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Code-system name to codes/patterns, as written in a measure definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodeSet(pub BTreeMap<String, Vec<String>>);

impl CodeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, system: impl Into<String>, codes: &[&str]) -> Self {
        self.0
            .entry(system.into())
            .or_default()
            .extend(codes.iter().map(|c| c.to_string()));
        self
    }

    pub fn systems(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|s| s.as_str())
    }

    pub fn code_count(&self) -> usize {
        self.0.values().map(|codes| codes.len()).sum()
    }
}

/// How codes are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Exact,
    Pattern,
}

impl MatchMode {
    pub fn for_category(category: EntryCategory) -> Self {
        match category {
            EntryCategory::Condition => MatchMode::Pattern,
            _ => MatchMode::Exact,
        }
    }
}

#[derive(Debug, Clone)]
enum SystemMatcher {
    Exact {
        codes: HashSet<String>,
        prefixes: Vec<String>,
    },
    Pattern(Vec<Regex>),
}

impl SystemMatcher {
    fn matches(&self, code: &str) -> bool {
        match self {
            SystemMatcher::Exact { codes, prefixes } => {
                codes.contains(code) || prefixes.iter().any(|p| code.starts_with(p.as_str()))
            }
            SystemMatcher::Pattern(patterns) => patterns.iter().any(|re| re.is_match(code)),
        }
    }
}

/// A compiled [`CodeSet`].
#[derive(Debug, Clone)]
pub struct CodeMatcher {
    mode: MatchMode,
    systems: BTreeMap<String, SystemMatcher>,
}

impl CodeMatcher {
    /// Compile `codes` for the given mode.
    ///
    /// Fails on an empty set, a system with no codes, or (pattern mode) a code
    /// that is not a valid regular expression.
    pub fn compile(codes: &CodeSet, mode: MatchMode) -> Result<Self> {
        if codes.0.is_empty() {
            return Err(CriteriaError::EmptyCodeSet { system: None });
        }

        let mut systems = BTreeMap::new();
        for (system, list) in &codes.0 {
            if list.is_empty() {
                return Err(CriteriaError::EmptyCodeSet {
                    system: Some(system.clone()),
                });
            }
            let matcher = match mode {
                MatchMode::Exact => compile_exact(list),
                MatchMode::Pattern => compile_patterns(system, list)?,
            };
            systems.insert(system.clone(), matcher);
        }

        Ok(Self { mode, systems })
    }

    /// Compile with the mode a category calls for.
    pub fn for_category(codes: &CodeSet, category: EntryCategory) -> Result<Self> {
        Self::compile(codes, MatchMode::for_category(category))
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Does any code of `entry`, in a system this matcher knows, match?
    pub fn matches(&self, entry: &Entry) -> bool {
        self.systems.iter().any(|(system, matcher)| {
            entry
                .codes_for(system)
                .iter()
                .any(|code| matcher.matches(code))
        })
    }
}

fn compile_exact(list: &[String]) -> SystemMatcher {
    let mut codes = HashSet::new();
    let mut prefixes = Vec::new();
    for code in list {
        match code.strip_suffix('*') {
            Some(prefix) => prefixes.push(prefix.to_string()),
            None => {
                codes.insert(code.clone());
            }
        }
    }
    SystemMatcher::Exact { codes, prefixes }
}

fn compile_patterns(system: &str, list: &[String]) -> Result<SystemMatcher> {
    list.iter()
        .map(|pattern| {
            // Grouped so every alternative is anchored; an inner `^` is a no-op
            let anchored = format!("^(?:{})", pattern);
            Regex::new(&anchored).map_err(|source| CriteriaError::InvalidPattern {
                system: system.to_string(),
                pattern: pattern.clone(),
                source,
            })
        })
        .collect::<Result<Vec<_>>>()
        .map(SystemMatcher::Pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn condition(code: &str) -> Entry {
        Entry::new(EntryCategory::Condition).with_code("ICD9", code)
    }

    fn medication(system: &str, code: &str) -> Entry {
        Entry::new(EntryCategory::Medication).with_code(system, code)
    }

    #[test]
    fn test_pattern_mode_is_anchored_at_start() {
        let codes = CodeSet::new().with("ICD9", &["250"]);
        let matcher = CodeMatcher::for_category(&codes, EntryCategory::Condition).unwrap();

        assert!(matcher.matches(&condition("250")));
        assert!(matcher.matches(&condition("2500")));
        assert!(matcher.matches(&condition("250.01")));
        assert!(!matcher.matches(&condition("1250")));
        assert!(!matcher.matches(&condition("025")));
    }

    #[test]
    fn test_pattern_mode_accepts_explicit_anchors() {
        let codes = CodeSet::new().with("LOINC", &["^14771-0$"]);
        let matcher = CodeMatcher::compile(&codes, MatchMode::Pattern).unwrap();

        let exact = Entry::new(EntryCategory::Condition).with_code("LOINC", "14771-0");
        let longer = Entry::new(EntryCategory::Condition).with_code("LOINC", "14771-01");
        assert!(matcher.matches(&exact));
        assert!(!matcher.matches(&longer));
    }

    #[test]
    fn test_every_alternative_is_anchored() {
        for pattern in ["^250|401", "250|401"] {
            let codes = CodeSet::new().with("ICD9", &[pattern]);
            let matcher = CodeMatcher::for_category(&codes, EntryCategory::Condition).unwrap();

            assert!(matcher.matches(&condition("250.00")), "{}", pattern);
            assert!(matcher.matches(&condition("401.9")), "{}", pattern);
            assert!(!matcher.matches(&condition("1401")), "{}", pattern);
            assert!(!matcher.matches(&condition("1250")), "{}", pattern);
        }
    }

    #[test]
    fn test_exact_mode_with_wildcard_prefix() {
        let codes = CodeSet::new()
            .with("whoATC", &["C01AA*"])
            .with("HC-DIN", &["02281236"]);
        let matcher = CodeMatcher::for_category(&codes, EntryCategory::Medication).unwrap();

        assert!(matcher.matches(&medication("whoATC", "C01AA05")));
        assert!(!matcher.matches(&medication("whoATC", "C01AB05")));
        assert!(matcher.matches(&medication("HC-DIN", "02281236")));
        assert!(!matcher.matches(&medication("HC-DIN", "022812360")));
    }

    #[test]
    fn test_exact_mode_is_not_a_regex() {
        let codes = CodeSet::new().with("LOINC", &["56115.9"]);
        let matcher = CodeMatcher::for_category(&codes, EntryCategory::VitalSign).unwrap();

        let entry = Entry::new(EntryCategory::VitalSign).with_code("LOINC", "56115-9");
        assert!(!matcher.matches(&entry));
    }

    #[test]
    fn test_unknown_systems_never_match() {
        let codes = CodeSet::new().with("LOINC", &["39156-5"]);
        let matcher = CodeMatcher::for_category(&codes, EntryCategory::Result).unwrap();

        let other_system = Entry::new(EntryCategory::Result).with_code("pCLOCD", "39156-5");
        let uncoded = Entry::new(EntryCategory::Result);
        assert!(!matcher.matches(&other_system));
        assert!(!matcher.matches(&uncoded));
    }

    #[test]
    fn test_invalid_pattern_fails_compile() {
        let codes = CodeSet::new().with("ICD9", &["250("]);
        let err = CodeMatcher::for_category(&codes, EntryCategory::Condition).unwrap_err();
        assert!(matches!(err, CriteriaError::InvalidPattern { .. }));

        // The same text is fine as an exact code
        assert!(CodeMatcher::for_category(&codes, EntryCategory::Result).is_ok());
    }

    #[test]
    fn test_empty_code_sets_fail_compile() {
        assert!(CodeMatcher::compile(&CodeSet::new(), MatchMode::Exact).is_err());

        let empty_system = CodeSet::new().with("LOINC", &[]);
        let err = CodeMatcher::compile(&empty_system, MatchMode::Exact).unwrap_err();
        assert!(matches!(err, CriteriaError::EmptyCodeSet { system: Some(_) }));
    }
}
