//! Ordered, read-only view over one patient's entries of one category.
//!
//! Filters consume a collection and hand back a new one; the underlying
//! [`Entry`] values are borrowed from the [`crate::PatientRecord`] and are
//! never touched.

use crate::types::{Entry, EntryCategory};

#[derive(Debug, Clone, PartialEq)]
pub struct EntryCollection<'a> {
    category: EntryCategory,
    entries: Vec<&'a Entry>,
}

impl<'a> EntryCollection<'a> {
    /// Wrap already-selected entries.
    pub fn new(category: EntryCategory, entries: Vec<&'a Entry>) -> Self {
        Self { category, entries }
    }

    pub fn from_slice(category: EntryCategory, entries: &'a [Entry]) -> Self {
        Self::new(category, entries.iter().collect())
    }

    pub fn empty(category: EntryCategory) -> Self {
        Self::new(category, Vec::new())
    }

    pub fn category(&self) -> EntryCategory {
        self.category
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// T/F: does the collection hold at least one entry?
    pub fn has_match(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&'a Entry> {
        self.entries.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Entry> + '_ {
        self.entries.iter().copied()
    }

    /// Keep the entries for which `keep` returns true, preserving order.
    pub fn retain_where(self, mut keep: impl FnMut(&Entry) -> bool) -> Self {
        let category = self.category;
        let entries = self.entries.into_iter().filter(|entry| keep(*entry)).collect();
        Self { category, entries }
    }
}

impl<'a> IntoIterator for EntryCollection<'a> {
    type Item = &'a Entry;
    type IntoIter = std::vec::IntoIter<&'a Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
