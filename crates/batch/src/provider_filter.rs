//! Upstream provider filter.
//!
//! A measure may restrict emission to one named provider group. Patients of
//! other providers are still loaded; they are just not part of the measure's
//! output.

use records::ProviderId;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default)]
pub struct ProviderFilter {
    groups: BTreeMap<String, BTreeSet<ProviderId>>,
}

impl ProviderFilter {
    pub fn new(groups: BTreeMap<String, BTreeSet<ProviderId>>) -> Self {
        Self { groups }
    }

    /// Does `group` (if any) admit `provider`?
    ///
    /// No group admits everyone; an unknown group admits no one.
    pub fn admits(&self, group: Option<&str>, provider: &str) -> bool {
        match group {
            None => true,
            Some(name) => self
                .groups
                .get(name)
                .is_some_and(|members| members.contains(provider)),
        }
    }

    pub fn group(&self, name: &str) -> Option<&BTreeSet<ProviderId>> {
        self.groups.get(name)
    }
}
