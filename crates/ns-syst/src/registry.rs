//! Bidirectional map between systematic names and the columns they affect.
//!
//! Iteration follows registration order: the first call that mentions a
//! systematic fixes its position, which in turn fixes its slot in every
//! variation catalog built afterwards.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

/// Registry of systematics for one analysis run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SystematicRegistry {
    /// systematic → affected columns
    by_systematic: IndexMap<String, IndexSet<String>>,
    /// column → systematics affecting it
    #[serde(skip)]
    by_variable: IndexMap<String, IndexSet<String>>,
}

impl SystematicRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` as affecting `affected`.
    ///
    /// Repeated calls for the same systematic accumulate; nothing is ever
    /// removed. An empty `affected` still registers the systematic.
    pub fn register_systematic<I, S>(&mut self, name: &str, affected: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let vars = self.by_systematic.entry(name.to_string()).or_default();
        for v in affected {
            let v = v.as_ref();
            vars.insert(v.to_string());
            self.by_variable.entry(v.to_string()).or_default().insert(name.to_string());
        }
    }

    /// All systematic names, in registration order.
    pub fn systematics(&self) -> impl Iterator<Item = &str> {
        self.by_systematic.keys().map(String::as_str)
    }

    /// Number of registered systematics.
    pub fn len(&self) -> usize {
        self.by_systematic.len()
    }

    /// Whether no systematic is registered.
    pub fn is_empty(&self) -> bool {
        self.by_systematic.is_empty()
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.by_systematic.contains_key(name)
    }

    /// Columns affected by `name`; empty if unknown.
    pub fn variables_for_systematic(&self, name: &str) -> Vec<&str> {
        self.by_systematic
            .get(name)
            .map(|vars| vars.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Systematics affecting `variable`, in registration order; empty if unknown.
    pub fn systematics_for_variable(&self, variable: &str) -> Vec<&str> {
        let Some(names) = self.by_variable.get(variable) else {
            return Vec::new();
        };
        let mut out: Vec<(usize, &str)> = names
            .iter()
            .filter_map(|n| self.by_systematic.get_index_of(n).map(|i| (i, n.as_str())))
            .collect();
        out.sort_unstable_by_key(|&(i, _)| i);
        out.into_iter().map(|(_, n)| n).collect()
    }

    /// Whether `variable` is affected by `systematic`.
    pub fn is_affected(&self, variable: &str, systematic: &str) -> bool {
        self.by_variable.get(variable).is_some_and(|s| s.contains(systematic))
    }

    /// Reconcile with an input that already carries precomputed variations.
    ///
    /// For every candidate systematic `S` and every existing column named
    /// `<prefix>_<S>Up` with a non-empty prefix, registers `prefix` as
    /// affected by `S`. The matching `_<S>Down` column is not checked here.
    /// Every candidate is registered, even when nothing matches.
    pub fn register_existing_systematics<S1, S2>(&mut self, systematics: &[S1], columns: &[S2])
    where
        S1: AsRef<str>,
        S2: AsRef<str>,
    {
        for syst in systematics {
            let syst = syst.as_ref();
            let suffix = format!("_{syst}Up");
            let matched: Vec<&str> = columns
                .iter()
                .filter_map(|c| c.as_ref().strip_suffix(suffix.as_str()))
                .filter(|prefix| !prefix.is_empty())
                .collect();
            tracing::debug!(systematic = syst, matched = matched.len(), "resolved existing variations");
            self.register_systematic(syst, matched);
        }
    }
}
