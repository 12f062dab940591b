//! Sets of referenced identifiers

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Identifiers referenced by a relation field.
///
/// Form submissions may carry a relation as absent, a single value or
/// repeated values; all three normalize to this set. Identifiers are compared
/// as text, never by reference identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdSet(BTreeSet<String>);

impl IdSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(id: impl Into<String>) -> Self {
        Self(BTreeSet::from([id.into()]))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.0.insert(id.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&str> {
        self.0.iter().next().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Rebuild the set by passing each identifier through `f`; identifiers
    /// that come out empty are dropped
    pub fn map(&self, f: impl Fn(&str) -> String) -> Self {
        self.0
            .iter()
            .map(|id| f(id))
            .filter(|id| !id.is_empty())
            .collect()
    }
}

impl<S: Into<String>> FromIterator<S> for IdSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<'a> IntoIterator for &'a IdSet {
    type Item = &'a String;
    type IntoIter = std::collections::btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
