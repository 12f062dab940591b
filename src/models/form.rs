//! Raw form submissions

use indexmap::IndexMap;

use super::IdSet;

/// Field values exactly as submitted: every value is text and a key may be
/// repeated (multi-select and checkbox inputs).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    fields: IndexMap<String, Vec<String>>,
}

impl Submission {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from decoded `key=value` pairs, keeping repeated keys
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut fields: IndexMap<String, Vec<String>> = IndexMap::new();
        for (key, value) in pairs {
            fields.entry(key.into()).or_default().push(value.into());
        }
        Self { fields }
    }

    /// Builder-style helper adding one value for `field`
    pub fn with(mut self, field: &str, value: &str) -> Self {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(value.to_string());
        self
    }

    /// First submitted value for a scalar field
    pub fn scalar(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Every submitted value for a field, in submission order
    pub fn values(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Normalize a relation field to a set of identifiers: absent becomes
    /// empty, a scalar becomes a one-element set, repeated values become the
    /// set of those values. Empty values (a select placeholder, a blank
    /// checkbox value) carry no identifier and are dropped.
    pub fn id_set(&self, field: &str) -> IdSet {
        self.values(field)
            .iter()
            .filter(|value| !value.is_empty())
            .cloned()
            .collect()
    }
}
