//! Entity store layer.
//!
//! The catalog talks to persistence only through [`EntityStore`], a small
//! document-store contract keyed by [`EntityKind`]. [`Collection`] adds the
//! typed mapping between stored documents and model structs.

pub mod memory;
pub mod postgres;

use std::{cmp::Ordering, marker::PhantomData, sync::Arc};

use async_trait::async_trait;
use serde_json::{Map, Value};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::{
    error::{AppError, AppResult},
    models::{Author, Book, BookInstance, Entity, EntityKind, Genre},
};

/// A stored record: identifier plus the document body (without the id)
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field equals the value
    Eq(String, Value),
    /// Array field holds the value
    Contains(String, Value),
}

/// Conjunction of field conditions; empty matches everything
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self::all().and_eq(field, value)
    }

    pub fn contains(field: &str, value: impl Into<Value>) -> Self {
        Self::all().and_contains(field, value)
    }

    pub fn and_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push(Condition::Eq(field.to_string(), value.into()));
        self
    }

    pub fn and_contains(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push(Condition::Contains(field.to_string(), value.into()));
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Evaluate against a document body
    pub fn matches(&self, data: &Value) -> bool {
        self.conditions.iter().all(|condition| match condition {
            Condition::Eq(field, value) => data.get(field) == Some(value),
            Condition::Contains(field, value) => data
                .get(field)
                .and_then(Value::as_array)
                .is_some_and(|items| items.contains(value)),
        })
    }

    /// JSON containment document equivalent to this filter
    pub fn to_containment(&self) -> Value {
        let mut doc = Map::new();
        for condition in &self.conditions {
            match condition {
                Condition::Eq(field, value) => {
                    doc.insert(field.clone(), value.clone());
                }
                Condition::Contains(field, value) => {
                    let entry = doc
                        .entry(field.clone())
                        .or_insert_with(|| Value::Array(Vec::new()));
                    if let Value::Array(items) = entry {
                        items.push(value.clone());
                    }
                }
            }
        }
        Value::Object(doc)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// Locale-aware, case-insensitive string ordering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collation {
    pub locale: String,
}

impl Collation {
    pub fn english() -> Self {
        Self {
            locale: "en".to_string(),
        }
    }

    /// Primary comparison ignores case and accents; the raw strings break ties
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        collation_key(a)
            .cmp(&collation_key(b))
            .then_with(|| a.cmp(b))
    }
}

fn collation_key(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Sort and collation applied to `find_many`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub sort: Vec<(String, SortDirection)>,
    pub collation: Option<Collation>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sort key; keys apply in the order they are added
    pub fn sort(mut self, field: &str, direction: SortDirection) -> Self {
        self.sort.push((field.to_string(), direction));
        self
    }

    pub fn collation(mut self, collation: Collation) -> Self {
        self.collation = Some(collation);
        self
    }

    /// Compare two document bodies by the sort keys
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        for (field, direction) in &self.sort {
            let ord = compare_values(a.get(field), b.get(field), self.collation.as_ref());
            let ord = match direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

/// Missing and null sort first, then numbers, then strings
fn compare_values(a: Option<&Value>, b: Option<&Value>, collation: Option<&Collation>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::String(x)), Some(Value::String(y))) => match collation {
            Some(collation) => collation.compare(x, y),
            None => x.cmp(y),
        },
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::Number(_)), Some(_)) => Ordering::Less,
        (Some(_), Some(Value::Number(_))) => Ordering::Greater,
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

/// Document store contract used by the catalog
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn find_by_id(&self, kind: EntityKind, id: &str) -> AppResult<Option<Document>>;

    async fn find_many(
        &self,
        kind: EntityKind,
        filter: &Filter,
        options: &FindOptions,
    ) -> AppResult<Vec<Document>>;

    async fn count(&self, kind: EntityKind, filter: &Filter) -> AppResult<i64>;

    /// Store a new document; the store assigns the identifier
    async fn insert(&self, kind: EntityKind, data: Value) -> AppResult<Document>;

    /// Replace a document body; `None` when no such document exists
    async fn update_by_id(
        &self,
        kind: EntityKind,
        id: &str,
        data: Value,
    ) -> AppResult<Option<Document>>;

    /// `false` when no such document existed
    async fn delete_by_id(&self, kind: EntityKind, id: &str) -> AppResult<bool>;

    /// Release connections on shutdown
    async fn close(&self) {}
}

/// Typed view of the documents of one entity kind
pub struct Collection<E> {
    store: Arc<dyn EntityStore>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for Collection<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Collection<E> {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<E>> {
        self.store
            .find_by_id(E::KIND, id)
            .await?
            .map(decode)
            .transpose()
    }

    /// Like `find_by_id`, with a missing record reported as `NotFound`
    pub async fn get(&self, id: &str) -> AppResult<E> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| not_found::<E>(id))
    }

    pub async fn find_many(&self, filter: &Filter, options: &FindOptions) -> AppResult<Vec<E>> {
        self.store
            .find_many(E::KIND, filter, options)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    pub async fn count(&self, filter: &Filter) -> AppResult<i64> {
        self.store.count(E::KIND, filter).await
    }

    pub async fn insert(&self, entity: &E) -> AppResult<E> {
        let doc = self.store.insert(E::KIND, encode(entity)?).await?;
        decode(doc)
    }

    pub async fn update(&self, id: &str, entity: &E) -> AppResult<E> {
        self.store
            .update_by_id(E::KIND, id, encode(entity)?)
            .await?
            .map(decode)
            .transpose()?
            .ok_or_else(|| not_found::<E>(id))
    }

    pub async fn delete(&self, id: &str) -> AppResult<bool> {
        self.store.delete_by_id(E::KIND, id).await
    }
}

fn not_found<E: Entity>(id: &str) -> AppError {
    AppError::NotFound(format!("{} {} not found", E::KIND, id))
}

fn encode<E: Entity>(entity: &E) -> AppResult<Value> {
    let mut data = serde_json::to_value(entity)?;
    if let Value::Object(map) = &mut data {
        map.remove("id");
    }
    Ok(data)
}

fn decode<E: Entity>(doc: Document) -> AppResult<E> {
    let mut entity: E = serde_json::from_value(doc.data).map_err(|e| {
        AppError::Internal(format!("Corrupt {} document {}: {}", E::KIND, doc.id, e))
    })?;
    entity.set_id(doc.id);
    Ok(entity)
}

/// Entry point to the store, shared by every service
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn EntityStore>,
}

impl Repository {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    pub fn collection<E: Entity>(&self) -> Collection<E> {
        Collection::new(self.store.clone())
    }

    pub fn authors(&self) -> Collection<Author> {
        self.collection()
    }

    pub fn books(&self) -> Collection<Book> {
        self.collection()
    }

    pub fn genres(&self) -> Collection<Genre> {
        self.collection()
    }

    pub fn book_instances(&self) -> Collection<BookInstance> {
        self.collection()
    }

    pub async fn close(&self) {
        self.store.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_matches_equality_and_membership() {
        let doc = json!({"author": "a1", "genre": ["g1", "g2"]});
        assert!(Filter::all().matches(&doc));
        assert!(Filter::eq("author", "a1").matches(&doc));
        assert!(!Filter::eq("author", "a2").matches(&doc));
        assert!(Filter::contains("genre", "g2").matches(&doc));
        assert!(!Filter::contains("genre", "g3").matches(&doc));
        assert!(!Filter::contains("author", "a1").matches(&doc));
        assert!(Filter::eq("author", "a1").and_contains("genre", "g1").matches(&doc));
    }

    #[test]
    fn test_filter_containment_document() {
        let filter = Filter::eq("status", "Available")
            .and_contains("genre", "g1")
            .and_contains("genre", "g2");
        assert_eq!(
            filter.to_containment(),
            json!({"status": "Available", "genre": ["g1", "g2"]})
        );
        assert_eq!(Filter::all().to_containment(), json!({}));
    }

    #[test]
    fn test_collation_ignores_case_and_accents() {
        let collation = Collation::english();
        assert_eq!(collation.compare("abel", "Bell"), Ordering::Less);
        assert_eq!(collation.compare("Émile", "Ford"), Ordering::Less);
        assert_eq!(collation.compare("Zola", "émile"), Ordering::Greater);
        // byte order would put "Émile" after "Zola"
        assert!("Émile" > "Zola");
    }

    #[test]
    fn test_find_options_sort_keys_apply_in_order() {
        let options = FindOptions::new()
            .sort("family_name", SortDirection::Ascending)
            .sort("first_name", SortDirection::Descending)
            .collation(Collation::english());
        let a = json!({"family_name": "Bell", "first_name": "Ann"});
        let b = json!({"family_name": "Bell", "first_name": "Zoe"});
        let c = json!({"family_name": "Abel", "first_name": "Ann"});
        assert_eq!(options.compare(&c, &a), Ordering::Less);
        assert_eq!(options.compare(&b, &a), Ordering::Less);
    }

    #[test]
    fn test_missing_values_sort_first() {
        let options = FindOptions::new().sort("title", SortDirection::Ascending);
        assert_eq!(options.compare(&json!({}), &json!({"title": "A"})), Ordering::Less);
    }
}
