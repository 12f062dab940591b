//! In-process entity store.
//!
//! Keeps documents per kind in insertion order, which is the order unsorted
//! queries return them in.

use std::collections::HashMap;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Document, EntityStore, Filter, FindOptions};
use crate::{error::AppResult, models::EntityKind};

#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<EntityKind, IndexMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn find_by_id(&self, kind: EntityKind, id: &str) -> AppResult<Option<Document>> {
        let documents = self.documents.read().await;
        Ok(documents
            .get(&kind)
            .and_then(|docs| docs.get(id))
            .map(|data| Document {
                id: id.to_string(),
                data: data.clone(),
            }))
    }

    async fn find_many(
        &self,
        kind: EntityKind,
        filter: &Filter,
        options: &FindOptions,
    ) -> AppResult<Vec<Document>> {
        let documents = self.documents.read().await;
        let mut found: Vec<Document> = documents
            .get(&kind)
            .into_iter()
            .flat_map(|docs| docs.iter())
            .filter(|(_, data)| filter.matches(data))
            .map(|(id, data)| Document {
                id: id.clone(),
                data: data.clone(),
            })
            .collect();
        found.sort_by(|a, b| options.compare(&a.data, &b.data));
        Ok(found)
    }

    async fn count(&self, kind: EntityKind, filter: &Filter) -> AppResult<i64> {
        let documents = self.documents.read().await;
        let count = documents
            .get(&kind)
            .map(|docs| docs.values().filter(|data| filter.matches(data)).count())
            .unwrap_or(0);
        Ok(count as i64)
    }

    async fn insert(&self, kind: EntityKind, data: Value) -> AppResult<Document> {
        let id = Uuid::new_v4().to_string();
        let mut documents = self.documents.write().await;
        documents
            .entry(kind)
            .or_default()
            .insert(id.clone(), data.clone());
        Ok(Document { id, data })
    }

    async fn update_by_id(
        &self,
        kind: EntityKind,
        id: &str,
        data: Value,
    ) -> AppResult<Option<Document>> {
        let mut documents = self.documents.write().await;
        let Some(existing) = documents.get_mut(&kind).and_then(|docs| docs.get_mut(id)) else {
            return Ok(None);
        };
        *existing = data.clone();
        Ok(Some(Document {
            id: id.to_string(),
            data,
        }))
    }

    async fn delete_by_id(&self, kind: EntityKind, id: &str) -> AppResult<bool> {
        let mut documents = self.documents.write().await;
        Ok(documents
            .get_mut(&kind)
            .and_then(|docs| docs.shift_remove(id))
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{Collation, SortDirection};
    use serde_json::json;

    #[tokio::test]
    async fn test_crud_cycle() {
        let store = MemoryStore::new();
        let doc = store
            .insert(EntityKind::Genre, json!({"name": "Fantasy"}))
            .await
            .unwrap();

        let found = store.find_by_id(EntityKind::Genre, &doc.id).await.unwrap();
        assert_eq!(found, Some(doc.clone()));
        assert!(store.find_by_id(EntityKind::Author, &doc.id).await.unwrap().is_none());

        let updated = store
            .update_by_id(EntityKind::Genre, &doc.id, json!({"name": "Science Fiction"}))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.data["name"], "Science Fiction");

        assert!(store.delete_by_id(EntityKind::Genre, &doc.id).await.unwrap());
        assert!(!store.delete_by_id(EntityKind::Genre, &doc.id).await.unwrap());
        assert!(store
            .update_by_id(EntityKind::Genre, &doc.id, json!({}))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_find_many_sorted_with_collation() {
        let store = MemoryStore::new();
        for name in ["bell", "Abel", "Émile", "Zola"] {
            store
                .insert(EntityKind::Author, json!({"family_name": name}))
                .await
                .unwrap();
        }

        let options = FindOptions::new()
            .sort("family_name", SortDirection::Ascending)
            .collation(Collation::english());
        let names: Vec<String> = store
            .find_many(EntityKind::Author, &Filter::all(), &options)
            .await
            .unwrap()
            .into_iter()
            .map(|doc| doc.data["family_name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["Abel", "bell", "Émile", "Zola"]);
    }

    #[tokio::test]
    async fn test_count_with_filter() {
        let store = MemoryStore::new();
        store
            .insert(EntityKind::BookInstance, json!({"status": "Available"}))
            .await
            .unwrap();
        store
            .insert(EntityKind::BookInstance, json!({"status": "Loaned"}))
            .await
            .unwrap();

        let available = Filter::eq("status", "Available");
        assert_eq!(store.count(EntityKind::BookInstance, &available).await.unwrap(), 1);
        assert_eq!(store.count(EntityKind::BookInstance, &Filter::all()).await.unwrap(), 2);
        assert_eq!(store.count(EntityKind::Book, &Filter::all()).await.unwrap(), 0);
    }
}
