//! Data models for the catalog

pub mod author;
pub mod book;
pub mod book_instance;
pub mod form;
pub mod genre;
pub mod id_set;
pub mod render;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::error::AppResult;

// Re-export commonly used types
pub use author::Author;
pub use book::Book;
pub use book_instance::{BookInstance, BookStatus};
pub use form::Submission;
pub use genre::Genre;
pub use id_set::IdSet;
pub use render::{Outcome, RenderModel};

/// The four record kinds held by the catalog store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Author,
    Book,
    Genre,
    BookInstance,
}

impl EntityKind {
    /// Path segment and storage key for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Author => "author",
            EntityKind::Book => "book",
            EntityKind::Genre => "genre",
            EntityKind::BookInstance => "bookinstance",
        }
    }

    /// `/catalog/<kind>/<id>`
    pub fn detail_url(&self, id: &str) -> String {
        format!("/catalog/{}/{}", self.as_str(), id)
    }

    /// `/catalog/<kind>s`
    pub fn list_url(&self) -> String {
        format!("/catalog/{}s", self.as_str())
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A record stored in the catalog.
///
/// The identifier lives outside the stored document; it is empty on a fresh,
/// unsaved instance and filled in by the store on insert or load.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: EntityKind;

    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);

    fn url(&self) -> String {
        Self::KIND.detail_url(self.id())
    }

    /// Serialized form handed to views, including derived fields
    fn view(&self) -> AppResult<Value> {
        let value = serde_json::to_value(self)?;
        Ok(with_fields(value, [("url", Value::String(self.url()))]))
    }
}

/// Add derived fields to a serialized entity
pub(crate) fn with_fields<const N: usize>(mut value: Value, fields: [(&str, Value); N]) -> Value {
    if let Value::Object(map) = &mut value {
        for (key, field) in fields {
            map.insert(key.to_string(), field);
        }
    }
    value
}
