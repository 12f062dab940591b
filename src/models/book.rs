//! Book model

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Entity, EntityKind, IdSet};

/// Book record. `author` and `genre` hold identifiers of the referenced
/// records; they are resolved separately when a view needs them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Book {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub title: String,
    pub summary: String,
    pub isbn: String,
    pub author: String,
    #[serde(default)]
    #[schema(value_type = Vec<String>)]
    pub genre: IdSet,
}

impl Entity for Book {
    const KIND: EntityKind = EntityKind::Book;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}
