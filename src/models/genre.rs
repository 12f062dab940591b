//! Genre model

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Entity, EntityKind};

/// Genre record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Genre {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
}

impl Entity for Genre {
    const KIND: EntityKind = EntityKind::Genre;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}
