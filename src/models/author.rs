//! Author model

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::{with_fields, Entity, EntityKind};
use crate::error::AppResult;

/// Author record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Author {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub first_name: String,
    pub family_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub date_of_death: Option<NaiveDate>,
}

impl Author {
    /// "family_name, first_name", or empty when either part is missing
    pub fn name(&self) -> String {
        if self.first_name.is_empty() || self.family_name.is_empty() {
            return String::new();
        }
        format!("{}, {}", self.family_name, self.first_name)
    }

    /// "<birth year> - <death year>", leaving out whichever year is unknown
    pub fn lifespan(&self) -> String {
        let year = |date: Option<NaiveDate>| date.map(|d| d.year().to_string()).unwrap_or_default();
        format!("{} - {}", year(self.date_of_birth), year(self.date_of_death))
    }
}

impl Entity for Author {
    const KIND: EntityKind = EntityKind::Author;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn view(&self) -> AppResult<Value> {
        let value = serde_json::to_value(self)?;
        Ok(with_fields(
            value,
            [
                ("name", Value::String(self.name())),
                ("lifespan", Value::String(self.lifespan())),
                ("url", Value::String(self.url())),
            ],
        ))
    }
}
