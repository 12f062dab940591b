//! Book instance (physical copy) model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::{with_fields, Entity, EntityKind};
use crate::error::AppResult;

/// Circulation status of a copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum BookStatus {
    Available,
    #[default]
    Maintenance,
    Loaned,
    Reserved,
}

impl BookStatus {
    pub const ALL: [BookStatus; 4] = [
        BookStatus::Available,
        BookStatus::Maintenance,
        BookStatus::Loaned,
        BookStatus::Reserved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Available => "Available",
            BookStatus::Maintenance => "Maintenance",
            BookStatus::Loaned => "Loaned",
            BookStatus::Reserved => "Reserved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }
}

impl std::fmt::Display for BookStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Book instance record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BookInstance {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Identifier of the book this is a copy of
    pub book: String,
    pub imprint: String,
    #[serde(default)]
    pub status: BookStatus,
    /// Only kept while the copy is not available
    pub due_back: Option<NaiveDate>,
}

impl BookInstance {
    /// Due date as "Oct 18, 2026", empty when unset
    pub fn due_back_formatted(&self) -> String {
        self.due_back
            .map(|d| d.format("%b %-d, %Y").to_string())
            .unwrap_or_default()
    }
}

impl Entity for BookInstance {
    const KIND: EntityKind = EntityKind::BookInstance;

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
                ("due_back_formatted", Value::String(self.due_back_formatted())),
                ("url", Value::String(self.url())),
            ],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!(BookStatus::parse("Loaned"), Some(BookStatus::Loaned));
        assert_eq!(BookStatus::parse("loaned"), None);
        assert_eq!(BookStatus::default(), BookStatus::Maintenance);
    }

    #[test]
    fn test_due_back_formatted() {
        let copy = BookInstance {
            due_back: NaiveDate::from_ymd_opt(2026, 10, 8),
            ..BookInstance::default()
        };
        assert_eq!(copy.due_back_formatted(), "Oct 8, 2026");
        assert_eq!(BookInstance::default().due_back_formatted(), "");
    }
}
