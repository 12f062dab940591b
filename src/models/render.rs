//! Handler outcomes: a named view with its data, or a redirect

use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::error::AppResult;

/// Named view plus the data needed to produce it
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RenderModel {
    pub view: String,
    pub title: String,
    #[schema(value_type = Object)]
    pub data: Map<String, Value>,
}

impl RenderModel {
    pub fn new(view: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            view: view.into(),
            title: title.into(),
            data: Map::new(),
        }
    }

    /// Attach an already serialized value
    pub fn insert(mut self, key: &str, value: Value) -> Self {
        self.data.insert(key.to_string(), value);
        self
    }

    /// Serialize and attach any value
    pub fn with<T: Serialize + ?Sized>(self, key: &str, value: &T) -> AppResult<Self> {
        Ok(self.insert(key, serde_json::to_value(value)?))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}

/// What a catalog operation decided to do
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Render(RenderModel),
    /// Logical location, e.g. `/catalog/author/<id>`
    Redirect(String),
}

impl Outcome {
    pub fn render(&self) -> Option<&RenderModel> {
        match self {
            Outcome::Render(model) => Some(model),
            Outcome::Redirect(_) => None,
        }
    }

    pub fn redirect(&self) -> Option<&str> {
        match self {
            Outcome::Render(_) => None,
            Outcome::Redirect(location) => Some(location),
        }
    }
}

impl From<RenderModel> for Outcome {
    fn from(model: RenderModel) -> Self {
        Outcome::Render(model)
    }
}
