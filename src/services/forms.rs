//! Form reconciliation: builds the render-model of a create/update form from
//! the candidate lists, the current selection and any validation errors.

use std::collections::HashMap;

use serde_json::Value;

use crate::{
    error::AppResult,
    models::{Entity, EntityKind, IdSet, RenderModel},
    validation::{FieldError, Validated},
};

/// How a chosen candidate is flagged for the view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    /// Option of a select input
    Selected,
    /// Checkbox
    Checked,
}

impl Mark {
    pub fn key(&self) -> &'static str {
        match self {
            Mark::Selected => "selected",
            Mark::Checked => "checked",
        }
    }
}

/// Every record a relation field may point at
#[derive(Debug, Clone)]
pub struct CandidateList {
    /// Key of the list in the render-model, e.g. `authors`
    pub key: &'static str,
    /// Relation field the list feeds, e.g. `author`
    pub relation: &'static str,
    pub mark: Mark,
    pub items: Vec<Value>,
}

impl CandidateList {
    pub fn new<E: Entity>(
        key: &'static str,
        relation: &'static str,
        mark: Mark,
        items: &[E],
    ) -> AppResult<Self> {
        let items = items.iter().map(|item| item.view()).collect::<AppResult<_>>()?;
        Ok(Self {
            key,
            relation,
            mark,
            items,
        })
    }

    /// Copy of the list with chosen candidates flagged. Matching is by
    /// identifier text, since submitted values are always strings.
    pub fn marked(&self, chosen: &IdSet) -> Vec<Value> {
        self.items
            .iter()
            .cloned()
            .map(|mut item| {
                let is_chosen = item
                    .get("id")
                    .and_then(Value::as_str)
                    .is_some_and(|id| chosen.contains(id));
                if is_chosen {
                    if let Value::Object(map) = &mut item {
                        map.insert(self.mark.key().to_string(), Value::Bool(true));
                    }
                }
                item
            })
            .collect()
    }
}

/// Chosen identifiers per relation field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    chosen: HashMap<&'static str, IdSet>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, relation: &'static str, ids: IdSet) -> Self {
        self.chosen.insert(relation, ids);
        self
    }

    /// Selection exactly as submitted (after sanitizing)
    pub fn submitted(validated: &Validated, relations: impl Iterator<Item = &'static str>) -> Self {
        relations.fold(Self::new(), |selection, relation| {
            selection.with(relation, validated.ids(relation))
        })
    }

    pub fn get(&self, relation: &str) -> IdSet {
        self.chosen.get(relation).cloned().unwrap_or_default()
    }
}

/// Render-model of an entity form
#[derive(Debug, Clone)]
pub struct FormModel {
    kind: EntityKind,
    title: String,
    entity: Option<Value>,
    candidates: Vec<CandidateList>,
    selection: Selection,
    errors: Vec<FieldError>,
}

impl FormModel {
    pub fn new(kind: EntityKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            entity: None,
            candidates: Vec::new(),
            selection: Selection::new(),
            errors: Vec::new(),
        }
    }

    /// The entity being edited, or the unsaved draft rebuilt from a submission
    pub fn entity<E: Entity>(mut self, entity: &E) -> AppResult<Self> {
        self.entity = Some(entity.view()?);
        Ok(self)
    }

    pub fn candidates(mut self, candidates: Vec<CandidateList>) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    pub fn errors(mut self, errors: Vec<FieldError>) -> Self {
        self.errors = errors;
        self
    }

    pub fn build(self) -> AppResult<RenderModel> {
        let mut model = RenderModel::new(format!("{}_form", self.kind), self.title);
        for list in &self.candidates {
            let marked = list.marked(&self.selection.get(list.relation));
            model = model.insert(list.key, Value::Array(marked));
        }
        if let Some(entity) = self.entity {
            model = model.insert(self.kind.as_str(), entity);
        }
        if !self.errors.is_empty() {
            model = model.with("errors", &self.errors)?;
        }
        Ok(model)
    }
}
