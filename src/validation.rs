//! Form validation pipeline.
//!
//! Each field has an ordered chain of rules. Sanitizers (trim, escape) rewrite
//! the working value; checks record a [`FieldError`] and let the chain carry
//! on, so one submission reports every rule it breaks, in evaluation order.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use utoipa::ToSchema;
use validator::ValidateLength;

use crate::models::{IdSet, Submission};

/// One failed rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    /// Value the rule saw, after any earlier sanitizers
    pub value: String,
}

#[derive(Debug, Clone)]
enum Rule {
    Trim,
    Escape,
    NotEmpty(&'static str),
    Length {
        min: Option<u64>,
        max: Option<u64>,
        message: &'static str,
    },
    Matches(&'static Regex, &'static str),
    Alphanumeric(&'static str),
    OneOf(&'static [&'static str], &'static str),
    Single(&'static str),
}

#[derive(Debug, Clone, Copy)]
enum FieldKind {
    Text,
    Ids,
    OptionalDate(&'static str),
}

/// Sanitized value of one field
#[derive(Debug, Clone, PartialEq)]
pub enum Sanitized {
    Text(String),
    Ids(IdSet),
    Date(Option<NaiveDate>),
}

/// Rule chain for a single field
#[derive(Debug, Clone)]
pub struct FieldRules {
    field: &'static str,
    kind: FieldKind,
    rules: Vec<Rule>,
}

impl FieldRules {
    /// Scalar text field; absent counts as empty
    pub fn text(field: &'static str) -> Self {
        Self {
            field,
            kind: FieldKind::Text,
            rules: Vec::new(),
        }
    }

    /// Relation field normalized to a set of identifiers
    pub fn ids(field: &'static str) -> Self {
        Self {
            field,
            kind: FieldKind::Ids,
            rules: Vec::new(),
        }
    }

    /// Optional ISO 8601 date: absent or empty skips the check, anything else
    /// must parse or fails with `message`
    pub fn optional_date(field: &'static str, message: &'static str) -> Self {
        Self {
            field,
            kind: FieldKind::OptionalDate(message),
            rules: vec![Rule::Trim],
        }
    }

    pub fn trim(mut self) -> Self {
        self.rules.push(Rule::Trim);
        self
    }

    /// HTML-escape the value (every element for relation fields)
    pub fn escape(mut self) -> Self {
        self.rules.push(Rule::Escape);
        self
    }

    /// Text must be non-empty; a relation must hold at least one identifier
    pub fn not_empty(mut self, message: &'static str) -> Self {
        self.rules.push(Rule::NotEmpty(message));
        self
    }

    /// Character count within `min..=max`
    pub fn length(mut self, min: u64, max: u64, message: &'static str) -> Self {
        self.rules.push(Rule::Length {
            min: Some(min),
            max: Some(max),
            message,
        });
        self
    }

    pub fn max_length(mut self, max: u64, message: &'static str) -> Self {
        self.rules.push(Rule::Length {
            min: None,
            max: Some(max),
            message,
        });
        self
    }

    pub fn matches(mut self, pattern: &'static Regex, message: &'static str) -> Self {
        self.rules.push(Rule::Matches(pattern, message));
        self
    }

    /// Letters and digits only (any script)
    pub fn alphanumeric(mut self, message: &'static str) -> Self {
        self.rules.push(Rule::Alphanumeric(message));
        self
    }

    /// When present, the value must be one of `allowed`
    pub fn one_of(mut self, allowed: &'static [&'static str], message: &'static str) -> Self {
        self.rules.push(Rule::OneOf(allowed, message));
        self
    }

    /// A relation may hold at most one identifier
    pub fn single(mut self, message: &'static str) -> Self {
        self.rules.push(Rule::Single(message));
        self
    }

    fn run(&self, submission: &Submission, errors: &mut Vec<FieldError>) -> Sanitized {
        match self.kind {
            FieldKind::Text => {
                let value = submission.scalar(self.field).unwrap_or_default().to_string();
                Sanitized::Text(self.run_text(value, errors))
            }
            FieldKind::Ids => Sanitized::Ids(self.run_ids(submission.id_set(self.field), errors)),
            FieldKind::OptionalDate(message) => {
                let raw = submission.scalar(self.field).unwrap_or_default().to_string();
                let value = self.run_text(raw, errors);
                if value.is_empty() {
                    return Sanitized::Date(None);
                }
                let date = parse_iso_date(&value);
                if date.is_none() {
                    errors.push(self.error(message, &value));
                }
                Sanitized::Date(date)
            }
        }
    }

    fn run_text(&self, mut value: String, errors: &mut Vec<FieldError>) -> String {
        for rule in &self.rules {
            let failed = match rule {
                Rule::Trim => {
                    value = value.trim().to_string();
                    None
                }
                Rule::Escape => {
                    value = escape(&value);
                    None
                }
                Rule::NotEmpty(message) => value.is_empty().then_some(*message),
                Rule::Length { min, max, message } => {
                    (!value.validate_length(*min, *max, None)).then_some(*message)
                }
                Rule::Matches(pattern, message) => (!pattern.is_match(&value)).then_some(*message),
                Rule::Alphanumeric(message) => {
                    (value.is_empty() || !value.chars().all(char::is_alphanumeric))
                        .then_some(*message)
                }
                Rule::OneOf(allowed, message) => {
                    (!value.is_empty() && !allowed.contains(&value.as_str())).then_some(*message)
                }
                Rule::Single(_) => None,
            };
            if let Some(message) = failed {
                errors.push(self.error(message, &value));
            }
        }
        value
    }

    fn run_ids(&self, mut ids: IdSet, errors: &mut Vec<FieldError>) -> IdSet {
        for rule in &self.rules {
            let failed = match rule {
                Rule::Trim => {
                    ids = ids.map(|id| id.trim().to_string());
                    None
                }
                Rule::Escape => {
                    ids = ids.map(escape);
                    None
                }
                Rule::NotEmpty(message) => ids.is_empty().then_some(*message),
                Rule::Single(message) => (ids.len() > 1).then_some(*message),
                Rule::Length { min, max, message } => {
                    let len = ids.len() as u64;
                    (min.is_some_and(|m| len < m) || max.is_some_and(|m| len > m))
                        .then_some(*message)
                }
                Rule::Matches(pattern, message) => {
                    ids.iter().any(|id| !pattern.is_match(id)).then_some(*message)
                }
                Rule::Alphanumeric(message) => ids
                    .iter()
                    .any(|id| !id.chars().all(char::is_alphanumeric))
                    .then_some(*message),
                Rule::OneOf(allowed, message) => {
                    ids.iter().any(|id| !allowed.contains(&id)).then_some(*message)
                }
            };
            if let Some(message) = failed {
                let shown: Vec<&str> = ids.iter().collect();
                errors.push(self.error(message, &shown.join(",")));
            }
        }
        ids
    }

    fn error(&self, message: &str, value: &str) -> FieldError {
        FieldError {
            field: self.field.to_string(),
            message: message.to_string(),
            value: value.to_string(),
        }
    }
}

/// Ordered rule chains for a whole form
#[derive(Debug, Clone, Default)]
pub struct FormRules {
    fields: Vec<FieldRules>,
}

impl FormRules {
    pub fn new(fields: Vec<FieldRules>) -> Self {
        Self { fields }
    }

    /// Relation fields declared by this form
    pub fn relation_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields
            .iter()
            .filter(|rules| matches!(rules.kind, FieldKind::Ids))
            .map(|rules| rules.field)
    }

    /// Run every chain; a failure in one field never stops the others
    pub fn validate(&self, submission: &Submission) -> Validated {
        let mut errors = Vec::new();
        let mut values = IndexMap::new();
        for rules in &self.fields {
            let value = rules.run(submission, &mut errors);
            values.insert(rules.field, value);
        }
        Validated { values, errors }
    }
}

/// Sanitized values plus every error, in rule-evaluation order
#[derive(Debug, Clone, Default)]
pub struct Validated {
    values: IndexMap<&'static str, Sanitized>,
    pub errors: Vec<FieldError>,
}

impl Validated {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn text(&self, field: &str) -> String {
        match self.values.get(field) {
            Some(Sanitized::Text(value)) => value.clone(),
            _ => String::new(),
        }
    }

    pub fn ids(&self, field: &str) -> IdSet {
        match self.values.get(field) {
            Some(Sanitized::Ids(ids)) => ids.clone(),
            _ => IdSet::new(),
        }
    }

    pub fn date(&self, field: &str) -> Option<NaiveDate> {
        match self.values.get(field) {
            Some(Sanitized::Date(date)) => *date,
            _ => None,
        }
    }
}

/// HTML-escape `& < > " ' / \` and backtick
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            '/' => escaped.push_str("&#x2F;"),
            '\\' => escaped.push_str("&#x5C;"),
            '`' => escaped.push_str("&#96;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Calendar date, date-time or RFC 3339 timestamp
fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
                .ok()
                .map(|dt| dt.date())
        })
}
