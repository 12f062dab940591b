//! Per-kind behaviour plugged into the generic catalog operations

use std::collections::HashMap;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::{
    catalog::CatalogService,
    forms::{CandidateList, Mark, Selection},
};
use crate::{
    error::AppResult,
    models::{Author, Book, BookInstance, BookStatus, Entity, Genre, IdSet},
    repository::{Collation, Filter, FindOptions, SortDirection},
    validation::{FieldError, FieldRules, FormRules, Validated},
};

/// Capabilities every catalog kind exposes: list, detail, create, update and
/// guarded delete are written once in [`CatalogService`] against this trait.
#[async_trait]
pub trait Resource: Entity {
    /// Human-readable name, e.g. "Book Instance"
    const LABEL: &'static str;

    /// Render-model key of the dependents shown on detail and delete views
    const DEPENDENTS_KEY: Option<&'static str>;

    /// Kind of record that references this one
    type Dependent: Entity;

    /// Ordering of the list view
    fn list_options() -> FindOptions;

    /// Validation chain of the create/update form
    fn rules() -> FormRules;

    /// Fresh, unsaved entity from sanitized form values
    fn from_form(form: &Validated) -> Self;

    /// Records holding a reference to `id`; they block its deletion
    fn dependents_filter(_id: &str) -> Option<Filter> {
        None
    }

    /// Identifiers this entity currently references, per relation field
    fn selection(&self) -> Selection {
        Selection::new()
    }

    fn detail_title(_view: &Value) -> String {
        format!("{} Detail", Self::LABEL)
    }

    /// Unmarked candidate lists for the form
    async fn candidates(_catalog: &CatalogService) -> AppResult<Vec<CandidateList>> {
        Ok(Vec::new())
    }

    /// Views with references resolved
    async fn present_many(_catalog: &CatalogService, items: Vec<Self>) -> AppResult<Vec<Value>> {
        items.iter().map(|item| item.view()).collect()
    }

    /// An existing record the draft duplicates; saving redirects there instead
    async fn find_duplicate(_catalog: &CatalogService, _draft: &Self) -> AppResult<Option<Self>> {
        Ok(None)
    }

    /// References of the draft that do not resolve to a stored record
    async fn check_references(_catalog: &CatalogService, _draft: &Self) -> AppResult<Vec<FieldError>> {
        Ok(Vec::new())
    }
}

fn by_field(field: &str) -> FindOptions {
    FindOptions::new()
        .sort(field, SortDirection::Ascending)
        .collation(Collation::english())
}

fn missing(field: &str, message: &str, value: &str) -> FieldError {
    FieldError {
        field: field.to_string(),
        message: message.to_string(),
        value: value.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Author
// ---------------------------------------------------------------------------

#[async_trait]
impl Resource for Author {
    const LABEL: &'static str = "Author";
    const DEPENDENTS_KEY: Option<&'static str> = Some("author_books");
    type Dependent = Book;

    fn list_options() -> FindOptions {
        by_field("family_name").sort("first_name", SortDirection::Ascending)
    }

    fn rules() -> FormRules {
        FormRules::new(vec![
            FieldRules::text("first_name")
                .trim()
                .not_empty("First name must be specified.")
                .max_length(100, "First name must be at most 100 characters.")
                .escape()
                .alphanumeric("First name has non-alphanumeric characters."),
            FieldRules::text("family_name")
                .trim()
                .not_empty("Family name must be specified.")
                .max_length(100, "Family name must be at most 100 characters.")
                .escape()
                .alphanumeric("Family name has non-alphanumeric characters."),
            FieldRules::optional_date("date_of_birth", "Invalid date of birth"),
            FieldRules::optional_date("date_of_death", "Invalid date of death"),
        ])
    }

    fn from_form(form: &Validated) -> Self {
        Author {
            id: String::new(),
            first_name: form.text("first_name"),
            family_name: form.text("family_name"),
            date_of_birth: form.date("date_of_birth"),
            date_of_death: form.date("date_of_death"),
        }
    }

    fn dependents_filter(id: &str) -> Option<Filter> {
        Some(Filter::eq("author", id))
    }
}

// ---------------------------------------------------------------------------
// Genre
// ---------------------------------------------------------------------------

static GENRE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z]+?([a-zA-Z- ]+)$").expect("valid genre pattern"));

#[async_trait]
impl Resource for Genre {
    const LABEL: &'static str = "Genre";
    const DEPENDENTS_KEY: Option<&'static str> = Some("genre_books");
    type Dependent = Book;

    fn list_options() -> FindOptions {
        by_field("name")
    }

    fn rules() -> FormRules {
        FormRules::new(vec![FieldRules::text("name")
            .trim()
            .not_empty("Genre name is required")
            .matches(&GENRE_NAME, "Name must be alphabet letters.")
            .length(3, 100, "Name must be between 3 and 100 characters in length")
            .escape()])
    }

    fn from_form(form: &Validated) -> Self {
        Genre {
            id: String::new(),
            name: form.text("name"),
        }
    }

    fn dependents_filter(id: &str) -> Option<Filter> {
        Some(Filter::contains("genre", id))
    }

    async fn find_duplicate(catalog: &CatalogService, draft: &Self) -> AppResult<Option<Self>> {
        let found = catalog
            .repository()
            .genres()
            .find_many(&Filter::eq("name", draft.name.as_str()), &FindOptions::new())
            .await?;
        Ok(found.into_iter().find(|genre| genre.id != draft.id))
    }
}

// ---------------------------------------------------------------------------
// Book
// ---------------------------------------------------------------------------

#[async_trait]
impl Resource for Book {
    const LABEL: &'static str = "Book";
    const DEPENDENTS_KEY: Option<&'static str> = Some("book_instances");
    type Dependent = BookInstance;

    fn list_options() -> FindOptions {
        by_field("title")
    }

    fn rules() -> FormRules {
        FormRules::new(vec![
            FieldRules::text("title")
                .trim()
                .not_empty("Title must not be empty.")
                .escape(),
            FieldRules::ids("author")
                .escape()
                .not_empty("Author must not be empty.")
                .single("Only one author may be selected."),
            FieldRules::text("summary")
                .trim()
                .not_empty("Summary must not be empty.")
                .escape(),
            FieldRules::text("isbn")
                .trim()
                .not_empty("ISBN must not be empty")
                .escape(),
            FieldRules::ids("genre").escape(),
        ])
    }

    fn from_form(form: &Validated) -> Self {
        Book {
            id: String::new(),
            title: form.text("title"),
            summary: form.text("summary"),
            isbn: form.text("isbn"),
            author: form.ids("author").first().unwrap_or_default().to_string(),
            genre: form.ids("genre"),
        }
    }

    fn dependents_filter(id: &str) -> Option<Filter> {
        Some(Filter::eq("book", id))
    }

    fn selection(&self) -> Selection {
        let author = if self.author.is_empty() {
            IdSet::new()
        } else {
            IdSet::single(self.author.as_str())
        };
        Selection::new()
            .with("author", author)
            .with("genre", self.genre.clone())
    }

    fn detail_title(view: &Value) -> String {
        view["title"].as_str().unwrap_or(Self::LABEL).to_string()
    }

    async fn candidates(catalog: &CatalogService) -> AppResult<Vec<CandidateList>> {
        let resolver = catalog.resolver();
        let author_collection = catalog.repository().authors();
        let genre_collection = catalog.repository().genres();
        let all = Filter::all();
        let (by_family_name, by_name) = (Author::list_options(), Genre::list_options());
        let (authors, genres) = tokio::try_join!(
            resolver.lookup("authors", author_collection.find_many(&all, &by_family_name)),
            resolver.lookup("genres", genre_collection.find_many(&all, &by_name)),
        )?;
        Ok(vec![
            CandidateList::new("authors", "author", Mark::Selected, &authors)?,
            CandidateList::new("genres", "genre", Mark::Checked, &genres)?,
        ])
    }

    async fn present_many(catalog: &CatalogService, items: Vec<Self>) -> AppResult<Vec<Value>> {
        let resolver = catalog.resolver();
        let author_collection = catalog.repository().authors();
        let genre_collection = catalog.repository().genres();
        let (all, unordered, by_name) = (Filter::all(), FindOptions::new(), Genre::list_options());
        let (authors, genres) = tokio::try_join!(
            resolver.lookup("authors", author_collection.find_many(&all, &unordered)),
            resolver.lookup("genres", genre_collection.find_many(&all, &by_name)),
        )?;
        let authors: HashMap<&str, &Author> = authors.iter().map(|a| (a.id.as_str(), a)).collect();

        items
            .iter()
            .map(|book| {
                let mut view = book.view()?;
                let author = match authors.get(book.author.as_str()) {
                    Some(author) => author.view()?,
                    None => Value::Null,
                };
                // genres come back sorted by name
                let genre = genres
                    .iter()
                    .filter(|genre| book.genre.contains(&genre.id))
                    .map(|item| item.view())
                    .collect::<AppResult<Vec<_>>>()?;
                if let Value::Object(map) = &mut view {
                    map.insert("author".to_string(), author);
                    map.insert("genre".to_string(), Value::Array(genre));
                }
                Ok(view)
            })
            .collect()
    }

    async fn check_references(catalog: &CatalogService, draft: &Self) -> AppResult<Vec<FieldError>> {
        let resolver = catalog.resolver();
        let author_collection = catalog.repository().authors();
        let genre_collection = catalog.repository().genres();
        let (all, unordered) = (Filter::all(), FindOptions::new());
        let (author, genres) = tokio::try_join!(
            resolver.lookup("author", author_collection.find_by_id(&draft.author)),
            resolver.lookup("genres", genre_collection.find_many(&all, &unordered)),
        )?;

        let mut errors = Vec::new();
        if author.is_none() {
            errors.push(missing("author", "Author not found.", &draft.author));
        }
        for id in draft.genre.iter() {
            if !genres.iter().any(|genre| genre.id == id) {
                errors.push(missing("genre", "Genre not found.", id));
            }
        }
        Ok(errors)
    }
}

// ---------------------------------------------------------------------------
// BookInstance
// ---------------------------------------------------------------------------

const STATUSES: &[&str] = &["Available", "Maintenance", "Loaned", "Reserved"];

#[async_trait]
impl Resource for BookInstance {
    const LABEL: &'static str = "Book Instance";
    const DEPENDENTS_KEY: Option<&'static str> = None;
    type Dependent = BookInstance;

    fn list_options() -> FindOptions {
        FindOptions::new()
    }

    fn rules() -> FormRules {
        FormRules::new(vec![
            FieldRules::ids("book")
                .trim()
                .not_empty("Book must be specified")
                .single("Only one book may be selected.")
                .escape(),
            FieldRules::text("imprint")
                .trim()
                .not_empty("Imprint must be specified")
                .escape(),
            FieldRules::text("status")
                .escape()
                .one_of(STATUSES, "Invalid status"),
            FieldRules::optional_date("due_back", "Invalid date"),
        ])
    }

    fn from_form(form: &Validated) -> Self {
        let status = BookStatus::parse(&form.text("status")).unwrap_or_default();
        let due_back = match status {
            BookStatus::Available => None,
            _ => form.date("due_back"),
        };
        BookInstance {
            id: String::new(),
            book: form.ids("book").first().unwrap_or_default().to_string(),
            imprint: form.text("imprint"),
            status,
            due_back,
        }
    }

    fn selection(&self) -> Selection {
        Selection::new().with("book", IdSet::single(self.book.as_str()))
    }

    fn detail_title(view: &Value) -> String {
        format!("Copy: {}", view["book"]["title"].as_str().unwrap_or_default())
    }

    async fn candidates(catalog: &CatalogService) -> AppResult<Vec<CandidateList>> {
        let books = catalog
            .resolver()
            .lookup(
                "books",
                catalog
                    .repository()
                    .books()
                    .find_many(&Filter::all(), &Book::list_options()),
            )
            .await?;
        Ok(vec![CandidateList::new("book_list", "book", Mark::Selected, &books)?])
    }

    /// Copies with their book attached, ordered by book title
    async fn present_many(catalog: &CatalogService, mut items: Vec<Self>) -> AppResult<Vec<Value>> {
        let books = catalog
            .resolver()
            .lookup(
                "books",
                catalog
                    .repository()
                    .books()
                    .find_many(&Filter::all(), &FindOptions::new()),
            )
            .await?;
        let books: HashMap<&str, &Book> = books.iter().map(|b| (b.id.as_str(), b)).collect();

        let title = |copy: &BookInstance| {
            books
                .get(copy.book.as_str())
                .map(|book| book.title.clone())
                .unwrap_or_default()
        };
        let collation = Collation::english();
        items.sort_by(|a, b| collation.compare(&title(a), &title(b)));

        items
            .iter()
            .map(|copy| {
                let mut view = copy.view()?;
                let book = match books.get(copy.book.as_str()) {
                    Some(book) => book.view()?,
                    None => Value::Null,
                };
                if let Value::Object(map) = &mut view {
                    map.insert("book".to_string(), book);
                }
                Ok(view)
            })
            .collect()
    }

    async fn check_references(catalog: &CatalogService, draft: &Self) -> AppResult<Vec<FieldError>> {
        let book = catalog
            .resolver()
            .lookup("book", catalog.repository().books().find_by_id(&draft.book))
            .await?;
        Ok(match book {
            Some(_) => Vec::new(),
            None => vec![missing("book", "Book not found.", &draft.book)],
        })
    }
}
