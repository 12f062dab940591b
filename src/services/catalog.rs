//! Catalog service: list, detail, form, save and delete operations, written
//! once and specialized per kind through [`Resource`].

use std::{future::Future, pin::Pin};

use serde_json::{Map, Value};

use super::{
    forms::{FormModel, Selection},
    resolver::Resolver,
    resource::Resource,
};
use crate::{
    error::{AppError, AppResult},
    models::{Author, Book, BookInstance, BookStatus, Entity, Genre, Outcome, RenderModel, Submission},
    repository::{Filter, FindOptions, Repository},
    validation::Validated,
};

type CountLookup = Pin<Box<dyn Future<Output = AppResult<i64>> + Send>>;

fn count_of<E: Entity>(repository: &Repository, filter: Filter) -> CountLookup {
    let collection = repository.collection::<E>();
    Box::pin(async move { collection.count(&filter).await })
}

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    resolver: Resolver,
}

impl CatalogService {
    pub fn new(repository: Repository, resolver: Resolver) -> Self {
        Self {
            repository,
            resolver,
        }
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    pub fn resolver(&self) -> Resolver {
        self.resolver
    }

    /// Home page: record counts, resolved concurrently
    pub async fn index(&self) -> AppResult<RenderModel> {
        let counts = self
            .resolver
            .resolve_all(vec![
                ("book_count", count_of::<Book>(&self.repository, Filter::all())),
                (
                    "book_instance_count",
                    count_of::<BookInstance>(&self.repository, Filter::all()),
                ),
                (
                    "book_instance_available_count",
                    count_of::<BookInstance>(
                        &self.repository,
                        Filter::eq("status", BookStatus::Available.as_str()),
                    ),
                ),
                ("author_count", count_of::<Author>(&self.repository, Filter::all())),
                ("genre_count", count_of::<Genre>(&self.repository, Filter::all())),
            ])
            .await?;

        let data: Map<String, Value> = counts
            .into_iter()
            .map(|(name, count)| (name.to_string(), Value::from(count)))
            .collect();
        Ok(RenderModel::new("index", "Local Library Home").insert("data", Value::Object(data)))
    }

    pub async fn list<E: Resource>(&self) -> AppResult<RenderModel> {
        let items = self
            .resolver
            .lookup(
                E::KIND.as_str(),
                self.repository
                    .collection::<E>()
                    .find_many(&Filter::all(), &E::list_options()),
            )
            .await?;
        let views = E::present_many(self, items).await?;

        Ok(RenderModel::new(
            format!("{}_list", E::KIND),
            format!("{} List", E::LABEL),
        )
        .insert(&format!("{}_list", E::KIND), Value::Array(views)))
    }

    /// Entity plus the records that reference it
    pub async fn detail<E: Resource>(&self, id: &str) -> AppResult<RenderModel> {
        let collection = self.repository.collection::<E>();
        let (entity, dependents) = tokio::try_join!(
            self.resolver.lookup(E::KIND.as_str(), collection.find_by_id(id)),
            self.resolver.lookup("dependents", self.dependents::<E>(id)),
        )?;
        let entity = entity.ok_or_else(|| AppError::NotFound(format!("{} not found", E::LABEL)))?;

        let view = E::present_many(self, vec![entity])
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();
        let title = E::detail_title(&view);

        let model = RenderModel::new(format!("{}_detail", E::KIND), title).insert(E::KIND.as_str(), view);
        with_dependents::<E>(model, &dependents)
    }

    /// Records blocking deletion of `id`
    pub async fn dependents<E: Resource>(&self, id: &str) -> AppResult<Vec<E::Dependent>> {
        match E::dependents_filter(id) {
            Some(filter) => {
                self.repository
                    .collection::<E::Dependent>()
                    .find_many(&filter, &FindOptions::new())
                    .await
            }
            None => Ok(Vec::new()),
        }
    }

    pub async fn create_form<E: Resource>(&self) -> AppResult<RenderModel> {
        let candidates = E::candidates(self).await?;
        FormModel::new(E::KIND, format!("Create {}", E::LABEL))
            .candidates(candidates)
            .build()
    }

    pub async fn create<E: Resource>(&self, submission: &Submission) -> AppResult<Outcome> {
        let title = format!("Create {}", E::LABEL);
        let draft = match self.accept::<E>(submission).await? {
            Ok(accepted) => accepted,
            Err(rejected) => return Ok(Outcome::Render(self.redisplay(&title, rejected).await?)),
        };

        if let Some(existing) = E::find_duplicate(self, &draft).await? {
            tracing::info!("{} already exists as {}", E::LABEL, existing.id());
            return Ok(Outcome::Redirect(existing.url()));
        }

        let saved = self.repository.collection::<E>().insert(&draft).await?;
        tracing::info!("Created {} {}", E::KIND, saved.id());
        Ok(Outcome::Redirect(saved.url()))
    }

    /// Form pre-filled from the stored entity
    pub async fn update_form<E: Resource>(&self, id: &str) -> AppResult<RenderModel> {
        let collection = self.repository.collection::<E>();
        let (entity, candidates) = tokio::try_join!(
            self.resolver.lookup(E::KIND.as_str(), collection.find_by_id(id)),
            E::candidates(self),
        )?;
        let entity = entity.ok_or_else(|| AppError::NotFound(format!("{} not found", E::LABEL)))?;

        FormModel::new(E::KIND, format!("Update {}", E::LABEL))
            .entity(&entity)?
            .candidates(candidates)
            .selection(entity.selection())
            .build()
    }

    pub async fn update<E: Resource>(&self, id: &str, submission: &Submission) -> AppResult<Outcome> {
        let title = format!("Update {}", E::LABEL);
        let mut draft = match self.accept::<E>(submission).await? {
            Ok(accepted) => accepted,
            Err(mut rejected) => {
                rejected.draft.set_id(id.to_string());
                return Ok(Outcome::Render(self.redisplay(&title, rejected).await?));
            }
        };
        draft.set_id(id.to_string());

        if let Some(existing) = E::find_duplicate(self, &draft).await? {
            tracing::info!("{} already exists as {}", E::LABEL, existing.id());
            return Ok(Outcome::Redirect(existing.url()));
        }

        let saved = self.repository.collection::<E>().update(id, &draft).await?;
        tracing::info!("Updated {} {}", E::KIND, saved.id());
        Ok(Outcome::Redirect(saved.url()))
    }

    /// Validate a submission and check its references. A rejected
    /// submission comes back with the draft and its errors for redisplay.
    async fn accept<E: Resource>(
        &self,
        submission: &Submission,
    ) -> AppResult<Result<E, Rejected<E>>> {
        let rules = E::rules();
        let mut validated = rules.validate(submission);
        let draft = E::from_form(&validated);

        if validated.is_valid() {
            validated
                .errors
                .extend(E::check_references(self, &draft).await?);
        }

        if validated.is_valid() {
            Ok(Ok(draft))
        } else {
            tracing::debug!(
                "Rejected {} submission with {} error(s)",
                E::KIND,
                validated.errors.len()
            );
            let selection = Selection::submitted(&validated, rules.relation_fields());
            Ok(Err(Rejected {
                draft,
                selection,
                validated,
            }))
        }
    }

    /// The form again, keeping what the user entered and listing every error
    async fn redisplay<E: Resource>(&self, title: &str, rejected: Rejected<E>) -> AppResult<RenderModel> {
        let candidates = E::candidates(self).await?;
        FormModel::new(E::KIND, title)
            .entity(&rejected.draft)?
            .candidates(candidates)
            .selection(rejected.selection)
            .errors(rejected.validated.errors)
            .build()
    }
}

/// Submission that failed validation or reference checks
struct Rejected<E> {
    draft: E,
    selection: Selection,
    validated: Validated,
}

/// Attach the dependents list when the kind has one
pub(crate) fn with_dependents<E: Resource>(
    model: RenderModel,
    dependents: &[E::Dependent],
) -> AppResult<RenderModel> {
    match E::DEPENDENTS_KEY {
        Some(key) => {
            let views = dependents
                .iter()
                .map(|item| item.view())
                .collect::<AppResult<Vec<_>>>()?;
            Ok(model.insert(key, Value::Array(views)))
        }
        None => Ok(model),
    }
}
