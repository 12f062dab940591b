//! Referential delete guard: an entity is only removed once nothing points at it

use super::{
    catalog::{with_dependents, CatalogService},
    resource::Resource,
};
use crate::{
    error::AppResult,
    models::{Outcome, RenderModel},
};

/// What a delete would affect
#[derive(Debug, Clone)]
pub struct DeleteProposal<E: Resource> {
    pub entity: Option<E>,
    pub dependents: Vec<E::Dependent>,
}

impl<E: Resource> DeleteProposal<E> {
    pub fn is_blocked(&self) -> bool {
        !self.dependents.is_empty()
    }

    /// Confirmation page listing the dependents, if any
    pub fn render(&self, entity: &E) -> AppResult<RenderModel> {
        let model = RenderModel::new(format!("{}_delete", E::KIND), format!("Delete {}", E::LABEL))
            .insert(E::KIND.as_str(), entity.view()?);
        with_dependents::<E>(model, &self.dependents)
    }
}

pub enum DeleteOutcome<E: Resource> {
    Deleted,
    /// Nothing stored under the id; treated as done
    Missing,
    Blocked(DeleteProposal<E>),
}

impl CatalogService {
    /// Fetch the entity and its dependents together
    pub async fn propose_delete<E: Resource>(&self, id: &str) -> AppResult<DeleteProposal<E>> {
        let resolver = self.resolver();
        let collection = self.repository().collection::<E>();
        let (entity, dependents) = tokio::try_join!(
            resolver.lookup(E::KIND.as_str(), collection.find_by_id(id)),
            resolver.lookup("dependents", self.dependents::<E>(id)),
        )?;
        Ok(DeleteProposal { entity, dependents })
    }

    /// Re-check dependents and delete only when there are none. The check
    /// and the removal are adjacent; no other lookup runs between them.
    pub async fn commit_delete<E: Resource>(&self, id: &str) -> AppResult<DeleteOutcome<E>> {
        let proposal = self.propose_delete::<E>(id).await?;
        if proposal.entity.is_none() {
            tracing::debug!("{} {} already gone", E::KIND, id);
            return Ok(DeleteOutcome::Missing);
        }
        if proposal.is_blocked() {
            tracing::warn!(
                "Refusing to delete {} {}: {} dependent record(s)",
                E::KIND,
                id,
                proposal.dependents.len()
            );
            return Ok(DeleteOutcome::Blocked(proposal));
        }

        if self.repository().collection::<E>().delete(id).await? {
            tracing::info!("Deleted {} {}", E::KIND, id);
            Ok(DeleteOutcome::Deleted)
        } else {
            Ok(DeleteOutcome::Missing)
        }
    }

    /// GET of the delete page: a missing entity sends the user back to the list
    pub async fn delete_form<E: Resource>(&self, id: &str) -> AppResult<Outcome> {
        let proposal = self.propose_delete::<E>(id).await?;
        match &proposal.entity {
            Some(entity) => Ok(Outcome::Render(proposal.render(entity)?)),
            None => Ok(Outcome::Redirect(E::KIND.list_url())),
        }
    }

    /// POST of the delete page
    pub async fn delete<E: Resource>(&self, id: &str) -> AppResult<Outcome> {
        match self.commit_delete::<E>(id).await? {
            DeleteOutcome::Deleted | DeleteOutcome::Missing => Ok(Outcome::Redirect(E::KIND.list_url())),
            DeleteOutcome::Blocked(proposal) => match &proposal.entity {
                Some(entity) => Ok(Outcome::Render(proposal.render(entity)?)),
                None => Ok(Outcome::Redirect(E::KIND.list_url())),
            },
        }
    }
}
