//! Catalog endpoints. Each handler is generic over the record kind; the
//! router instantiates it once per kind.

use axum::extract::{Path, State};
use axum_extra::extract::Form;

use crate::{
    error::AppResult,
    models::{Outcome, RenderModel, Submission},
    services::resource::Resource,
    AppState,
};

/// Catalog home page with record counts
#[utoipa::path(
    get,
    path = "/catalog",
    tag = "catalog",
    responses(
        (status = 200, description = "Home page with record counts", body = RenderModel),
        (status = 500, description = "Store failure", body = crate::error::ErrorResponse),
        (status = 504, description = "A count lookup timed out", body = crate::error::ErrorResponse)
    )
)]
pub async fn index(State(state): State<AppState>) -> AppResult<Outcome> {
    Ok(state.services.catalog.index().await?.into())
}

pub async fn list<E: Resource>(State(state): State<AppState>) -> AppResult<Outcome> {
    Ok(state.services.catalog.list::<E>().await?.into())
}

pub async fn detail<E: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Outcome> {
    Ok(state.services.catalog.detail::<E>(&id).await?.into())
}

pub async fn create_form<E: Resource>(State(state): State<AppState>) -> AppResult<Outcome> {
    Ok(state.services.catalog.create_form::<E>().await?.into())
}

/// Repeated keys (`genre=a&genre=b`) are kept, hence the axum-extra form
pub async fn create<E: Resource>(
    State(state): State<AppState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> AppResult<Outcome> {
    let submission = Submission::from_pairs(pairs);
    state.services.catalog.create::<E>(&submission).await
}

pub async fn update_form<E: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Outcome> {
    Ok(state.services.catalog.update_form::<E>(&id).await?.into())
}

pub async fn update<E: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> AppResult<Outcome> {
    let submission = Submission::from_pairs(pairs);
    state.services.catalog.update::<E>(&id, &submission).await
}

pub async fn delete_form<E: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Outcome> {
    state.services.catalog.delete_form::<E>(&id).await
}

/// The id comes from the path; a body id, if any, is ignored
pub async fn delete<E: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Outcome> {
    state.services.catalog.delete::<E>(&id).await
}
