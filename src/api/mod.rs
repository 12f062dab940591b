//! HTTP adapter for the catalog: routing and outcome rendering

pub mod catalog;
pub mod health;
pub mod openapi;

use axum::{
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    models::{Author, Book, BookInstance, Genre, Outcome},
    services::resource::Resource,
    AppState,
};

impl IntoResponse for Outcome {
    fn into_response(self) -> Response {
        match self {
            Outcome::Render(model) => Json(model).into_response(),
            Outcome::Redirect(location) => Redirect::to(&location).into_response(),
        }
    }
}

/// List, detail, create, update and delete routes of one kind
fn resource_routes<E: Resource>() -> Router<AppState> {
    let kind = E::KIND.as_str();
    Router::new()
        .route(&E::KIND.list_url(), get(catalog::list::<E>))
        .route(
            &format!("/catalog/{}/create", kind),
            get(catalog::create_form::<E>).post(catalog::create::<E>),
        )
        .route(&format!("/catalog/{}/:id", kind), get(catalog::detail::<E>))
        .route(
            &format!("/catalog/{}/:id/update", kind),
            get(catalog::update_form::<E>).post(catalog::update::<E>),
        )
        .route(
            &format!("/catalog/{}/:id/delete", kind),
            get(catalog::delete_form::<E>).post(catalog::delete::<E>),
        )
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(|| async { Redirect::to("/catalog") }))
        .route("/catalog", get(catalog::index))
        .merge(resource_routes::<Author>())
        .merge(resource_routes::<Book>())
        .merge(resource_routes::<Genre>())
        .merge(resource_routes::<BookInstance>())
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .with_state(state)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
