//! Local library catalog server
//!
//! Manages authors, books, genres and physical book copies, with form
//! validation, relation-aware forms and delete guards that refuse to remove
//! records other records still point at.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;
pub mod validation;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub services: std::sync::Arc<services::Services>,
}
