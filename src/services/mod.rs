//! Business logic services

pub mod catalog;
pub mod forms;
pub mod guard;
pub mod resolver;
pub mod resource;

use crate::{config::CatalogConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &CatalogConfig) -> Self {
        let resolver = resolver::Resolver::new(config.lookup_timeout());
        Self {
            catalog: catalog::CatalogService::new(repository, resolver),
        }
    }
}
