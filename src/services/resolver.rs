//! Concurrent fan-out of independent store lookups.
//!
//! Lookups start together and are joined before the caller continues. The
//! join is all-or-nothing: the first failure (including a lookup exceeding
//! its time budget) fails the whole fan-out and no partial result escapes.

use std::{future::Future, time::Duration};

use indexmap::IndexMap;
use tokio::task::JoinSet;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy)]
pub struct Resolver {
    timeout: Duration,
}

impl Resolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Bound one lookup by the time budget. Meant to be joined with
    /// `tokio::try_join!` alongside the other lookups of the same request.
    pub async fn lookup<T, F>(&self, name: &'static str, lookup: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        match tokio::time::timeout(self.timeout, lookup).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("Lookup {} exceeded {:?}", name, self.timeout);
                Err(AppError::Timeout(name.to_string()))
            }
        }
    }

    /// Run every named lookup as its own task and collect the results under
    /// the same names, in the order given. Remaining tasks are aborted as
    /// soon as one fails.
    pub async fn resolve_all<T, F>(&self, lookups: Vec<(&'static str, F)>) -> AppResult<IndexMap<&'static str, T>>
    where
        T: Send + 'static,
        F: Future<Output = AppResult<T>> + Send + 'static,
    {
        let names: Vec<&'static str> = lookups.iter().map(|(name, _)| *name).collect();
        let mut tasks = JoinSet::new();
        for (index, (name, lookup)) in lookups.into_iter().enumerate() {
            let resolver = *self;
            tasks.spawn(async move { (index, resolver.lookup(name, lookup).await) });
        }

        let mut slots: Vec<Option<T>> = names.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            let (index, result) = joined
                .map_err(|e| AppError::Internal(format!("Lookup task failed: {}", e)))?;
            match result {
                Ok(value) => slots[index] = Some(value),
                Err(e) => {
                    tasks.abort_all();
                    return Err(e);
                }
            }
        }

        names
            .into_iter()
            .zip(slots)
            .map(|(name, slot)| {
                slot.map(|value| (name, value))
                    .ok_or_else(|| AppError::Internal(format!("Lookup {} produced no result", name)))
            })
            .collect()
    }
}
