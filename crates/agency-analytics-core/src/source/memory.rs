//! In-memory store, used as a deterministic stand-in for the remote one.

use super::{newest_activity, DataAccess, Dataset};
use crate::error::{Collection, SourceError};
use crate::models::{ActivityLogEntry, Client, Invoice, Project};
use async_trait::async_trait;
use std::sync::{PoisonError, RwLock};

pub struct MemorySource {
    dataset: RwLock<Dataset>,
    failing: RwLock<Option<Collection>>,
}

impl MemorySource {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            dataset: RwLock::new(dataset),
            failing: RwLock::new(None),
        }
    }

    /// Make reads of `collection` fail until cleared with `None`.
    pub fn set_failing(&self, collection: Option<Collection>) {
        *self.failing.write().unwrap_or_else(PoisonError::into_inner) = collection;
    }

    /// Replace the stored records, as a CRUD screen would between passes.
    pub fn replace(&self, dataset: Dataset) {
        *self.dataset.write().unwrap_or_else(PoisonError::into_inner) = dataset;
    }

    fn check(&self, collection: Collection) -> Result<(), SourceError> {
        let failing = *self.failing.read().unwrap_or_else(PoisonError::into_inner);
        if failing == Some(collection) {
            return Err(SourceError::Unavailable(format!(
                "{} are unavailable",
                collection
            )));
        }
        Ok(())
    }

    fn read<T>(
        &self,
        collection: Collection,
        pick: impl FnOnce(&Dataset) -> T,
    ) -> Result<T, SourceError> {
        self.check(collection)?;
        let dataset = self.dataset.read().unwrap_or_else(PoisonError::into_inner);
        Ok(pick(&dataset))
    }
}

#[async_trait]
impl DataAccess for MemorySource {
    async fn list_clients(&self) -> Result<Vec<Client>, SourceError> {
        self.read(Collection::Clients, |d| d.clients.clone())
    }

    async fn list_projects(&self) -> Result<Vec<Project>, SourceError> {
        self.read(Collection::Projects, |d| d.projects.clone())
    }

    async fn list_invoices(&self) -> Result<Vec<Invoice>, SourceError> {
        self.read(Collection::Invoices, |d| d.invoices.clone())
    }

    async fn list_recent_activity(
        &self,
        limit: usize,
    ) -> Result<Vec<ActivityLogEntry>, SourceError> {
        let entries = self.read(Collection::Activity, |d| d.activity.clone())?;
        Ok(newest_activity(entries, limit))
    }
}
