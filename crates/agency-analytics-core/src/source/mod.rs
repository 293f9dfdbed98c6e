//! Read-only access to the remote record store.
//!
//! The aggregation code never talks to a store directly: a pass goes through
//! [`fetch_dataset`], which issues the four reads concurrently and only
//! returns once every one of them has settled.

pub mod file;
pub mod memory;

pub use file::JsonFileSource;
pub use memory::MemorySource;

use crate::error::{AnalyticsError, Collection, Result, SourceError};
use crate::models::{ActivityLogEntry, Client, Invoice, Project};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use tracing::debug;

#[async_trait]
pub trait DataAccess: Send + Sync {
    async fn list_clients(&self) -> std::result::Result<Vec<Client>, SourceError>;

    async fn list_projects(&self) -> std::result::Result<Vec<Project>, SourceError>;

    async fn list_invoices(&self) -> std::result::Result<Vec<Invoice>, SourceError>;

    /// Up to `limit` entries; implementations should return the newest ones.
    async fn list_recent_activity(
        &self,
        limit: usize,
    ) -> std::result::Result<Vec<ActivityLogEntry>, SourceError>;
}

#[async_trait]
impl<T: DataAccess + ?Sized> DataAccess for Box<T> {
    async fn list_clients(&self) -> std::result::Result<Vec<Client>, SourceError> {
        (**self).list_clients().await
    }

    async fn list_projects(&self) -> std::result::Result<Vec<Project>, SourceError> {
        (**self).list_projects().await
    }

    async fn list_invoices(&self) -> std::result::Result<Vec<Invoice>, SourceError> {
        (**self).list_invoices().await
    }

    async fn list_recent_activity(
        &self,
        limit: usize,
    ) -> std::result::Result<Vec<ActivityLogEntry>, SourceError> {
        (**self).list_recent_activity(limit).await
    }
}

/// The frozen input of one pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub clients: Vec<Client>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub invoices: Vec<Invoice>,
    #[serde(default, alias = "activity_logs")]
    pub activity: Vec<ActivityLogEntry>,
}

/// Fan out the four reads and wait for all of them.
///
/// Fails with the first failing collection (in declaration order) if any
/// read fails; the successful reads are discarded in that case.
pub async fn fetch_dataset<S: DataAccess + ?Sized>(
    source: &S,
    activity_limit: usize,
) -> Result<Dataset> {
    let (clients, projects, invoices, activity) = tokio::join!(
        source.list_clients(),
        source.list_projects(),
        source.list_invoices(),
        source.list_recent_activity(activity_limit),
    );

    let dataset = Dataset {
        clients: clients.map_err(fetch_error(Collection::Clients))?,
        projects: projects.map_err(fetch_error(Collection::Projects))?,
        invoices: invoices.map_err(fetch_error(Collection::Invoices))?,
        activity: activity.map_err(fetch_error(Collection::Activity))?,
    };

    debug!(
        clients = dataset.clients.len(),
        projects = dataset.projects.len(),
        invoices = dataset.invoices.len(),
        activity = dataset.activity.len(),
        "Fetched dataset"
    );
    Ok(dataset)
}

fn fetch_error(collection: Collection) -> impl FnOnce(SourceError) -> AnalyticsError {
    move |source| AnalyticsError::Fetch { collection, source }
}

/// Newest-first cut of an activity log, the way the store answers
/// `order=created_at.desc&limit=N`. Rows without a usable timestamp sort last.
pub(crate) fn newest_activity(
    mut entries: Vec<ActivityLogEntry>,
    limit: usize,
) -> Vec<ActivityLogEntry> {
    entries.sort_by_key(|e| Reverse(e.created()));
    entries.truncate(limit);
    entries
}
