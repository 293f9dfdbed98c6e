//! Dataset export file as a record store.
//!
//! The file holds one JSON document with optional `clients`, `projects`,
//! `invoices` and `activity` arrays. It is re-read on every call so edits
//! between passes are picked up.

use super::{newest_activity, DataAccess, Dataset};
use crate::error::SourceError;
use crate::models::{ActivityLogEntry, Client, Invoice, Project};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Dataset, SourceError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[async_trait]
impl DataAccess for JsonFileSource {
    async fn list_clients(&self) -> Result<Vec<Client>, SourceError> {
        Ok(self.load().await?.clients)
    }

    async fn list_projects(&self) -> Result<Vec<Project>, SourceError> {
        Ok(self.load().await?.projects)
    }

    async fn list_invoices(&self) -> Result<Vec<Invoice>, SourceError> {
        Ok(self.load().await?.invoices)
    }

    async fn list_recent_activity(
        &self,
        limit: usize,
    ) -> Result<Vec<ActivityLogEntry>, SourceError> {
        Ok(newest_activity(self.load().await?.activity, limit))
    }
}
