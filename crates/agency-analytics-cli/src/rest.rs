//! Remote client store over its REST interface (PostgREST conventions).

use std::time::Duration;

use agency_analytics_core::models::{ActivityLogEntry, Client, Invoice, Project};
use agency_analytics_core::{DataAccess, SourceError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

const CLIENTS_TABLE: &str = "clients";
const PROJECTS_TABLE: &str = "projects";
const INVOICES_TABLE: &str = "invoices";
const ACTIVITY_TABLE: &str = "activity_logs";

/// Joins the owning client's company name onto each row.
const WITH_CLIENT_NAME: &str = "*,clients(company_name)";

pub struct RestSource {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct JoinedClient {
    company_name: Option<String>,
}

#[derive(Deserialize)]
struct ProjectRow {
    #[serde(flatten)]
    project: Project,
    #[serde(default)]
    clients: Option<JoinedClient>,
}

#[derive(Deserialize)]
struct InvoiceRow {
    #[serde(flatten)]
    invoice: Invoice,
    #[serde(default)]
    clients: Option<JoinedClient>,
}

impl RestSource {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Http(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    async fn get_rows<T: DeserializeOwned + Send>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, SourceError> {
        let mut request = self
            .client
            .get(self.table_url(table))
            .query(query)
            .header("Accept", "application/json");
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key).bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SourceError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SourceError::Http(e.to_string()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn select(columns: &str) -> (&'static str, String) {
    ("select", columns.to_string())
}

/// Newest first. Rows without a timestamp go last so they never take a slot
/// from a dated entry.
fn activity_query(limit: usize) -> [(&'static str, String); 3] {
    [
        select("*"),
        ("order", "created_at.desc.nullslast".to_string()),
        ("limit", limit.to_string()),
    ]
}

#[async_trait]
impl DataAccess for RestSource {
    async fn list_clients(&self) -> Result<Vec<Client>, SourceError> {
        self.get_rows(CLIENTS_TABLE, &[select("*")]).await
    }

    async fn list_projects(&self) -> Result<Vec<Project>, SourceError> {
        let rows: Vec<ProjectRow> = self
            .get_rows(PROJECTS_TABLE, &[select(WITH_CLIENT_NAME)])
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let mut project = row.project;
                if project.client_name.is_none() {
                    project.client_name = row.clients.and_then(|c| c.company_name);
                }
                project
            })
            .collect())
    }

    async fn list_invoices(&self) -> Result<Vec<Invoice>, SourceError> {
        let rows: Vec<InvoiceRow> = self
            .get_rows(INVOICES_TABLE, &[select(WITH_CLIENT_NAME)])
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let mut invoice = row.invoice;
                if invoice.client_name.is_none() {
                    invoice.client_name = row.clients.and_then(|c| c.company_name);
                }
                invoice
            })
            .collect())
    }

    async fn list_recent_activity(
        &self,
        limit: usize,
    ) -> Result<Vec<ActivityLogEntry>, SourceError> {
        self.get_rows(ACTIVITY_TABLE, &activity_query(limit)).await
    }
}
