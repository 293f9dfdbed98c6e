//! Top-client ranking: paid revenue merged with project counts per client.

use crate::models::{non_blank, Client, Invoice, Project, UNKNOWN_CLIENT};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRanking {
    pub name: String,
    pub revenue: f64,
    pub project_count: usize,
}

/// Resolves a record's client reference to a display name.
///
/// Order: the record's own joined name, then the company name of the client
/// with a matching id, then [`UNKNOWN_CLIENT`].
pub struct ClientDirectory<'a> {
    names: HashMap<&'a str, &'a str>,
}

impl<'a> ClientDirectory<'a> {
    pub fn new(clients: &'a [Client]) -> Self {
        let mut names = HashMap::with_capacity(clients.len());
        for client in clients {
            names.entry(client.id.as_str()).or_insert(client.display_name());
        }
        Self { names }
    }

    pub fn resolve(&self, client_id: Option<&'a str>, client_name: Option<&'a str>) -> &'a str {
        if let Some(name) = non_blank(client_name) {
            return name;
        }
        client_id
            .and_then(|id| self.names.get(id).copied())
            .unwrap_or(UNKNOWN_CLIENT)
    }
}

/// Rank clients by paid revenue, keeping at most `limit` entries.
///
/// A client seen only through projects, or only through paid invoices, still
/// gets an entry with the missing side at zero. Ties on revenue go to the
/// client with more projects, then to the name in byte order.
pub fn rank_clients(
    clients: &[Client],
    projects: &[Project],
    invoices: &[Invoice],
    limit: usize,
) -> Vec<ClientRanking> {
    let directory = ClientDirectory::new(clients);
    let mut merged: HashMap<&str, ClientAccumulator> = HashMap::new();

    for invoice in invoices.iter().filter(|i| i.is_paid()) {
        let Some(amount) = invoice.amount() else {
            continue;
        };
        let name = directory.resolve(invoice.client_id.as_deref(), invoice.client_name.as_deref());
        merged.entry(name).or_default().revenue += amount;
    }

    for project in projects {
        let name = directory.resolve(project.client_id.as_deref(), project.client_name.as_deref());
        merged.entry(name).or_default().projects += 1;
    }

    let mut ranking: Vec<ClientRanking> = merged
        .into_iter()
        .map(|(name, acc)| ClientRanking {
            name: name.to_string(),
            revenue: acc.revenue,
            project_count: acc.projects,
        })
        .collect();

    ranking.sort_by(compare_ranking);
    ranking.truncate(limit);
    ranking
}

fn compare_ranking(a: &ClientRanking, b: &ClientRanking) -> Ordering {
    b.revenue
        .total_cmp(&a.revenue)
        .then_with(|| b.project_count.cmp(&a.project_count))
        .then_with(|| a.name.cmp(&b.name))
}

#[derive(Default)]
struct ClientAccumulator {
    revenue: f64,
    projects: usize,
}
