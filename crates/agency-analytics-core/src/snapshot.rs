//! The aggregated dashboard value and the pure function that builds it.

use crate::activity::{select_recent, RecentActivity};
use crate::aggregator::{
    aggregate_monthly, calculate_trends, total_revenue, ExclusionCounts, MonthlyMetrics, Trends,
};
use crate::buckets::trailing_months;
use crate::ranking::{rank_clients, ClientRanking};
use crate::source::Dataset;
use crate::status::{status_breakdown, StatusCount};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const DEFAULT_MONTHS: usize = 6;
pub const DEFAULT_ACTIVITY_LIMIT: usize = 15;
pub const DEFAULT_TOP_CLIENTS: usize = 5;

const MAX_MONTHS: usize = 60;
const MAX_ACTIVITY_LIMIT: usize = 200;
const MAX_TOP_CLIENTS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotOptions {
    pub months: usize,
    pub activity_limit: usize,
    pub top_clients: usize,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            months: DEFAULT_MONTHS,
            activity_limit: DEFAULT_ACTIVITY_LIMIT,
            top_clients: DEFAULT_TOP_CLIENTS,
        }
    }
}

impl SnapshotOptions {
    /// Clamp every knob into its supported range. At least one month is
    /// always produced so the newest bucket can hold "now".
    pub fn normalized(self) -> Self {
        Self {
            months: self.months.clamp(1, MAX_MONTHS),
            activity_limit: self.activity_limit.min(MAX_ACTIVITY_LIMIT),
            top_clients: self.top_clients.min(MAX_TOP_CLIENTS),
        }
    }
}

/// One complete, internally consistent aggregation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    pub generated_at: DateTime<Utc>,
    pub total_clients: usize,
    pub total_revenue: f64,
    pub total_projects: usize,
    pub total_invoices: usize,
    pub monthly: Vec<MonthlyMetrics>,
    pub status_breakdown: Vec<StatusCount>,
    pub top_clients: Vec<ClientRanking>,
    pub recent_activity: Vec<RecentActivity>,
    pub trends: Trends,
    pub excluded: ExclusionCounts,
}

/// Aggregate a fetched dataset. Pure: the same `now`, data and options always
/// give the same snapshot.
pub fn build_snapshot(
    now: DateTime<Utc>,
    data: &Dataset,
    options: &SnapshotOptions,
) -> AnalyticsSnapshot {
    let options = options.normalized();
    let mut excluded = ExclusionCounts::default();

    let buckets = trailing_months(now, options.months);
    let monthly = aggregate_monthly(
        &buckets,
        &data.clients,
        &data.projects,
        &data.invoices,
        &mut excluded,
    );
    let total_revenue = total_revenue(&data.invoices, &mut excluded);
    let status_breakdown = status_breakdown(&data.projects, &mut excluded);
    let top_clients = rank_clients(
        &data.clients,
        &data.projects,
        &data.invoices,
        options.top_clients,
    );
    let recent_activity = select_recent(&data.activity, options.activity_limit, &mut excluded);
    let trends = calculate_trends(&monthly);

    if excluded.total() > 0 {
        warn!(excluded = ?excluded, "Some records were left out of the snapshot");
    }
    debug!(
        months = monthly.len(),
        statuses = status_breakdown.len(),
        ranked = top_clients.len(),
        activity = recent_activity.len(),
        "Built analytics snapshot"
    );

    AnalyticsSnapshot {
        generated_at: now,
        total_clients: data.clients.len(),
        total_revenue,
        total_projects: data.projects.len(),
        total_invoices: data.invoices.len(),
        monthly,
        status_breakdown,
        top_clients,
        recent_activity,
        trends,
        excluded,
    }
}
