//! Monthly time-series aggregation over clients, projects and invoices.

use crate::buckets::{bucket_position, MonthBucket};
use crate::models::{Client, Invoice, Project};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

/// Per-bucket totals, in the same order as the buckets they were built from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyMetrics {
    pub label: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub revenue: f64,
    pub client_count: usize,
    pub project_count: usize,
    pub invoice_count: usize,
}

/// How many records each aggregation had to leave out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExclusionCounts {
    /// Paid invoices with a missing, negative or non-numeric total.
    pub invoice_amount: usize,
    /// Invoices whose issue date is missing or unparseable.
    pub invoice_date: usize,
    pub client_date: usize,
    pub project_date: usize,
    pub project_status: usize,
    pub activity_timestamp: usize,
}

impl ExclusionCounts {
    pub fn total(&self) -> usize {
        self.invoice_amount
            + self.invoice_date
            + self.client_date
            + self.project_date
            + self.project_status
            + self.activity_timestamp
    }
}

/// Aggregate the three entity collections into one row per bucket.
///
/// Revenue only counts paid invoices with a valid total; invoice volume
/// counts every invoice by issue date regardless of status.
pub fn aggregate_monthly(
    buckets: &[MonthBucket],
    clients: &[Client],
    projects: &[Project],
    invoices: &[Invoice],
    excluded: &mut ExclusionCounts,
) -> Vec<MonthlyMetrics> {
    let mut accumulators = vec![MonthAccumulator::default(); buckets.len()];

    for client in clients {
        match client.created() {
            Some(ts) => {
                if let Some(i) = bucket_position(buckets, &ts) {
                    accumulators[i].clients += 1;
                }
            }
            None => excluded.client_date += 1,
        }
    }

    for project in projects {
        match project.created() {
            Some(ts) => {
                if let Some(i) = bucket_position(buckets, &ts) {
                    accumulators[i].projects += 1;
                }
            }
            None => excluded.project_date += 1,
        }
    }

    for invoice in invoices {
        let Some(issued) = invoice.issued() else {
            warn!(
                invoice = %invoice.id,
                issue_date = ?invoice.issue_date,
                "Skipping invoice with unparseable issue date in monthly totals"
            );
            excluded.invoice_date += 1;
            continue;
        };
        let Some(i) = bucket_position(buckets, &issued) else {
            continue;
        };

        let acc = &mut accumulators[i];
        acc.invoices += 1;
        if invoice.is_paid() {
            if let Some(amount) = invoice.amount() {
                acc.revenue += amount;
            }
        }
    }

    buckets
        .iter()
        .zip(accumulators)
        .map(|(bucket, acc)| acc.into_metrics(bucket))
        .collect()
}

/// All-time revenue: every paid invoice, independent of any bucket window.
pub fn total_revenue(invoices: &[Invoice], excluded: &mut ExclusionCounts) -> f64 {
    let mut total = 0.0;
    for invoice in invoices.iter().filter(|i| i.is_paid()) {
        match invoice.amount() {
            Some(amount) => total += amount,
            None => {
                warn!(
                    invoice = %invoice.id,
                    total_amount = ?invoice.total_amount,
                    "Skipping paid invoice with invalid total"
                );
                excluded.invoice_amount += 1;
            }
        }
    }
    total
}

/// Change of the newest bucket against the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Trend {
    Change { percent: f64 },
    /// No previous bucket, or the previous value was zero.
    InsufficientHistory,
}

impl Trend {
    pub fn between(current: f64, previous: f64) -> Self {
        if previous > 0.0 && current.is_finite() && previous.is_finite() {
            Trend::Change {
                percent: (current - previous) / previous * 100.0,
            }
        } else {
            Trend::InsufficientHistory
        }
    }

    pub fn percent(&self) -> Option<f64> {
        match self {
            Trend::Change { percent } => Some(*percent),
            Trend::InsufficientHistory => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trends {
    pub revenue: Trend,
    pub clients: Trend,
    pub projects: Trend,
    pub invoices: Trend,
}

impl Default for Trends {
    fn default() -> Self {
        Self {
            revenue: Trend::InsufficientHistory,
            clients: Trend::InsufficientHistory,
            projects: Trend::InsufficientHistory,
            invoices: Trend::InsufficientHistory,
        }
    }
}

pub fn calculate_trends(monthly: &[MonthlyMetrics]) -> Trends {
    let [.., previous, current] = monthly else {
        return Trends::default();
    };

    Trends {
        revenue: Trend::between(current.revenue, previous.revenue),
        clients: Trend::between(current.client_count as f64, previous.client_count as f64),
        projects: Trend::between(current.project_count as f64, previous.project_count as f64),
        invoices: Trend::between(current.invoice_count as f64, previous.invoice_count as f64),
    }
}

// =============================================================================
// Internal helpers
// =============================================================================

#[derive(Debug, Clone, Default)]
struct MonthAccumulator {
    revenue: f64,
    clients: usize,
    projects: usize,
    invoices: usize,
}

impl MonthAccumulator {
    fn into_metrics(self, bucket: &MonthBucket) -> MonthlyMetrics {
        MonthlyMetrics {
            label: bucket.label.clone(),
            start: bucket.start,
            end: bucket.end,
            revenue: self.revenue,
            client_count: self.clients,
            project_count: self.projects,
            invoice_count: self.invoices,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buckets::trailing_months;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 20, 9, 0, 0).unwrap()
    }

    fn mock_invoice(id: &str, status: &str, amount: Option<f64>, issued: Option<&str>) -> Invoice {
        Invoice {
            id: id.to_string(),
            client_id: Some("c1".to_string()),
            client_name: None,
            status: Some(status.to_string()),
            total_amount: amount,
            issue_date: issued.map(str::to_string),
            paid_date: None,
        }
    }

    fn mock_project(id: &str, created: &str) -> Project {
        Project {
            id: id.to_string(),
            status: Some("planning".to_string()),
            created_at: Some(created.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_aggregate_monthly_empty() {
        let buckets = trailing_months(now(), 6);
        let mut excluded = ExclusionCounts::default();
        let monthly = aggregate_monthly(&buckets, &[], &[], &[], &mut excluded);

        assert_eq!(monthly.len(), 6);
        assert!(monthly.iter().all(|m| m.revenue == 0.0
            && m.client_count == 0
            && m.project_count == 0
            && m.invoice_count == 0));
        assert_eq!(excluded, ExclusionCounts::default());
    }

    #[test]
    fn test_paid_and_unpaid_invoices_by_month() {
        let invoices = vec![
            mock_invoice("A", "paid", Some(100.0), Some("2024-03-02")),
            mock_invoice("B", "sent", Some(200.0), Some("2024-03-10")),
            mock_invoice("C", "paid", Some(50.0), Some("2024-02-14")),
        ];
        let buckets = trailing_months(now(), 6);
        let mut excluded = ExclusionCounts::default();

        let monthly = aggregate_monthly(&buckets, &[], &[], &invoices, &mut excluded);
        let total = total_revenue(&invoices, &mut excluded);

        assert_eq!(total, 150.0);
        assert_eq!(monthly[5].label, "Mar 24");
        assert_eq!(monthly[5].revenue, 100.0);
        assert_eq!(monthly[5].invoice_count, 2);
        assert_eq!(monthly[4].revenue, 50.0);
        assert_eq!(monthly[4].invoice_count, 1);
    }

    #[test]
    fn test_total_revenue_ignores_bucket_window() {
        let invoices = vec![
            mock_invoice("old", "paid", Some(1_000.0), Some("2019-06-01")),
            mock_invoice("recent", "paid", Some(10.0), Some("2024-03-01")),
        ];
        let buckets = trailing_months(now(), 6);
        let mut excluded = ExclusionCounts::default();

        let monthly = aggregate_monthly(&buckets, &[], &[], &invoices, &mut excluded);
        let bucket_sum: f64 = monthly.iter().map(|m| m.revenue).sum();

        assert_eq!(total_revenue(&invoices, &mut excluded), 1_010.0);
        assert_eq!(bucket_sum, 10.0);
    }

    #[test]
    fn test_invoice_without_issue_date_counts_in_total_only() {
        let invoices = vec![
            mock_invoice("no-date", "paid", Some(75.0), None),
            mock_invoice("bad-date", "paid", Some(25.0), Some("not a date")),
        ];
        let buckets = trailing_months(now(), 6);
        let mut excluded = ExclusionCounts::default();

        let monthly = aggregate_monthly(&buckets, &[], &[], &invoices, &mut excluded);
        let total = total_revenue(&invoices, &mut excluded);

        assert_eq!(total, 100.0);
        assert!(monthly.iter().all(|m| m.revenue == 0.0 && m.invoice_count == 0));
        assert_eq!(excluded.invoice_date, 2);
        assert_eq!(excluded.invoice_amount, 0);
    }

    #[test]
    fn test_paid_invoice_with_invalid_amount_is_excluded_from_revenue() {
        let invoices = vec![
            mock_invoice("null", "paid", None, Some("2024-03-05")),
            mock_invoice("negative", "paid", Some(-40.0), Some("2024-03-05")),
            mock_invoice("ok", "paid", Some(60.0), Some("2024-03-05")),
            mock_invoice("draft-null", "draft", None, Some("2024-03-05")),
        ];
        let buckets = trailing_months(now(), 6);
        let mut excluded = ExclusionCounts::default();

        let monthly = aggregate_monthly(&buckets, &[], &[], &invoices, &mut excluded);
        let total = total_revenue(&invoices, &mut excluded);

        assert_eq!(total, 60.0);
        assert_eq!(monthly[5].revenue, 60.0);
        assert_eq!(monthly[5].invoice_count, 4);
        assert_eq!(excluded.invoice_amount, 2);
    }

    #[test]
    fn test_new_clients_and_projects_per_month() {
        let clients = vec![
            Client {
                id: "c1".to_string(),
                created_at: Some("2024-01-15T10:00:00Z".to_string()),
                ..Default::default()
            },
            Client {
                id: "c2".to_string(),
                created_at: None,
                ..Default::default()
            },
        ];
        let projects = vec![
            mock_project("p1", "2024-03-01T00:00:00Z"),
            mock_project("p2", "2024-02-29T23:59:59Z"),
            mock_project("p3", "2023-01-01"),
        ];
        let buckets = trailing_months(now(), 6);
        let mut excluded = ExclusionCounts::default();

        let monthly = aggregate_monthly(&buckets, &clients, &projects, &[], &mut excluded);

        assert_eq!(monthly[3].label, "Jan 24");
        assert_eq!(monthly[3].client_count, 1);
        assert_eq!(monthly[4].project_count, 1);
        assert_eq!(monthly[5].project_count, 1);
        assert_eq!(excluded.client_date, 1);
    }

    #[test]
    fn test_month_boundary_is_half_open() {
        let invoices = vec![mock_invoice(
            "edge",
            "paid",
            Some(5.0),
            Some("2024-03-01T00:00:00Z"),
        )];
        let buckets = trailing_months(now(), 6);
        let mut excluded = ExclusionCounts::default();

        let monthly = aggregate_monthly(&buckets, &[], &[], &invoices, &mut excluded);
        assert_eq!(monthly[4].revenue, 0.0);
        assert_eq!(monthly[5].revenue, 5.0);
    }

    #[test]
    fn test_trend_between() {
        assert_eq!(Trend::between(150.0, 100.0), Trend::Change { percent: 50.0 });
        assert_eq!(Trend::between(50.0, 100.0), Trend::Change { percent: -50.0 });
        assert_eq!(Trend::between(10.0, 0.0), Trend::InsufficientHistory);
        assert_eq!(Trend::between(0.0, 0.0).percent(), None);
    }

    #[test]
    fn test_calculate_trends_uses_last_two_buckets() {
        let invoices = vec![
            mock_invoice("feb", "paid", Some(200.0), Some("2024-02-10")),
            mock_invoice("mar", "paid", Some(300.0), Some("2024-03-10")),
        ];
        let buckets = trailing_months(now(), 6);
        let mut excluded = ExclusionCounts::default();
        let monthly = aggregate_monthly(&buckets, &[], &[], &invoices, &mut excluded);

        let trends = calculate_trends(&monthly);
        assert_eq!(trends.revenue, Trend::Change { percent: 50.0 });
        assert_eq!(trends.invoices, Trend::Change { percent: 0.0 });
        assert_eq!(trends.clients, Trend::InsufficientHistory);
    }

    #[test]
    fn test_calculate_trends_single_bucket() {
        let buckets = trailing_months(now(), 1);
        let mut excluded = ExclusionCounts::default();
        let monthly = aggregate_monthly(&buckets, &[], &[], &[], &mut excluded);
        assert_eq!(calculate_trends(&monthly), Trends::default());
    }
}
