//! Human-readable and JSON rendering of a snapshot.

use agency_analytics_core::{AnalyticsSnapshot, MonthBucket, Trend};
use anyhow::Result;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

const CURRENCY: &str = "£";

pub fn print_json(snapshot: &AnalyticsSnapshot) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(snapshot)?);
    Ok(())
}

pub fn print_tables(snapshot: &AnalyticsSnapshot) {
    println!(
        "{}",
        format!(
            "Dashboard snapshot ({} UTC)",
            snapshot.generated_at.format("%Y-%m-%d %H:%M")
        )
        .bold()
    );
    println!(
        "  Clients: {} ({})  Projects: {} ({})  Invoices: {} ({})  Revenue: {} ({})",
        snapshot.total_clients,
        format_trend(&snapshot.trends.clients),
        snapshot.total_projects,
        format_trend(&snapshot.trends.projects),
        snapshot.total_invoices,
        format_trend(&snapshot.trends.invoices),
        format_currency(snapshot.total_revenue),
        format_trend(&snapshot.trends.revenue),
    );

    println!("\n{}", "Monthly".bold());
    let mut monthly = new_table(vec![
        "Month",
        "Revenue",
        "New clients",
        "New projects",
        "Invoices",
    ]);
    for month in &snapshot.monthly {
        monthly.add_row(vec![
            month.label.clone(),
            format_currency(month.revenue),
            month.client_count.to_string(),
            month.project_count.to_string(),
            month.invoice_count.to_string(),
        ]);
    }
    println!("{monthly}");

    println!("\n{}", "Project status".bold());
    if snapshot.status_breakdown.is_empty() {
        println!("{}", "  No projects".bright_black());
    } else {
        let mut statuses = new_table(vec!["Status", "Count", "Share", "Color"]);
        for status in &snapshot.status_breakdown {
            statuses.add_row(vec![
                status.status.clone(),
                status.count.to_string(),
                format!("{:.1}%", status.percentage),
                status.color.to_string(),
            ]);
        }
        println!("{statuses}");
    }

    println!("\n{}", "Top clients".bold());
    if snapshot.top_clients.is_empty() {
        println!("{}", "  No client revenue or projects yet".bright_black());
    } else {
        let mut clients = new_table(vec!["#", "Client", "Revenue", "Projects"]);
        for (rank, client) in snapshot.top_clients.iter().enumerate() {
            clients.add_row(vec![
                (rank + 1).to_string(),
                client.name.clone(),
                format_currency(client.revenue),
                client.project_count.to_string(),
            ]);
        }
        println!("{clients}");
    }

    println!("\n{}", "Recent activity".bold());
    if snapshot.recent_activity.is_empty() {
        println!("{}", "  No recent activity".bright_black());
    } else {
        let mut activity = new_table(vec!["When", "Action", "Description"]);
        for entry in &snapshot.recent_activity {
            activity.add_row(vec![
                entry.created_at.format("%Y-%m-%d %H:%M").to_string(),
                entry.action_type.clone(),
                entry.description.clone(),
            ]);
        }
        println!("{activity}");
    }

    let skipped = snapshot.excluded.total();
    if skipped > 0 {
        println!(
            "\n{}",
            format!("  {} malformed record(s) left out; run with --debug for details", skipped)
                .yellow()
        );
    }
}

pub fn print_buckets(buckets: &[MonthBucket]) {
    let mut table = new_table(vec!["Label", "Start (UTC)", "End (UTC, exclusive)"]);
    for bucket in buckets {
        table.add_row(vec![
            bucket.label.clone(),
            bucket.start.to_rfc3339(),
            bucket.end.to_rfc3339(),
        ]);
    }
    println!("{table}");
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);
    table
}

pub fn format_currency(n: f64) -> String {
    if n >= 1_000_000.0 {
        format!("{}{:.2}M", CURRENCY, n / 1_000_000.0)
    } else if n >= 1000.0 {
        format!("{}{:.2}K", CURRENCY, n / 1000.0)
    } else {
        format!("{}{:.2}", CURRENCY, n)
    }
}

pub fn format_trend(trend: &Trend) -> String {
    match trend.percent() {
        Some(p) if p > 0.0 => format!("+{:.1}%", p).green().to_string(),
        Some(p) if p < 0.0 => format!("{:.1}%", p).red().to_string(),
        Some(_) => "0.0%".to_string(),
        None => "n/a".bright_black().to_string(),
    }
}
