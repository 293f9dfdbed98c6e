//! Project status breakdown.

use crate::aggregator::ExclusionCounts;
use crate::models::Project;
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

/// Known statuses in lifecycle order, with their display colors.
const STATUS_COLORS: &[(&str, &str)] = &[
    ("planning", "#3b82f6"),
    ("in_progress", "#f59e0b"),
    ("review", "#8b5cf6"),
    ("completed", "#10b981"),
    ("on_hold", "#ef4444"),
];

/// Color for any status not in the table.
pub const FALLBACK_STATUS_COLOR: &str = "#6b7280";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: String,
    pub count: usize,
    /// Share of the projects that had a usable status, 0–100.
    pub percentage: f64,
    pub color: &'static str,
}

pub fn status_color(status: &str) -> &'static str {
    STATUS_COLORS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(status))
        .map(|(_, color)| *color)
        .unwrap_or(FALLBACK_STATUS_COLOR)
}

fn lifecycle_rank(status: &str) -> usize {
    STATUS_COLORS
        .iter()
        .position(|(known, _)| *known == status)
        .unwrap_or(STATUS_COLORS.len())
}

/// Count projects per observed status.
///
/// Unknown statuses get their own entry with the fallback color. Projects
/// without a status are left out and counted in `excluded.project_status`.
/// Returns an empty breakdown when no project has a usable status.
pub fn status_breakdown(projects: &[Project], excluded: &mut ExclusionCounts) -> Vec<StatusCount> {
    let mut counts: HashMap<String, usize> = HashMap::with_capacity(STATUS_COLORS.len());

    for project in projects {
        match project.status_key() {
            Some(status) => *counts.entry(status).or_default() += 1,
            None => {
                warn!(project = %project.id, "Skipping project without status in breakdown");
                excluded.project_status += 1;
            }
        }
    }

    let considered: usize = counts.values().sum();
    if considered == 0 {
        return Vec::new();
    }

    let mut breakdown: Vec<StatusCount> = counts
        .into_iter()
        .map(|(status, count)| StatusCount {
            color: status_color(&status),
            percentage: count as f64 / considered as f64 * 100.0,
            status,
            count,
        })
        .collect();

    breakdown.sort_by(|a, b| {
        lifecycle_rank(&a.status)
            .cmp(&lifecycle_rank(&b.status))
            .then_with(|| a.status.cmp(&b.status))
    });
    breakdown
}
