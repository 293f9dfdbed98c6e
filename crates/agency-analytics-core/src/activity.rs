use crate::aggregator::ExclusionCounts;
use crate::models::ActivityLogEntry;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
    pub id: String,
    pub action_type: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// The newest `limit` entries, newest first.
///
/// Entries sharing a timestamp are ordered by id, descending, so the feed is
/// stable across passes.
pub fn select_recent(
    entries: &[ActivityLogEntry],
    limit: usize,
    excluded: &mut ExclusionCounts,
) -> Vec<RecentActivity> {
    let mut timed: Vec<(DateTime<Utc>, &ActivityLogEntry)> = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry.created() {
            Some(ts) => timed.push((ts, entry)),
            None => {
                warn!(activity = %entry.id, "Skipping activity entry without a valid timestamp");
                excluded.activity_timestamp += 1;
            }
        }
    }

    timed.sort_by(|(ta, a), (tb, b)| tb.cmp(ta).then_with(|| b.id.cmp(&a.id)));
    timed.truncate(limit);

    timed
        .into_iter()
        .map(|(created_at, entry)| RecentActivity {
            id: entry.id.clone(),
            action_type: entry.action_type.clone().unwrap_or_default(),
            description: entry.description.clone().unwrap_or_default(),
            created_at,
        })
        .collect()
}
