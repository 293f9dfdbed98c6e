//! Raw records as returned by the remote client store.
//!
//! Every column except `id` is optional at the type level so that a single
//! bad row never fails decoding of a whole collection. Whether a record is
//! usable is decided by each aggregation on its own.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Display name for records whose client cannot be resolved.
pub const UNKNOWN_CLIENT: &str = "Unknown";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Client {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Client {
    pub fn display_name(&self) -> &str {
        non_blank(self.company_name.as_deref()).unwrap_or(UNKNOWN_CLIENT)
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub client_id: Option<String>,
    /// Company name joined in by the store, when it provides one.
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Project {
    /// Lowercased, trimmed status. `None` when the column is missing or blank.
    pub fn status_key(&self) -> Option<String> {
        non_blank(self.status.as_deref()).map(str::to_lowercase)
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub total_amount: Option<f64>,
    #[serde(default)]
    pub issue_date: Option<String>,
    #[serde(default)]
    pub paid_date: Option<String>,
}

impl Invoice {
    pub fn is_paid(&self) -> bool {
        non_blank(self.status.as_deref()).is_some_and(|s| s.eq_ignore_ascii_case("paid"))
    }

    /// The invoice total, or `None` when it is missing, negative or not finite.
    pub fn amount(&self) -> Option<f64> {
        self.total_amount.filter(|v| v.is_finite() && *v >= 0.0)
    }

    pub fn issued(&self) -> Option<DateTime<Utc>> {
        self.issue_date.as_deref().and_then(parse_timestamp)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub action_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl ActivityLogEntry {
    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }
}

/// Parse the timestamp shapes the store hands back.
///
/// Accepts RFC 3339, Postgres `timestamptz` text (`2024-03-15 10:00:00+00`),
/// naive date-times and plain dates. Naive values are read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_amount(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok()
}

// Postgres `numeric` columns arrive as JSON numbers or as strings depending on
// the store configuration. Anything else decodes to `None` and is treated as
// malformed by the revenue aggregations.
fn deserialize_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => parse_amount(&s),
        _ => None,
    })
}

fn id_from_value(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(id_from_value).unwrap_or_default())
}

fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(id_from_value)
        .filter(|id| !id.trim().is_empty()))
}
