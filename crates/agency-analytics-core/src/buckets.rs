//! Trailing calendar-month windows.
//!
//! Boundaries are computed in UTC with whole-month arithmetic on a
//! `year * 12 + month0` index, so year rollover never depends on day counts.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;

/// One calendar month, half-open: `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthBucket {
    pub label: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl MonthBucket {
    pub fn contains(&self, ts: &DateTime<Utc>) -> bool {
        *ts >= self.start && *ts < self.end
    }
}

/// Build `count` contiguous month buckets, oldest first, the last one holding `now`.
pub fn trailing_months(now: DateTime<Utc>, count: usize) -> Vec<MonthBucket> {
    let anchor = month_index(&now);

    (0..count as i64)
        .rev()
        .filter_map(|offset| bucket_at(anchor - offset))
        .collect()
}

/// Position of `ts` within `buckets`, which must come from [`trailing_months`].
pub fn bucket_position(buckets: &[MonthBucket], ts: &DateTime<Utc>) -> Option<usize> {
    let first = buckets.first()?;
    let offset = month_index(ts) - month_index(&first.start);
    if offset < 0 {
        return None;
    }
    let position = offset as usize;
    (position < buckets.len()).then_some(position)
}

fn month_index(ts: &DateTime<Utc>) -> i64 {
    ts.year() as i64 * 12 + ts.month0() as i64
}

fn month_start(index: i64) -> Option<DateTime<Utc>> {
    let year = i32::try_from(index.div_euclid(12)).ok()?;
    let month = index.rem_euclid(12) as u32 + 1;
    NaiveDate::from_ymd_opt(year, month, 1)?
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
}

fn bucket_at(index: i64) -> Option<MonthBucket> {
    let start = month_start(index)?;
    let end = month_start(index + 1)?;
    Some(MonthBucket {
        label: start.format("%b %y").to_string(),
        start,
        end,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_trailing_months_default_window() {
        let buckets = trailing_months(at(2024, 3, 15), 6);
        let labels: Vec<&str> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["Oct 23", "Nov 23", "Dec 23", "Jan 24", "Feb 24", "Mar 24"]
        );
    }

    #[test]
    fn test_trailing_months_are_contiguous_and_ascending() {
        let buckets = trailing_months(at(2025, 2, 28), 14);
        assert_eq!(buckets.len(), 14);
        for pair in buckets.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
            assert!(pair[0].start < pair[1].start);
        }
    }

    #[test]
    fn test_last_bucket_contains_now() {
        let now = Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap();
        let buckets = trailing_months(now, 6);
        let last = buckets.last().unwrap();
        assert!(last.contains(&now));
        assert_eq!(last.start, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(last.end, Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_december_rolls_into_next_year() {
        let buckets = trailing_months(at(2023, 12, 5), 2);
        assert_eq!(buckets[0].label, "Nov 23");
        assert_eq!(buckets[1].label, "Dec 23");
        assert_eq!(
            buckets[1].end,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_window_crossing_leap_february() {
        let buckets = trailing_months(at(2024, 3, 1), 2);
        assert_eq!(
            buckets[0].start,
            Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()
        );
        assert!(buckets[0].contains(&Utc.with_ymd_and_hms(2024, 2, 29, 23, 0, 0).unwrap()));
        assert!(!buckets[0].contains(&buckets[1].start));
    }

    #[test]
    fn test_trailing_months_is_deterministic() {
        let now = at(2024, 7, 4);
        assert_eq!(trailing_months(now, 6), trailing_months(now, 6));
    }

    #[test]
    fn test_trailing_months_zero_count() {
        assert!(trailing_months(at(2024, 7, 4), 0).is_empty());
    }

    #[test]
    fn test_bucket_position() {
        let buckets = trailing_months(at(2024, 2, 10), 3);
        assert_eq!(bucket_position(&buckets, &at(2023, 12, 1)), Some(0));
        assert_eq!(bucket_position(&buckets, &at(2024, 1, 31)), Some(1));
        assert_eq!(bucket_position(&buckets, &at(2024, 2, 29)), Some(2));
        assert_eq!(bucket_position(&buckets, &at(2023, 11, 30)), None);
        assert_eq!(bucket_position(&buckets, &at(2024, 3, 1)), None);
        assert_eq!(bucket_position(&[], &at(2024, 3, 1)), None);
    }
}
