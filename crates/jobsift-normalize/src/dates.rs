//! Date parsing for posted/scraped dates.
//!
//! ISO-8601 is tried first, then a fixed list of human formats in order. Card
//! texts such as "Posted 3 days ago" only resolve against a reference time, see
//! [`parse_posted_date`].

use std::sync::LazyLock;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use tracing::warn;

const HUMAN_FORMATS: &[&str] = &["%m/%d/%Y", "%d-%m-%Y", "%Y/%m/%d", "%b %d, %Y", "%B %d, %Y"];

const ISO_NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

static ISO_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").unwrap());
static SAME_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(just posted|today|\d+\+?\s+hours?\s+ago)\b").unwrap()
});
static DAYS_AGO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d+)\+?\s+days?\s+ago\b").unwrap());

/// Parse an absolute date. Timestamps keep the calendar date in their own offset.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let parsed = parse_absolute(text).map(|dt| dt.date_naive());
    if parsed.is_none() && !text.trim().is_empty() {
        warn!(date = %text.trim(), "could not parse date");
    }
    parsed
}

/// Parse an absolute timestamp, converting to UTC. Offset-less values are taken as UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let parsed = parse_absolute(text).map(|dt| dt.with_timezone(&Utc));
    if parsed.is_none() && !text.trim().is_empty() {
        warn!(timestamp = %text.trim(), "could not parse timestamp");
    }
    parsed
}

/// Like [`parse_date`], but also understands relative card texts ("Just posted",
/// "Posted 3 days ago", "30+ days ago") measured back from `reference`.
pub fn parse_posted_date(text: &str, reference: DateTime<Utc>) -> Option<NaiveDate> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(dt) = parse_absolute(trimmed) {
        return Some(dt.date_naive());
    }
    if let Some(days) = DAYS_AGO
        .captures(trimmed)
        .and_then(|c| c[1].parse::<i64>().ok())
    {
        let posted = Duration::try_days(days).and_then(|ago| reference.checked_sub_signed(ago));
        if posted.is_none() {
            warn!(date = %trimmed, days, "posted date out of range");
        }
        return posted.map(|dt| dt.date_naive());
    }
    if SAME_DAY.is_match(trimmed) {
        return Some(reference.date_naive());
    }
    warn!(date = %trimmed, "could not parse posted date");
    None
}

fn parse_absolute(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if ISO_PREFIX.is_match(text) {
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(dt);
        }
        if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f%z") {
            return Some(dt);
        }
        for fmt in ISO_NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
                return Some(as_utc(naive));
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            return Some(as_utc(date.and_hms_opt(0, 0, 0)?));
        }
    }

    HUMAN_FORMATS.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(text, fmt)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(as_utc)
    })
}

fn as_utc(naive: NaiveDateTime) -> DateTime<FixedOffset> {
    naive.and_utc().fixed_offset()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn iso_variants() {
        assert_eq!(parse_date("2024-03-05"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date("2024-03-05T10:30:00Z"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date("2024-03-05T23:30:00-05:00"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date("2024-03-05T10:30:00"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date("2024-03-05 10:30:00.125"), Some(ymd(2024, 3, 5)));
    }

    #[test]
    fn timestamps_convert_to_utc() {
        let ts = parse_timestamp("2024-03-05T23:30:00-05:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-03-06T04:30:00+00:00");
        let naive = parse_timestamp("2024-03-05T08:00:00").unwrap();
        assert_eq!(naive.to_rfc3339(), "2024-03-05T08:00:00+00:00");
    }

    #[test]
    fn human_formats_in_order() {
        assert_eq!(parse_date("03/05/2024"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date("05-03-2024"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date("2024/03/05"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date("Mar 05, 2024"), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date("March 5, 2024"), Some(ymd(2024, 3, 5)));
    }

    #[test]
    fn garbage_is_none() {
        assert_eq!(parse_date("sometime soon"), None);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_timestamp("2024-13-45"), None);
    }

    #[test]
    fn relative_card_texts() {
        let reference = Utc.with_ymd_and_hms(2024, 3, 10, 15, 0, 0).single().unwrap();
        assert_eq!(parse_posted_date("Posted 3 days ago", reference), Some(ymd(2024, 3, 7)));
        assert_eq!(parse_posted_date("Posted\n30+ days ago", reference), Some(ymd(2024, 2, 9)));
        assert_eq!(parse_posted_date("Active 1 day ago", reference), Some(ymd(2024, 3, 9)));
        assert_eq!(parse_posted_date("Just posted", reference), Some(ymd(2024, 3, 10)));
        assert_eq!(parse_posted_date("Today", reference), Some(ymd(2024, 3, 10)));
        assert_eq!(parse_posted_date("2024-01-02", reference), Some(ymd(2024, 1, 2)));
        assert_eq!(parse_posted_date("Hiring ongoing", reference), None);
    }

    #[test]
    fn absurd_day_counts_are_none() {
        let reference = Utc.with_ymd_and_hms(2024, 3, 10, 15, 0, 0).single().unwrap();
        assert_eq!(parse_posted_date("Posted 999999999 days ago", reference), None);
        assert_eq!(parse_posted_date("Posted 99999999999999999999 days ago", reference), None);
    }
}
