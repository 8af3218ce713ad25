//! Schema conformance for assembled records.

use chrono::{DateTime, NaiveDate, Utc};
use jobsift_core::{
    JobRecord, SalaryPeriod, WorkSetting, DEFAULT_SOURCE, MAX_CITY_STATE_LENGTH, MAX_COMPANY_LENGTH,
    MAX_JOB_ID_LENGTH, MAX_JOB_TYPE_LENGTH, MAX_LOCATION_LENGTH, MAX_NUMERIC_VALUE, MAX_SOURCE_LENGTH,
    MAX_TITLE_LENGTH, MAX_URL_LENGTH, MAX_ZIP_LENGTH,
};
use thiserror::Error;
use tracing::warn;

use crate::dates::{parse_date, parse_timestamp};

/// A field value that is either already typed or still raw text.
#[derive(Debug, Clone, PartialEq)]
pub enum Loose<T> {
    Value(T),
    Text(String),
}

/// Field values headed for a [`JobRecord`], before schema rules are applied.
/// The yearly midpoint is not an input: it is derived from the yearly bounds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordDraft {
    pub job_id: Option<String>,
    pub source: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub salary_original: Option<String>,
    pub salary_min: Option<Loose<f64>>,
    pub salary_max: Option<Loose<f64>>,
    pub salary_period: Option<SalaryPeriod>,
    pub salary_min_yearly: Option<Loose<f64>>,
    pub salary_max_yearly: Option<Loose<f64>>,
    pub job_type: Option<String>,
    pub work_setting: Option<WorkSetting>,
    pub date_posted: Option<Loose<NaiveDate>>,
    pub date_scraped: Option<Loose<DateTime<Utc>>>,
    pub job_url: Option<String>,
    pub search_url: Option<String>,
    pub queried_job_title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field(s): {}", .0.join(", "))]
    MissingRequired(Vec<&'static str>),
    #[error("candidate has neither an external id nor a title/company key")]
    IdentityAmbiguity,
    #[error("job id is {0} characters, longer than the {max} allowed", max = MAX_JOB_ID_LENGTH)]
    JobIdTooLong(usize),
}

/// Apply schema rules to `draft`. `now` stands in for a missing or unparsable
/// `date_scraped`. Only missing required fields reject the record; every other
/// problem is repaired with a warning.
pub fn validate_record(draft: RecordDraft, now: DateTime<Utc>) -> Result<JobRecord, ValidationError> {
    // Identity is never truncated: two long ids could collapse into one.
    if let Some(len) = draft
        .job_id
        .as_deref()
        .map(|id| id.trim().chars().count())
        .filter(|len| *len > MAX_JOB_ID_LENGTH)
    {
        return Err(ValidationError::JobIdTooLong(len));
    }
    let job_id = clean_text(draft.job_id, "job_id", MAX_JOB_ID_LENGTH);
    let title = clean_text(draft.title, "title", MAX_TITLE_LENGTH);
    let company = clean_text(draft.company, "company", MAX_COMPANY_LENGTH);

    let (job_id, title, company) = match (job_id, title, company) {
        (Some(job_id), Some(title), Some(company)) => (job_id, title, company),
        (job_id, title, company) => {
            let missing = [("job_id", job_id.is_none()), ("title", title.is_none()), ("company", company.is_none())]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
            return Err(ValidationError::MissingRequired(missing));
        }
    };

    let (salary_min, salary_max) = ordered_bounds(
        draft.salary_min.as_ref().and_then(|v| clean_numeric(v, "salary_min")),
        draft.salary_max.as_ref().and_then(|v| clean_numeric(v, "salary_max")),
        "salary",
    );
    let (salary_min_yearly, salary_max_yearly) = ordered_bounds(
        draft
            .salary_min_yearly
            .as_ref()
            .and_then(|v| clean_numeric(v, "salary_min_yearly")),
        draft
            .salary_max_yearly
            .as_ref()
            .and_then(|v| clean_numeric(v, "salary_max_yearly")),
        "salary_yearly",
    );
    let salary_midpoint_yearly = match (salary_min_yearly, salary_max_yearly) {
        (Some(lo), Some(hi)) => Some(round2(((lo + hi) / 2.0).min(MAX_NUMERIC_VALUE))),
        _ => None,
    };

    let date_posted = match draft.date_posted {
        Some(Loose::Value(date)) => Some(date),
        Some(Loose::Text(text)) => parse_date(&text),
        None => None,
    };
    let date_scraped = match draft.date_scraped {
        Some(Loose::Value(ts)) => Some(ts),
        Some(Loose::Text(text)) => parse_timestamp(&text),
        None => None,
    }
    .unwrap_or(now);

    Ok(JobRecord {
        job_id,
        source: clean_text(draft.source, "source", MAX_SOURCE_LENGTH)
            .unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
        title,
        company,
        location: clean_text(draft.location, "location", MAX_LOCATION_LENGTH),
        city: clean_text(draft.city, "city", MAX_CITY_STATE_LENGTH),
        state: clean_text(draft.state, "state", MAX_CITY_STATE_LENGTH),
        zip_code: clean_text(draft.zip_code, "zip_code", MAX_ZIP_LENGTH),
        salary_original: clean_text(draft.salary_original, "salary_original", MAX_TITLE_LENGTH),
        salary_min,
        salary_max,
        salary_period: draft.salary_period,
        salary_min_yearly,
        salary_max_yearly,
        salary_midpoint_yearly,
        job_type: clean_text(draft.job_type, "job_type", MAX_JOB_TYPE_LENGTH),
        work_setting: draft.work_setting.unwrap_or_default(),
        date_posted,
        date_scraped,
        job_url: clean_text(draft.job_url, "job_url", MAX_URL_LENGTH),
        search_url: clean_text(draft.search_url, "search_url", MAX_URL_LENGTH),
        queried_job_title: clean_text(draft.queried_job_title, "queried_job_title", MAX_TITLE_LENGTH),
        description: clean_text(draft.description, "description", usize::MAX),
    })
}

/// Trim, collapse blank to `None`, and truncate (by characters) past `max_len`.
pub fn clean_text(value: Option<String>, field: &str, max_len: usize) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let len = trimmed.chars().count();
    if len > max_len {
        warn!(field, from = len, to = max_len, "truncating field");
        return Some(trimmed.chars().take(max_len).collect());
    }
    Some(trimmed.to_string())
}

/// Coerce to a float clamped to the storage ceiling and rounded to cents.
/// Text keeps only digits, `.` and `-` before conversion.
pub fn clean_numeric(value: &Loose<f64>, field: &str) -> Option<f64> {
    let raw = match value {
        Loose::Value(v) => *v,
        Loose::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            let stripped: String = text
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            match stripped.parse::<f64>() {
                Ok(v) => v,
                Err(err) => {
                    warn!(field, value = %text, error = %err, "invalid numeric value");
                    return None;
                }
            }
        }
    };
    if !raw.is_finite() {
        warn!(field, value = raw, "non-finite numeric value");
        return None;
    }
    let clamped = raw.clamp(-MAX_NUMERIC_VALUE, MAX_NUMERIC_VALUE);
    if clamped != raw {
        warn!(field, from = raw, to = clamped, "capping numeric value");
    }
    Some(round2(clamped))
}

fn ordered_bounds(min: Option<f64>, max: Option<f64>, label: &str) -> (Option<f64>, Option<f64>) {
    match (min, max) {
        (Some(lo), Some(hi)) if lo > hi => {
            warn!(label, min = lo, max = hi, "swapping inverted bounds");
            (Some(hi), Some(lo))
        }
        other => other,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).single().unwrap()
    }

    fn minimal() -> RecordDraft {
        RecordDraft {
            job_id: Some("abc123".into()),
            title: Some("Cook".into()),
            company: Some("Diner".into()),
            ..RecordDraft::default()
        }
    }

    #[test]
    fn defaults_fill_source_setting_and_scrape_time() {
        let record = validate_record(minimal(), now()).unwrap();
        assert_eq!(record.source, DEFAULT_SOURCE);
        assert_eq!(record.work_setting, WorkSetting::InPerson);
        assert_eq!(record.date_scraped, now());
        assert_eq!(record.salary_midpoint_yearly, None);
    }

    #[test]
    fn missing_required_fields_are_named() {
        let draft = RecordDraft {
            company: Some("   ".into()),
            job_id: None,
            ..minimal()
        };
        let err = validate_record(draft, now()).unwrap_err();
        assert_eq!(err, ValidationError::MissingRequired(vec!["job_id", "company"]));
        assert_eq!(err.to_string(), "missing required field(s): job_id, company");
    }

    #[test]
    fn over_length_job_id_is_rejected_not_truncated() {
        let draft = RecordDraft {
            job_id: Some("a".repeat(MAX_JOB_ID_LENGTH + 1)),
            ..minimal()
        };
        let err = validate_record(draft, now()).unwrap_err();
        assert_eq!(err, ValidationError::JobIdTooLong(MAX_JOB_ID_LENGTH + 1));

        let at_cap = RecordDraft {
            job_id: Some(format!(" {} ", "a".repeat(MAX_JOB_ID_LENGTH))),
            ..minimal()
        };
        assert_eq!(validate_record(at_cap, now()).unwrap().job_id.len(), MAX_JOB_ID_LENGTH);
    }

    #[test]
    fn blank_strings_collapse_and_long_strings_truncate() {
        let draft = RecordDraft {
            location: Some(" \t ".into()),
            zip_code: Some("123456789012345678901234".into()),
            title: Some(format!("  {}  ", "x".repeat(300))),
            ..minimal()
        };
        let record = validate_record(draft, now()).unwrap();
        assert_eq!(record.location, None);
        assert_eq!(record.zip_code.as_deref(), Some("12345678901234567890"));
        assert_eq!(record.title.chars().count(), MAX_TITLE_LENGTH);
    }

    #[test]
    fn numeric_text_is_stripped_clamped_and_rounded() {
        assert_eq!(clean_numeric(&Loose::Text("$1,234.567".into()), "f"), Some(1234.57));
        assert_eq!(clean_numeric(&Loose::Text("n/a".into()), "f"), None);
        assert_eq!(clean_numeric(&Loose::Text("  ".into()), "f"), None);
        assert_eq!(clean_numeric(&Loose::Value(123_456_789.0), "f"), Some(MAX_NUMERIC_VALUE));
        assert_eq!(clean_numeric(&Loose::Value(f64::NAN), "f"), None);
        assert_eq!(clean_numeric(&Loose::Value(-20_000_000.0), "f"), Some(-MAX_NUMERIC_VALUE));
    }

    #[test]
    fn salary_bounds_are_ordered_and_midpoint_derived() {
        let draft = RecordDraft {
            salary_min: Some(Loose::Value(60_000.0)),
            salary_max: Some(Loose::Text("45,000".into())),
            salary_min_yearly: Some(Loose::Value(60_000.0)),
            salary_max_yearly: Some(Loose::Value(45_000.0)),
            salary_period: Some(SalaryPeriod::Yearly),
            ..minimal()
        };
        let record = validate_record(draft, now()).unwrap();
        assert_eq!(record.salary_min, Some(45_000.0));
        assert_eq!(record.salary_max, Some(60_000.0));
        assert_eq!(record.salary_midpoint_yearly, Some(52_500.0));

        let one_sided = RecordDraft {
            salary_min_yearly: Some(Loose::Value(30_000.0)),
            ..minimal()
        };
        let record = validate_record(one_sided, now()).unwrap();
        assert_eq!(record.salary_min_yearly, Some(30_000.0));
        assert_eq!(record.salary_midpoint_yearly, None);
    }

    #[test]
    fn dates_parse_or_fall_back() {
        let draft = RecordDraft {
            date_posted: Some(Loose::Text("03/01/2024".into())),
            date_scraped: Some(Loose::Text("not a time".into())),
            ..minimal()
        };
        let record = validate_record(draft, now()).unwrap();
        assert_eq!(record.date_posted, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(record.date_scraped, now());
    }
}
