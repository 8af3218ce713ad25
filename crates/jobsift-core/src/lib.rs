//! Core domain model for the jobsift listing pipeline.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const CRATE_NAME: &str = "jobsift-core";

/// Origin tag stamped on records that arrive without one.
pub const DEFAULT_SOURCE: &str = "Indeed";

pub const MAX_JOB_ID_LENGTH: usize = 100;
pub const MAX_TITLE_LENGTH: usize = 255;
pub const MAX_COMPANY_LENGTH: usize = 255;
pub const MAX_LOCATION_LENGTH: usize = 255;
pub const MAX_URL_LENGTH: usize = 500;
pub const MAX_SOURCE_LENGTH: usize = 100;
pub const MAX_JOB_TYPE_LENGTH: usize = 100;
pub const MAX_CITY_STATE_LENGTH: usize = 100;
pub const MAX_ZIP_LENGTH: usize = 20;

/// Largest magnitude a numeric column may hold (DECIMAL(9,2) in the storage layer).
pub const MAX_NUMERIC_VALUE: f64 = 9_999_999.99;

/// Column order of the tabular export, grouped as identity, essentials, dates,
/// location, compensation, urls and text.
pub const EXPORT_COLUMNS: &[&str] = &[
    "job_id",
    "source",
    "title",
    "company",
    "work_setting",
    "job_type",
    "date_posted",
    "date_scraped",
    "city",
    "state",
    "zip_code",
    "salary_period",
    "salary_min",
    "salary_max",
    "salary_min_yearly",
    "salary_max_yearly",
    "salary_midpoint_yearly",
    "job_url",
    "search_url",
    "description",
];

/// One job card as handed over by the crawl layer. Every value is string-or-null.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardFields {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub salary: Option<String>,
    #[serde(default)]
    pub job_type: Option<String>,
    #[serde(default)]
    pub work_setting: Option<String>,
    #[serde(default)]
    pub date_posted: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl CardFields {
    /// True when the card carries the three fields the crawl layer must supply.
    pub fn has_required(&self) -> bool {
        [&self.title, &self.company, &self.link]
            .iter()
            .all(|v| v.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }
}

/// Unvalidated job card with its derived `external_id`. Never mutated after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCandidate {
    pub title: Option<String>,
    pub company: Option<String>,
    pub link: Option<String>,
    pub location_text: Option<String>,
    pub salary_text: Option<String>,
    pub job_type_text: Option<String>,
    pub work_setting_text: Option<String>,
    pub date_posted_text: Option<String>,
    pub description_html: Option<String>,
    pub external_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkSetting {
    Remote,
    Hybrid,
    #[default]
    InPerson,
}

impl WorkSetting {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkSetting::Remote => "remote",
            WorkSetting::Hybrid => "hybrid",
            WorkSetting::InPerson => "in-person",
        }
    }
}

impl fmt::Display for WorkSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SalaryPeriod {
    Hourly,
    Weekly,
    Monthly,
    Yearly,
}

impl SalaryPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SalaryPeriod::Hourly => "hourly",
            SalaryPeriod::Weekly => "weekly",
            SalaryPeriod::Monthly => "monthly",
            SalaryPeriod::Yearly => "yearly",
        }
    }

    /// Factor that turns one pay period into a yearly figure (40h weeks, 52 weeks).
    pub fn yearly_multiplier(&self) -> f64 {
        match self {
            SalaryPeriod::Hourly => 40.0 * 52.0,
            SalaryPeriod::Weekly => 52.0,
            SalaryPeriod::Monthly => 12.0,
            SalaryPeriod::Yearly => 1.0,
        }
    }
}

impl fmt::Display for SalaryPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated, normalized output unit handed to the storage layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub source: String,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub salary_original: Option<String>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub salary_period: Option<SalaryPeriod>,
    pub salary_min_yearly: Option<f64>,
    pub salary_max_yearly: Option<f64>,
    pub salary_midpoint_yearly: Option<f64>,
    pub job_type: Option<String>,
    pub work_setting: WorkSetting,
    pub date_posted: Option<NaiveDate>,
    pub date_scraped: DateTime<Utc>,
    pub job_url: Option<String>,
    pub search_url: Option<String>,
    pub queried_job_title: Option<String>,
    pub description: Option<String>,
}

/// Per-run classification counts. `new + duplicate + invalid == total` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub new_count: usize,
    pub duplicate_count: usize,
    pub invalid_count: usize,
    pub total_candidates: usize,
}

impl RunSummary {
    pub fn is_conserved(&self) -> bool {
        self.new_count + self.duplicate_count + self.invalid_count == self.total_candidates
    }

    pub fn merge(&mut self, other: &RunSummary) {
        self.new_count += other.new_count;
        self.duplicate_count += other.duplicate_count;
        self.invalid_count += other.invalid_count;
        self.total_candidates += other.total_candidates;
    }
}
