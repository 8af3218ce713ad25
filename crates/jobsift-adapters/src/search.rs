//! Search URL construction for the results listing.

use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use crate::AdapterError;

pub const SEARCH_BASE_URL: &str = "https://www.indeed.com/jobs";
pub const DEFAULT_RADIUS: u32 = 25;
pub const DEFAULT_DAYS_AGO: u32 = 7;
pub const VALID_DAYS_AGO: &[u32] = &[1, 3, 7, 14];

const REMOTE_ATTR: &str = "032b3046-06a3-4876-8dfd-474eb5e7ed11";
const HYBRID_ATTR: &str = "0kf:attr(DSQF7);";
const FULL_TIME_ATTR: &str = "0kf:attr(CF3CP);";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkSettingFilter {
    Remote,
    Hybrid,
    Onsite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobTypeFilter {
    FullTime,
    PartTime,
    Contract,
    Temporary,
    Internship,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    pub job_title: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub radius: Option<u32>,
    #[serde(default)]
    pub days_ago: Option<u32>,
    #[serde(default)]
    pub work_setting: Option<WorkSettingFilter>,
    #[serde(default)]
    pub job_type: Option<JobTypeFilter>,
}

impl SearchQuery {
    pub fn new(job_title: impl Into<String>) -> Self {
        Self {
            job_title: job_title.into(),
            ..Self::default()
        }
    }

    /// Posting-age window in days. Values the site does not offer fall back to the default.
    pub fn effective_days_ago(&self) -> u32 {
        match self.days_ago {
            None => DEFAULT_DAYS_AGO,
            Some(days) if days == 0 || VALID_DAYS_AGO.contains(&days) => days,
            Some(days) => {
                warn!(days, fallback = DEFAULT_DAYS_AGO, "unsupported days_ago filter");
                DEFAULT_DAYS_AGO
            }
        }
    }
}

/// Build the results URL for `query`. A zero `days_ago` disables the age filter.
pub fn build_search_url(query: &SearchQuery) -> Result<String, AdapterError> {
    let job_title = query.job_title.trim();
    if job_title.is_empty() {
        return Err(AdapterError::Message("search job title is empty".to_string()));
    }

    let mut url = Url::parse(SEARCH_BASE_URL)?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("q", job_title);

        if let Some(location) = query.location.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
            let radius = query.radius.unwrap_or(DEFAULT_RADIUS);
            pairs.append_pair("l", location);
            pairs.append_pair("radius", &radius.to_string());
        }

        let days_ago = query.effective_days_ago();
        if days_ago > 0 {
            pairs.append_pair("fromage", &days_ago.to_string());
        }

        match query.work_setting {
            Some(WorkSettingFilter::Remote) => {
                pairs.append_pair("remotejob", REMOTE_ATTR);
            }
            Some(WorkSettingFilter::Hybrid) => {
                pairs.append_pair("sc", HYBRID_ATTR);
            }
            Some(WorkSettingFilter::Onsite) | None => {}
        }

        match query.job_type {
            Some(JobTypeFilter::FullTime) => {
                pairs.append_pair("jt", "fulltime");
                pairs.append_pair("sc", FULL_TIME_ATTR);
            }
            Some(JobTypeFilter::PartTime) => {
                pairs.append_pair("jt", "parttime");
            }
            Some(JobTypeFilter::Contract) => {
                pairs.append_pair("jt", "contract");
            }
            Some(JobTypeFilter::Temporary) => {
                pairs.append_pair("jt", "temporary");
            }
            Some(JobTypeFilter::Internship) => {
                pairs.append_pair("jt", "internship");
            }
            None => {}
        }
    }
    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(url: &str) -> Vec<(String, String)> {
        Url::parse(url)
            .unwrap()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    fn pair(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn title_only_gets_default_age_filter() {
        let url = build_search_url(&SearchQuery::new("Line Cook")).unwrap();
        assert!(url.starts_with("https://www.indeed.com/jobs?q=Line+Cook"));
        assert_eq!(pairs(&url), vec![pair("q", "Line Cook"), pair("fromage", "7")]);
    }

    #[test]
    fn location_brings_default_radius() {
        let query = SearchQuery {
            location: Some("Austin, TX".into()),
            days_ago: Some(14),
            ..SearchQuery::new("Cook")
        };
        let url = build_search_url(&query).unwrap();
        assert_eq!(
            pairs(&url),
            vec![
                pair("q", "Cook"),
                pair("l", "Austin, TX"),
                pair("radius", "25"),
                pair("fromage", "14"),
            ]
        );
    }

    #[test]
    fn filters_append_site_attributes() {
        let query = SearchQuery {
            days_ago: Some(0),
            work_setting: Some(WorkSettingFilter::Hybrid),
            job_type: Some(JobTypeFilter::FullTime),
            ..SearchQuery::new("Nurse")
        };
        let url = build_search_url(&query).unwrap();
        assert_eq!(
            pairs(&url),
            vec![
                pair("q", "Nurse"),
                pair("sc", HYBRID_ATTR),
                pair("jt", "fulltime"),
                pair("sc", FULL_TIME_ATTR),
            ]
        );

        let remote = SearchQuery {
            work_setting: Some(WorkSettingFilter::Remote),
            job_type: Some(JobTypeFilter::Internship),
            ..SearchQuery::new("Analyst")
        };
        let url = build_search_url(&remote).unwrap();
        assert!(pairs(&url).contains(&pair("remotejob", REMOTE_ATTR)));
        assert!(pairs(&url).contains(&pair("jt", "internship")));
    }

    #[test]
    fn unsupported_age_window_falls_back() {
        let query = SearchQuery {
            days_ago: Some(5),
            ..SearchQuery::new("Cook")
        };
        assert_eq!(query.effective_days_ago(), DEFAULT_DAYS_AGO);
        assert!(build_search_url(&SearchQuery::new("  ")).is_err());
    }

    #[test]
    fn filters_deserialize_from_kebab_case() {
        let query: SearchQuery = serde_json::from_str(
            r#"{"job_title":"Cook","work_setting":"onsite","job_type":"part-time"}"#,
        )
        .unwrap();
        assert_eq!(query.work_setting, Some(WorkSettingFilter::Onsite));
        assert_eq!(query.job_type, Some(JobTypeFilter::PartTime));
    }
}
