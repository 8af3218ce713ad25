//! Crawl-boundary contracts: search URLs, result-page card extraction and
//! captured page bundles feeding the listing pipeline.

use std::sync::LazyLock;

use jobsift_core::{CardFields, RawCandidate};
use regex::Regex;
use thiserror::Error;

pub mod pages;
pub mod results_page;
pub mod search;

pub use pages::{
    list_page_files, load_page_bundle, CandidatePage, CandidateSource, FixtureCandidateSource, PageBundle,
    PageContent, StaticCandidateSource,
};
pub use results_page::parse_results_page;
pub use search::{build_search_url, JobTypeFilter, SearchQuery, WorkSettingFilter};

pub const CRATE_NAME: &str = "jobsift-adapters";

static JOB_KEY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"jk=([a-zA-Z0-9]+)").unwrap());

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("{0}")]
    Message(String),
    #[error("malformed page bundle {path}: {source}")]
    MalformedPage {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Job key carried in a card link's `jk=` parameter. Sponsored links that
/// have not been redirected yet carry none.
pub fn extract_external_id(link: &str) -> Option<String> {
    JOB_KEY.captures(link).map(|c| c[1].to_string())
}

pub fn candidate_from_card(card: &CardFields) -> RawCandidate {
    RawCandidate {
        title: card.title.clone(),
        company: card.company.clone(),
        link: card.link.clone(),
        location_text: card.location.clone(),
        salary_text: card.salary.clone(),
        job_type_text: card.job_type.clone(),
        work_setting_text: card.work_setting.clone(),
        date_posted_text: card.date_posted.clone(),
        description_html: card.description.clone(),
        external_id: card.link.as_deref().and_then(extract_external_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_key_comes_from_the_link() {
        assert_eq!(
            extract_external_id("https://www.indeed.com/rc/clk?jk=abc123&from=serp").as_deref(),
            Some("abc123")
        );
        assert_eq!(
            extract_external_id("/viewjob?cmp=Diner&jk=9f8e7d6c5b4a3210").as_deref(),
            Some("9f8e7d6c5b4a3210")
        );
        assert_eq!(extract_external_id("https://www.indeed.com/pagead/clk?mo=r&ad=xyz"), None);
    }

    #[test]
    fn card_maps_onto_candidate() {
        let card = CardFields {
            title: Some("Cook".into()),
            company: Some("Diner".into()),
            link: Some("https://www.indeed.com/job?jk=abc123".into()),
            location: Some("Remote in Austin, TX".into()),
            salary: Some("$15 an hour".into()),
            ..CardFields::default()
        };
        let candidate = candidate_from_card(&card);
        assert_eq!(candidate.external_id.as_deref(), Some("abc123"));
        assert_eq!(candidate.location_text.as_deref(), Some("Remote in Austin, TX"));
        assert_eq!(candidate.salary_text.as_deref(), Some("$15 an hour"));
        assert_eq!(candidate.description_html, None);
    }
}
