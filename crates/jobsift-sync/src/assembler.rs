//! Listing assembler: drives one run over page batches and folds every
//! candidate into exactly one of accepted, duplicate or invalid.

use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};

use chrono::{DateTime, Utc};
use jobsift_core::{JobRecord, RawCandidate, RunSummary, DEFAULT_SOURCE};
use jobsift_normalize::{
    html_to_text, normalize_job_type, parse_location, parse_posted_date, parse_salary, resolve_work_setting,
    validate_record, Loose, RecordDraft, ValidationError,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::resolver::{DuplicateReason, DuplicateResolver, Resolution};

/// Settings for one assembler run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub source: String,
    pub search_url: Option<String>,
    pub queried_job_title: Option<String>,
    pub max_pages: Option<usize>,
    /// Ceiling on accepted records.
    pub max_results: Option<usize>,
    /// Processing clock: default `date_scraped` and anchor for relative posted dates.
    pub scraped_at: DateTime<Utc>,
}

impl PipelineConfig {
    pub fn new(scraped_at: DateTime<Utc>) -> Self {
        Self {
            source: DEFAULT_SOURCE.to_string(),
            search_url: None,
            queried_job_title: None,
            max_pages: None,
            max_results: None,
            scraped_at,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    SourceExhausted,
    EmptyPage,
    PageLimit,
    ResultLimit,
    Cancelled,
    /// The search errored; see `SearchRunReport::error`.
    SourceFailed,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SourceExhausted => "source_exhausted",
            Self::EmptyPage => "empty_page",
            Self::PageLimit => "page_limit",
            Self::ResultLimit => "result_limit",
            Self::Cancelled => "cancelled",
            Self::SourceFailed => "source_failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    Idle,
    Processing,
    Exhausted(StopReason),
}

/// Per-candidate classification, in presentation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Accepted { job_id: String },
    Duplicate(DuplicateReason),
    Invalid(String),
}

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub records: Vec<JobRecord>,
    pub summary: RunSummary,
    pub outcomes: Vec<Outcome>,
    pub pages_processed: usize,
    pub stop_reason: StopReason,
}

pub struct ListingAssembler {
    config: PipelineConfig,
    resolver: DuplicateResolver,
    cancel: CancellationToken,
    state: AssemblerState,
    records: Vec<JobRecord>,
    outcomes: Vec<Outcome>,
    summary: RunSummary,
    pages_processed: usize,
}

impl ListingAssembler {
    pub fn new(config: PipelineConfig, known_ids: HashSet<String>, cancel: CancellationToken) -> Self {
        Self {
            config,
            resolver: DuplicateResolver::new(known_ids),
            cancel,
            state: AssemblerState::Idle,
            records: Vec::new(),
            outcomes: Vec::new(),
            summary: RunSummary::default(),
            pages_processed: 0,
        }
    }

    pub fn state(&self) -> AssemblerState {
        self.state
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.state, AssemblerState::Exhausted(_))
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process one page of candidates, in order. Returns the state afterwards;
    /// batches arriving after exhaustion are ignored.
    pub fn process_batch(&mut self, batch: &[RawCandidate]) -> AssemblerState {
        if self.is_exhausted() {
            debug!(candidates = batch.len(), "assembler exhausted, batch ignored");
            return self.state;
        }
        if self.cancel.is_cancelled() {
            return self.exhaust(StopReason::Cancelled);
        }
        if batch.is_empty() {
            return self.exhaust(StopReason::EmptyPage);
        }
        if self.result_limit_reached() {
            return self.exhaust(StopReason::ResultLimit);
        }

        self.state = AssemblerState::Processing;
        self.pages_processed += 1;
        let page_no = self.pages_processed;

        for candidate in batch {
            if self.cancel.is_cancelled() {
                return self.exhaust(StopReason::Cancelled);
            }
            if self.result_limit_reached() {
                return self.exhaust(StopReason::ResultLimit);
            }
            let outcome = self.classify(candidate);
            self.outcomes.push(outcome);
        }

        info!(
            page = page_no,
            new = self.summary.new_count,
            duplicates = self.summary.duplicate_count,
            invalid = self.summary.invalid_count,
            "page processed"
        );

        if self.result_limit_reached() {
            return self.exhaust(StopReason::ResultLimit);
        }
        if self.config.max_pages.is_some_and(|max| self.pages_processed >= max) {
            return self.exhaust(StopReason::PageLimit);
        }
        self.state
    }

    /// The producer has no more batches.
    pub fn finish(&mut self) -> AssemblerState {
        if !self.is_exhausted() {
            self.exhaust(StopReason::SourceExhausted);
        }
        self.state
    }

    pub fn into_output(mut self) -> RunOutput {
        self.finish();
        let stop_reason = match self.state {
            AssemblerState::Exhausted(reason) => reason,
            _ => StopReason::SourceExhausted,
        };
        debug_assert!(self.summary.is_conserved());
        RunOutput {
            records: self.records,
            summary: self.summary,
            outcomes: self.outcomes,
            pages_processed: self.pages_processed,
            stop_reason,
        }
    }

    fn exhaust(&mut self, reason: StopReason) -> AssemblerState {
        info!(?reason, pages = self.pages_processed, "assembler exhausted");
        self.state = AssemblerState::Exhausted(reason);
        self.state
    }

    fn result_limit_reached(&self) -> bool {
        self.config
            .max_results
            .is_some_and(|max| self.summary.new_count >= max)
    }

    fn classify(&mut self, candidate: &RawCandidate) -> Outcome {
        self.summary.total_candidates += 1;
        match self.resolver.resolve(candidate) {
            Resolution::Duplicate(reason) => {
                self.summary.duplicate_count += 1;
                debug!(?reason, external_id = ?candidate.external_id, "duplicate candidate");
                Outcome::Duplicate(reason)
            }
            Resolution::Invalid(err) => self.reject(candidate, err.to_string()),
            Resolution::New { job_id } => {
                let config = &self.config;
                let built = catch_unwind(AssertUnwindSafe(|| build_record(candidate, &job_id, config)));
                match built {
                    Ok(Ok(record)) => {
                        self.summary.new_count += 1;
                        self.records.push(record);
                        Outcome::Accepted { job_id }
                    }
                    Ok(Err(err)) => self.reject(candidate, err.to_string()),
                    Err(_) => {
                        error!(%job_id, "panic while normalizing candidate");
                        self.reject(candidate, "normalization panicked".to_string())
                    }
                }
            }
        }
    }

    fn reject(&mut self, candidate: &RawCandidate, reason: String) -> Outcome {
        self.summary.invalid_count += 1;
        warn!(title = ?candidate.title, company = ?candidate.company, %reason, "invalid candidate");
        Outcome::Invalid(reason)
    }
}

/// Normalize every field of `candidate` and validate the result as `job_id`.
pub fn build_record(
    candidate: &RawCandidate,
    job_id: &str,
    config: &PipelineConfig,
) -> Result<JobRecord, ValidationError> {
    let location = candidate
        .location_text
        .as_deref()
        .map(parse_location)
        .unwrap_or_default();
    let salary = candidate
        .salary_text
        .as_deref()
        .map(parse_salary)
        .unwrap_or_default();
    let work_setting = resolve_work_setting(
        candidate.work_setting_text.as_deref(),
        candidate.location_text.as_deref(),
    );

    let draft = RecordDraft {
        job_id: Some(job_id.to_string()),
        source: Some(config.source.clone()),
        title: candidate.title.clone(),
        company: candidate.company.clone(),
        location: location.location,
        city: location.city,
        state: location.state,
        zip_code: location.zip_code,
        salary_original: salary.salary_original,
        salary_min: salary.salary_min.map(Loose::Value),
        salary_max: salary.salary_max.map(Loose::Value),
        salary_period: salary.salary_period,
        salary_min_yearly: salary.salary_min_yearly.map(Loose::Value),
        salary_max_yearly: salary.salary_max_yearly.map(Loose::Value),
        job_type: candidate.job_type_text.as_deref().and_then(normalize_job_type),
        work_setting: Some(work_setting),
        date_posted: candidate
            .date_posted_text
            .as_deref()
            .and_then(|text| parse_posted_date(text, config.scraped_at))
            .map(Loose::Value),
        date_scraped: Some(Loose::Value(config.scraped_at)),
        job_url: candidate.link.clone(),
        search_url: config.search_url.clone(),
        queried_job_title: config.queried_job_title.clone(),
        description: candidate.description_html.as_deref().and_then(html_to_text),
    };
    validate_record(draft, config.scraped_at)
}

/// Run a whole sequence of batches through a fresh assembler.
pub fn assemble<I>(config: PipelineConfig, known_ids: HashSet<String>, batches: I, cancel: CancellationToken) -> RunOutput
where
    I: IntoIterator<Item = Vec<RawCandidate>>,
{
    let mut assembler = ListingAssembler::new(config, known_ids, cancel);
    for batch in batches {
        if assembler.is_exhausted() {
            break;
        }
        assembler.process_batch(&batch);
    }
    assembler.into_output()
}
