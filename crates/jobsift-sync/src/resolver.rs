//! Identity and duplicate resolution over one run.

use std::collections::HashSet;

use jobsift_core::{RawCandidate, MAX_JOB_ID_LENGTH};
use jobsift_normalize::ValidationError;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateReason {
    /// Stored by an earlier run.
    KnownId,
    /// Accepted earlier in this run under the same id.
    SeenThisRun,
    /// Accepted earlier in this run under the same title/company pair.
    SeenCompositeKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    New { job_id: String },
    Duplicate(DuplicateReason),
    Invalid(ValidationError),
}

/// `"<title>_<company>"` from the trimmed values, when both are present.
pub fn composite_key(candidate: &RawCandidate) -> Option<String> {
    let title = non_blank(candidate.title.as_deref())?;
    let company = non_blank(candidate.company.as_deref())?;
    Some(format!("{title}_{company}"))
}

/// Stable id for a card without a job key, derived from its composite key.
pub fn synthetic_job_id(composite_key: &str) -> String {
    format!("ad-{}", Uuid::new_v5(&Uuid::NAMESPACE_URL, composite_key.as_bytes()))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Holds the three tracking sets of a single run. Never share one between runs.
#[derive(Debug, Clone, Default)]
pub struct DuplicateResolver {
    known_ids: HashSet<String>,
    seen_ids: HashSet<String>,
    seen_keys: HashSet<String>,
}

impl DuplicateResolver {
    pub fn new(known_ids: HashSet<String>) -> Self {
        Self {
            known_ids,
            ..Self::default()
        }
    }

    /// Classify `candidate`. The id is checked first against stored and
    /// already-accepted ids, then the composite key against accepted keys.
    /// A synthetic ad id only meets the stored set: within a run, ads are
    /// caught by their composite key. Only a `New` outcome registers anything.
    pub fn resolve(&mut self, candidate: &RawCandidate) -> Resolution {
        let key = composite_key(candidate);
        let external_id = non_blank(candidate.external_id.as_deref());
        let job_id = external_id
            .map(str::to_string)
            .or_else(|| key.as_deref().map(synthetic_job_id));

        let Some(job_id) = job_id else {
            return Resolution::Invalid(ValidationError::IdentityAmbiguity);
        };
        // Checked before any set lookup so the compared id is the stored id.
        let id_len = job_id.chars().count();
        if id_len > MAX_JOB_ID_LENGTH {
            return Resolution::Invalid(ValidationError::JobIdTooLong(id_len));
        }

        if self.known_ids.contains(&job_id) {
            return Resolution::Duplicate(DuplicateReason::KnownId);
        }
        if external_id.is_some() && self.seen_ids.contains(&job_id) {
            return Resolution::Duplicate(DuplicateReason::SeenThisRun);
        }
        if key.as_ref().is_some_and(|k| self.seen_keys.contains(k)) {
            return Resolution::Duplicate(DuplicateReason::SeenCompositeKey);
        }

        self.seen_ids.insert(job_id.clone());
        if let Some(key) = key {
            self.seen_keys.insert(key);
        }
        Resolution::New { job_id }
    }

    pub fn seen_ids(&self) -> &HashSet<String> {
        &self.seen_ids
    }
}
