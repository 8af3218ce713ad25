//! Durable side of the pipeline: raw page archive and job stores.

use std::collections::HashSet;

use async_trait::async_trait;
use jobsift_core::JobRecord;

pub mod archive;
pub mod ledger;
pub mod postgres;

pub use archive::{ArchiveIndexEntry, ArchiveTarget, ArchivedPage, PageArchive};
pub use ledger::{JobLedger, LedgerError};
pub use postgres::PgJobRepository;

pub const CRATE_NAME: &str = "jobsift-storage";

/// Where accepted records land and where cross-run `known_ids` come from.
#[async_trait]
pub trait JobStore: Send + Sync {
    fn describe(&self) -> String;
    async fn known_ids(&self) -> anyhow::Result<HashSet<String>>;
    /// Returns the number of records actually stored.
    async fn insert_records(&self, records: &[JobRecord]) -> anyhow::Result<usize>;
}

#[async_trait]
impl JobStore for JobLedger {
    fn describe(&self) -> String {
        format!("ledger:{}", self.path().display())
    }

    async fn known_ids(&self) -> anyhow::Result<HashSet<String>> {
        Ok(JobLedger::known_ids(self).await?)
    }

    async fn insert_records(&self, records: &[JobRecord]) -> anyhow::Result<usize> {
        Ok(self.append(records).await?)
    }
}

#[async_trait]
impl JobStore for PgJobRepository {
    fn describe(&self) -> String {
        "postgres:job_listings".to_string()
    }

    async fn known_ids(&self) -> anyhow::Result<HashSet<String>> {
        PgJobRepository::known_ids(self).await
    }

    async fn insert_records(&self, records: &[JobRecord]) -> anyhow::Result<usize> {
        PgJobRepository::insert_records(self, records).await
    }
}
