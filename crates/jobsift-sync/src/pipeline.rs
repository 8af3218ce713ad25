use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use jobsift_adapters::{build_search_url, CandidateSource, FixtureCandidateSource};
use jobsift_core::{JobRecord, RunSummary};
use jobsift_storage::{ArchiveTarget, JobLedger, JobStore, PageArchive, PgJobRepository};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::assembler::{ListingAssembler, PipelineConfig, StopReason};
use crate::config::{SearchConfig, SearchRegistry, SyncConfig};
use crate::export::export_snapshot;
use crate::report::{reports_dir_for, write_run_reports};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRunReport {
    pub search_id: String,
    pub search_url: String,
    pub pages_processed: usize,
    pub pages_archived: usize,
    pub stop_reason: StopReason,
    pub summary: RunSummary,
    /// Records the store actually took.
    pub stored: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchRunReport {
    fn pending(search_id: &str) -> Self {
        Self {
            search_id: search_id.to_string(),
            search_url: String::new(),
            pages_processed: 0,
            pages_archived: 0,
            stop_reason: StopReason::SourceFailed,
            summary: RunSummary::default(),
            stored: 0,
            error: None,
        }
    }

    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub store: String,
    pub searches: Vec<SearchRunReport>,
    pub totals: RunSummary,
    pub cancelled: bool,
    pub reports_dir: String,
    pub parquet_manifest: String,
}

/// Feed every page of `source` to `assembler` until either side is done.
/// Each page body is archived with its page number before its candidates are processed.
pub async fn drive_source<S>(
    assembler: &mut ListingAssembler,
    source: &mut S,
    archive: Option<(&PageArchive, ArchiveTarget<'_>)>,
) -> Result<usize>
where
    S: CandidateSource + ?Sized,
{
    let mut archived = 0usize;
    while !assembler.is_exhausted() {
        let Some(page) = source.next_page().await.context("loading next results page")? else {
            break;
        };
        if let Some((archive, target)) = archive.filter(|_| !page.raw.is_empty()) {
            let stored = archive
                .store_page(assembler.config().scraped_at, target, page.page_no, &page.raw)
                .await?;
            if !stored.deduplicated() {
                archived += 1;
            }
        }
        assembler.process_batch(&page.candidates);
    }
    Ok(archived)
}

pub struct SyncPipeline {
    config: SyncConfig,
    archive: PageArchive,
    store: Box<dyn JobStore>,
}

impl SyncPipeline {
    /// Uses PostgreSQL when `DATABASE_URL` is configured, the ledger file otherwise.
    pub async fn from_config(config: SyncConfig) -> Result<Self> {
        let store: Box<dyn JobStore> = match &config.database_url {
            Some(url) => {
                let repo = PgJobRepository::connect(url).await?;
                repo.migrate().await?;
                Box::new(repo)
            }
            None => Box::new(JobLedger::new(config.resolve(&config.ledger_path))),
        };
        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: SyncConfig, store: Box<dyn JobStore>) -> Self {
        let archive = PageArchive::new(config.resolve(&config.artifacts_dir));
        Self { config, archive, store }
    }

    pub fn store(&self) -> &dyn JobStore {
        self.store.as_ref()
    }

    pub async fn run_once(&self, cancel: &CancellationToken) -> Result<SyncRunSummary> {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();
        let registry = SearchRegistry::load(&self.config.registry_path()).await?;
        let searches = registry.enabled().collect::<Vec<_>>();
        info!(%run_id, searches = searches.len(), store = %self.store.describe(), "sync run started");

        let mut reports = Vec::new();
        let mut records = Vec::new();
        let mut totals = RunSummary::default();

        for search in searches {
            if cancel.is_cancelled() {
                warn!(search_id = %search.search_id, "run cancelled, skipping remaining searches");
                break;
            }
            let span = info_span!("search", search_id = %search.search_id);
            let report = self
                .run_search(search, started_at, cancel, &mut records)
                .instrument(span)
                .await;
            totals.merge(&report.summary);
            reports.push(report);
        }

        let cancelled = cancel.is_cancelled() || reports.iter().any(|r| r.stop_reason == StopReason::Cancelled);
        let reports_dir = reports_dir_for(&self.config.workspace_root, &run_id.to_string());
        let mut summary = SyncRunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            store: self.store.describe(),
            searches: reports,
            totals,
            cancelled,
            reports_dir: reports_dir.display().to_string(),
            parquet_manifest: String::new(),
        };

        let manifest_path = export_snapshot(&reports_dir, &records).await?;
        summary.parquet_manifest = manifest_path.display().to_string();
        write_run_reports(&reports_dir, &summary, &records).await?;

        info!(
            %run_id,
            new = totals.new_count,
            duplicates = totals.duplicate_count,
            invalid = totals.invalid_count,
            total = totals.total_candidates,
            cancelled,
            failed = summary.searches.iter().filter(|r| r.failed()).count(),
            "sync run finished"
        );
        Ok(summary)
    }

    /// Never fails the run: an error is recorded on the report and the records
    /// the search had already stored stay in `records`.
    async fn run_search(
        &self,
        search: &SearchConfig,
        scraped_at: DateTime<Utc>,
        cancel: &CancellationToken,
        records: &mut Vec<JobRecord>,
    ) -> SearchRunReport {
        let mut report = SearchRunReport::pending(&search.search_id);
        if let Err(err) = self.sync_search(search, scraped_at, cancel, &mut report, records).await {
            let message = format!("{err:#}");
            warn!(error = %message, "search failed, continuing with the next one");
            report.stop_reason = StopReason::SourceFailed;
            report.error = Some(message);
        }
        report
    }

    async fn sync_search(
        &self,
        search: &SearchConfig,
        scraped_at: DateTime<Utc>,
        cancel: &CancellationToken,
        report: &mut SearchRunReport,
        records: &mut Vec<JobRecord>,
    ) -> Result<()> {
        report.search_url = build_search_url(&search.query)
            .with_context(|| format!("building search url for {}", search.search_id))?;
        // Reloaded per search so records stored by an earlier search count as known.
        let known_ids: HashSet<String> = self.store.known_ids().await?;

        let pipeline_config = PipelineConfig {
            source: self.config.source.clone(),
            search_url: Some(report.search_url.clone()),
            queried_job_title: Some(search.query.job_title.clone()),
            max_pages: Some(search.max_pages.unwrap_or(self.config.max_pages)),
            max_results: self.config.max_results,
            scraped_at,
        };
        let mut assembler = ListingAssembler::new(pipeline_config, known_ids, cancel.child_token());

        let pages_dir = self.config.resolve(&search.pages_dir());
        let mut source = FixtureCandidateSource::open(&pages_dir)
            .await
            .with_context(|| format!("opening pages in {}", pages_dir.display()))?;
        let target = ArchiveTarget {
            search_id: &search.search_id,
            search_url: &report.search_url,
        };
        let driven = drive_source(&mut assembler, &mut source, Some((&self.archive, target))).await;

        // Whatever was accepted before a page error is still stored.
        let output = assembler.into_output();
        report.pages_processed = output.pages_processed;
        report.stop_reason = output.stop_reason;
        report.summary = output.summary;
        report.stored = self
            .store
            .insert_records(&output.records)
            .await
            .with_context(|| format!("storing records of {}", search.search_id))?;
        records.extend(output.records);
        report.pages_archived = driven?;

        info!(
            new = report.summary.new_count,
            duplicates = report.summary.duplicate_count,
            invalid = report.summary.invalid_count,
            stored = report.stored,
            stop = ?report.stop_reason,
            "search finished"
        );
        Ok(())
    }
}

pub async fn run_sync_once_from_env(cancel: &CancellationToken) -> Result<SyncRunSummary> {
    let config = SyncConfig::from_env();
    let pipeline = SyncPipeline::from_config(config).await?;
    pipeline.run_once(cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use async_trait::async_trait;
    use jobsift_adapters::{AdapterError, CandidatePage, StaticCandidateSource};
    use jobsift_core::RawCandidate;
    use tempfile::tempdir;

    /// Serves one page, then fails.
    struct BrokenAfterFirstPage {
        served: bool,
    }

    #[async_trait]
    impl CandidateSource for BrokenAfterFirstPage {
        async fn next_page(&mut self) -> Result<Option<CandidatePage>, AdapterError> {
            if self.served {
                return Err(AdapterError::Message("page 2 unreadable".into()));
            }
            self.served = true;
            Ok(Some(CandidatePage {
                page_no: 1,
                raw: Vec::new(),
                candidates: vec![card("Cook", "a"), card("Baker", "b")],
            }))
        }
    }

    fn card(title: &str, jk: &str) -> RawCandidate {
        RawCandidate {
            title: Some(title.into()),
            company: Some("Diner".into()),
            link: Some(format!("https://www.indeed.com/viewjob?jk={jk}")),
            external_id: Some(jk.into()),
            ..RawCandidate::default()
        }
    }

    fn assembler(max_pages: Option<usize>, cancel: CancellationToken) -> ListingAssembler {
        let config = PipelineConfig {
            max_pages,
            ..PipelineConfig::new(Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).single().unwrap())
        };
        ListingAssembler::new(config, HashSet::new(), cancel)
    }

    #[tokio::test]
    async fn driving_stops_at_the_page_limit() {
        let mut source = StaticCandidateSource::new(vec![
            vec![card("Cook", "a")],
            vec![card("Baker", "b")],
            vec![card("Host", "c")],
        ]);
        let mut assembler = assembler(Some(2), CancellationToken::new());
        drive_source(&mut assembler, &mut source, None).await.unwrap();

        let output = assembler.into_output();
        assert_eq!(output.stop_reason, StopReason::PageLimit);
        assert_eq!(output.records.len(), 2);
    }

    #[tokio::test]
    async fn driving_archives_raw_pages_once() {
        let dir = tempdir().expect("tempdir");
        let archive = PageArchive::new(dir.path());
        let dir_pages = dir.path().join("pages");
        std::fs::create_dir_all(&dir_pages).unwrap();
        let body = r#"{"cards":[{"title":"Cook","company":"Diner","link":"/rc/clk?jk=a1"}]}"#;
        std::fs::write(dir_pages.join("page-001.json"), body).unwrap();
        std::fs::write(dir_pages.join("page-002.json"), body).unwrap();

        let mut source = FixtureCandidateSource::open(&dir_pages).await.unwrap();
        let mut assembler = assembler(None, CancellationToken::new());
        let target = ArchiveTarget {
            search_id: "cook",
            search_url: "https://www.indeed.com/jobs?q=Cook",
        };
        let archived = drive_source(&mut assembler, &mut source, Some((&archive, target)))
            .await
            .unwrap();
        assert_eq!(archived, 1);
        let scraped_at = assembler.config().scraped_at;
        let index = archive.index(scraped_at, "cook").await.unwrap();
        assert_eq!(index.iter().map(|e| e.page_no).collect::<Vec<_>>(), vec![1, 2]);
        assert!(index[1].deduplicated);

        let output = assembler.into_output();
        assert_eq!(output.summary.new_count, 1);
        assert_eq!(output.summary.duplicate_count, 1);
        assert_eq!(output.stop_reason, StopReason::SourceExhausted);
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_the_first_page() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut source = StaticCandidateSource::new(vec![vec![card("Cook", "a")]]);
        let mut assembler = assembler(None, cancel);
        drive_source(&mut assembler, &mut source, None).await.unwrap();

        let output = assembler.into_output();
        assert_eq!(output.stop_reason, StopReason::Cancelled);
        assert_eq!(output.summary, RunSummary::default());
    }

    #[tokio::test]
    async fn page_error_keeps_what_earlier_pages_accepted() {
        let mut source = BrokenAfterFirstPage { served: false };
        let mut assembler = assembler(None, CancellationToken::new());
        let err = drive_source(&mut assembler, &mut source, None).await.unwrap_err();
        assert!(format!("{err:#}").contains("page 2 unreadable"));

        let output = assembler.into_output();
        assert_eq!(output.pages_processed, 1);
        assert_eq!(output.records.len(), 2);
    }
}
