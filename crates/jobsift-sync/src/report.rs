//! Per-run report files and the multi-run markdown digest.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use jobsift_core::JobRecord;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::warn;

use crate::pipeline::{SearchRunReport, SyncRunSummary};

pub const RUN_SUMMARY_FILE: &str = "run_summary.md";
pub const JOBS_DELTA_FILE: &str = "jobs_delta.json";

/// Contents of `jobs_delta.json`: the run and every record it accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsDelta {
    pub run: SyncRunSummary,
    pub jobs: Vec<JobRecord>,
}

pub fn reports_dir_for(workspace_root: &Path, run_id: &str) -> PathBuf {
    workspace_root.join("reports").join(run_id)
}

fn search_line(search: &SearchRunReport) -> String {
    match &search.error {
        Some(error) => format!(
            "- {}: FAILED after {} pages, {} stored: {}",
            search.search_id, search.pages_processed, search.stored, error
        ),
        None => format!(
            "- {}: {} new, {} duplicate, {} invalid of {} ({} pages, stopped: {})",
            search.search_id,
            search.summary.new_count,
            search.summary.duplicate_count,
            search.summary.invalid_count,
            search.summary.total_candidates,
            search.pages_processed,
            search.stop_reason.as_str(),
        ),
    }
}

pub fn render_run_summary(summary: &SyncRunSummary) -> String {
    let mut lines = vec![
        "# Jobsift Run Summary".to_string(),
        String::new(),
        format!("- Run ID: `{}`", summary.run_id),
        format!("- Started: {}", summary.started_at),
        format!("- Finished: {}", summary.finished_at),
        format!("- Store: `{}`", summary.store),
        format!(
            "- Totals: {} new, {} duplicate, {} invalid of {} candidates",
            summary.totals.new_count,
            summary.totals.duplicate_count,
            summary.totals.invalid_count,
            summary.totals.total_candidates
        ),
    ];
    let failed = summary.searches.iter().filter(|s| s.failed()).count();
    if failed > 0 {
        lines.push(format!("- Failed searches: {failed} of {}", summary.searches.len()));
    }
    if summary.cancelled {
        lines.push("- Cancelled before all searches completed".to_string());
    }
    lines.push(String::new());
    lines.push("## Searches".to_string());
    lines.extend(summary.searches.iter().map(search_line));
    lines.push(String::new());
    lines.join("\n")
}

/// Write `run_summary.md` and `jobs_delta.json` into `reports_dir`.
pub async fn write_run_reports(reports_dir: &Path, summary: &SyncRunSummary, records: &[JobRecord]) -> Result<()> {
    fs::create_dir_all(reports_dir)
        .await
        .with_context(|| format!("creating {}", reports_dir.display()))?;

    fs::write(reports_dir.join(RUN_SUMMARY_FILE), render_run_summary(summary))
        .await
        .context("writing run_summary.md")?;

    let delta = JobsDelta {
        run: summary.clone(),
        jobs: records.to_vec(),
    };
    let delta_json = serde_json::to_vec_pretty(&delta).context("serializing jobs delta")?;
    fs::write(reports_dir.join(JOBS_DELTA_FILE), delta_json)
        .await
        .context("writing jobs_delta.json")?;
    Ok(())
}

pub fn read_jobs_delta(path: &Path) -> Result<JobsDelta> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))
}

/// Markdown digest of the `runs` most recently started runs, newest first.
/// Report directories without a readable delta are skipped.
pub fn report_markdown(runs: usize, workspace_root: Option<PathBuf>) -> Result<String> {
    let root = workspace_root.unwrap_or_else(|| PathBuf::from("."));
    let reports_root = root.join("reports");
    let mut deltas = std::fs::read_dir(&reports_root)
        .with_context(|| format!("reading {}", reports_root.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false))
        .filter_map(|entry| {
            let path = entry.path().join(JOBS_DELTA_FILE);
            match read_jobs_delta(&path) {
                Ok(delta) => Some((entry.path(), delta)),
                Err(err) => {
                    warn!(error = %format!("{err:#}"), "skipping report directory");
                    None
                }
            }
        })
        .collect::<Vec<_>>();
    deltas.sort_by(|(_, a), (_, b)| b.run.started_at.cmp(&a.run.started_at));

    let mut lines = vec!["# Jobsift Report".to_string(), String::new()];
    for (dir, delta) in deltas.into_iter().take(runs.max(1)) {
        let run = &delta.run;
        lines.push(format!("## Run `{}`", run.run_id));
        lines.push(format!("- started: {}", run.started_at.to_rfc3339()));
        lines.push(format!(
            "- jobs: {} new, {} duplicate, {} invalid of {}",
            run.totals.new_count, run.totals.duplicate_count, run.totals.invalid_count, run.totals.total_candidates
        ));
        if run.cancelled {
            lines.push("- cancelled".to_string());
        }
        lines.extend(run.searches.iter().map(|search| format!("  {}", search_line(search))));
        let manifest_path = dir.join("snapshots").join("manifest.json");
        if manifest_path.exists() {
            lines.push(format!("- parquet manifest: `{}`", manifest_path.display()));
        }
        lines.push(format!("- delta: `{}` ({} jobs)", dir.join(JOBS_DELTA_FILE).display(), delta.jobs.len()));
        lines.push(format!("- store: `{}`", run.store));
        lines.push(String::new());
    }

    Ok(lines.join("\n"))
}
