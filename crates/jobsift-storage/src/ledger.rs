//! Append-only JSON-lines store of accepted job records.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use jobsift_core::JobRecord;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger io on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt ledger line {line} in {path}: {source}")]
    Corrupt {
        path: String,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("serializing record {job_id}: {source}")]
    Encode {
        job_id: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct JobLedger {
    path: PathBuf,
}

impl JobLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> LedgerError {
        LedgerError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    /// Every record stored so far, in append order. A missing file is an empty ledger.
    pub async fn records(&self) -> Result<Vec<JobRecord>, LedgerError> {
        let text = match fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(self.io_error(err)),
        };

        text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                serde_json::from_str(line).map_err(|source| LedgerError::Corrupt {
                    path: self.path.display().to_string(),
                    line: idx + 1,
                    source,
                })
            })
            .collect()
    }

    pub async fn known_ids(&self) -> Result<HashSet<String>, LedgerError> {
        Ok(self.records().await?.into_iter().map(|r| r.job_id).collect())
    }

    /// Append records whose `job_id` is not stored yet; returns how many were written.
    pub async fn append(&self, records: &[JobRecord]) -> Result<usize, LedgerError> {
        let mut stored = self.known_ids().await?;
        let mut buf = String::new();
        let mut written = 0usize;
        for record in records {
            if !stored.insert(record.job_id.clone()) {
                debug!(job_id = %record.job_id, "ledger already holds record");
                continue;
            }
            let line = serde_json::to_string(record).map_err(|source| LedgerError::Encode {
                job_id: record.job_id.clone(),
                source,
            })?;
            buf.push_str(&line);
            buf.push('\n');
            written += 1;
        }
        if written == 0 {
            return Ok(0);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| self.io_error(e))?;
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        file.write_all(buf.as_bytes()).await.map_err(|e| self.io_error(e))?;
        file.flush().await.map_err(|e| self.io_error(e))?;
        Ok(written)
    }
}
