//! Raw results pages as they arrived, kept next to an index of where each came from.
//!
//! Layout: `<fetched_at %Y%m%d_%H%M%S>/<search_id>/<sha256>.json` for bodies and
//! `<fetched_at>/<search_id>/index.jsonl` with one [`ArchiveIndexEntry`] per page seen,
//! including pages whose body was already on disk.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

pub const INDEX_FILE: &str = "index.jsonl";

/// The search a page belongs to.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveTarget<'a> {
    pub search_id: &'a str,
    pub search_url: &'a str,
}

/// One line of `index.jsonl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveIndexEntry {
    pub page_no: u32,
    pub search_url: String,
    pub content_hash: String,
    /// Body file name, relative to the index.
    pub file: String,
    pub byte_size: usize,
    pub fetched_at: DateTime<Utc>,
    pub deduplicated: bool,
}

#[derive(Debug, Clone)]
pub struct ArchivedPage {
    pub entry: ArchiveIndexEntry,
    pub path: PathBuf,
}

impl ArchivedPage {
    pub fn deduplicated(&self) -> bool {
        self.entry.deduplicated
    }
}

#[derive(Debug, Clone)]
pub struct PageArchive {
    root: PathBuf,
}

impl PageArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn content_hash(bytes: &[u8]) -> String {
        hex::encode(Sha256::digest(bytes))
    }

    pub fn search_dir(&self, fetched_at: DateTime<Utc>, search_id: &str) -> PathBuf {
        self.root
            .join(fetched_at.format("%Y%m%d_%H%M%S").to_string())
            .join(search_id)
    }

    /// Archive page `page_no` of `target` and record it in the search's index.
    pub async fn store_page(
        &self,
        fetched_at: DateTime<Utc>,
        target: ArchiveTarget<'_>,
        page_no: u32,
        bytes: &[u8],
    ) -> anyhow::Result<ArchivedPage> {
        let dir = self.search_dir(fetched_at, target.search_id);
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("creating archive directory {}", dir.display()))?;

        let content_hash = Self::content_hash(bytes);
        let file = format!("{content_hash}.json");
        let path = dir.join(&file);
        let written = write_if_absent(&path, bytes).await?;

        let entry = ArchiveIndexEntry {
            page_no,
            search_url: target.search_url.to_string(),
            content_hash,
            file,
            byte_size: bytes.len(),
            fetched_at,
            deduplicated: !written,
        };
        append_index(&dir.join(INDEX_FILE), &entry).await?;
        debug!(search_id = target.search_id, page_no, deduplicated = entry.deduplicated, "page archived");
        Ok(ArchivedPage { entry, path })
    }

    /// Index entries of one search, in the order the pages were stored.
    pub async fn index(&self, fetched_at: DateTime<Utc>, search_id: &str) -> anyhow::Result<Vec<ArchiveIndexEntry>> {
        let path = self.search_dir(fetched_at, search_id).join(INDEX_FILE);
        let text = match fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err).with_context(|| format!("reading {}", path.display())),
        };
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(idx, line)| {
                serde_json::from_str(line).with_context(|| format!("parsing {} entry {}", path.display(), idx + 1))
            })
            .collect()
    }
}

/// Returns `false` when `path` already holds a body. New bodies are staged in a
/// `.partial` sibling so a reader never sees a half-written page.
async fn write_if_absent(path: &Path, bytes: &[u8]) -> anyhow::Result<bool> {
    if fs::try_exists(path)
        .await
        .with_context(|| format!("checking {}", path.display()))?
    {
        return Ok(false);
    }
    let staged = path.with_extension(format!("{}.partial", Uuid::new_v4().simple()));
    if let Err(err) = fs::write(&staged, bytes).await {
        let _ = fs::remove_file(&staged).await;
        return Err(err).with_context(|| format!("writing {}", staged.display()));
    }
    if let Err(err) = fs::rename(&staged, path).await {
        let _ = fs::remove_file(&staged).await;
        return Err(err).with_context(|| format!("moving {} into place", staged.display()));
    }
    Ok(true)
}

async fn append_index(path: &Path, entry: &ArchiveIndexEntry) -> anyhow::Result<()> {
    let mut line = serde_json::to_vec(entry).context("serializing archive index entry")?;
    line.push(b'\n');
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("opening {}", path.display()))?;
    file.write_all(&line)
        .await
        .with_context(|| format!("appending to {}", path.display()))?;
    file.flush().await.with_context(|| format!("flushing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const URL: &str = "https://www.indeed.com/jobs?q=Line+Cook";

    fn fetched_at() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-10T12:00:00Z")
            .expect("ts")
            .with_timezone(&Utc)
    }

    fn target() -> ArchiveTarget<'static> {
        ArchiveTarget {
            search_id: "line-cook",
            search_url: URL,
        }
    }

    #[test]
    fn content_hash_is_sha256_hex() {
        assert_eq!(
            PageArchive::content_hash(b"hello world"),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[tokio::test]
    async fn repeated_body_is_indexed_but_written_once() {
        let dir = tempdir().expect("tempdir");
        let archive = PageArchive::new(dir.path());

        let first = archive
            .store_page(fetched_at(), target(), 1, br#"{"cards":[]}"#)
            .await
            .expect("first store");
        let second = archive
            .store_page(fetched_at(), target(), 2, br#"{"cards":[]}"#)
            .await
            .expect("second store");

        assert!(!first.deduplicated());
        assert!(second.deduplicated());
        assert_eq!(first.path, second.path);
        assert!(first.path.starts_with(dir.path().join("20240310_120000").join("line-cook")));
        assert!(first.path.exists());

        let entries = archive.index(fetched_at(), "line-cook").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].page_no, 1);
        assert_eq!(entries[1].page_no, 2);
        assert!(entries[1].deduplicated);
        assert_eq!(entries[0].search_url, URL);
        assert_eq!(entries[0].file, entries[1].file);
    }

    #[tokio::test]
    async fn no_partial_files_remain_after_a_store() {
        let dir = tempdir().expect("tempdir");
        let archive = PageArchive::new(dir.path());
        let stored = archive
            .store_page(fetched_at(), target(), 1, b"<html></html>")
            .await
            .unwrap();

        let names = std::fs::read_dir(stored.path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect::<Vec<_>>();
        assert_eq!(names.len(), 2, "{names:?}");
        assert!(names.iter().all(|n| !n.ends_with(".partial")));
        assert_eq!(std::fs::read(&stored.path).unwrap(), b"<html></html>");
    }

    #[tokio::test]
    async fn index_of_an_unarchived_search_is_empty() {
        let dir = tempdir().expect("tempdir");
        let archive = PageArchive::new(dir.path());
        assert!(archive.index(fetched_at(), "nothing").await.unwrap().is_empty());
    }
}
