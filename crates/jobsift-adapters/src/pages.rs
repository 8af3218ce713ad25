//! Captured result pages and the page-at-a-time candidate source contract.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::Context;
use async_trait::async_trait;
use jobsift_core::{CardFields, RawCandidate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::{candidate_from_card, parse_results_page, AdapterError};

static PAGE_FILE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^page-(\d+)\.json$").unwrap());

/// Body of a `page-NNN.json` file: either pre-extracted cards or the rendered page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageContent {
    Cards { cards: Vec<CardFields> },
    Html { html: String },
}

impl PageContent {
    pub fn cards(&self) -> Result<Vec<CardFields>, AdapterError> {
        match self {
            PageContent::Cards { cards } => Ok(cards
                .iter()
                .filter(|card| card.has_required())
                .cloned()
                .collect()),
            PageContent::Html { html } => parse_results_page(html),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PageBundle {
    pub page_no: u32,
    pub path: PathBuf,
    pub raw: Vec<u8>,
    pub content: PageContent,
}

/// One crawled page worth of candidates, in on-page order.
#[derive(Debug, Clone, Default)]
pub struct CandidatePage {
    pub page_no: u32,
    pub raw: Vec<u8>,
    pub candidates: Vec<RawCandidate>,
}

#[async_trait]
pub trait CandidateSource: Send {
    /// Next page, or `None` once the listing has no more pages.
    async fn next_page(&mut self) -> Result<Option<CandidatePage>, AdapterError>;
}

/// `page-NNN.json` files under `dir`, ordered by page number.
pub async fn list_page_files(dir: impl AsRef<Path>) -> Result<Vec<(u32, PathBuf)>, AdapterError> {
    let dir = dir.as_ref();
    let mut entries = fs::read_dir(dir)
        .await
        .with_context(|| format!("reading page directory {}", dir.display()))?;

    let mut pages = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("listing {}", dir.display()))?
    {
        let name = entry.file_name().to_string_lossy().to_string();
        let Some(page_no) = PAGE_FILE
            .captures(&name)
            .and_then(|c| c[1].parse::<u32>().ok())
        else {
            continue;
        };
        pages.push((page_no, entry.path()));
    }
    pages.sort_by_key(|(page_no, _)| *page_no);
    Ok(pages)
}

pub async fn load_page_bundle(page_no: u32, path: impl AsRef<Path>) -> Result<PageBundle, AdapterError> {
    let path = path.as_ref();
    let raw = fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let content = serde_json::from_slice(&raw).map_err(|source| AdapterError::MalformedPage {
        path: path.display().to_string(),
        source,
    })?;
    Ok(PageBundle {
        page_no,
        path: path.to_path_buf(),
        raw,
        content,
    })
}

/// Replays a directory of captured pages in page order.
#[derive(Debug)]
pub struct FixtureCandidateSource {
    files: VecDeque<(u32, PathBuf)>,
}

impl FixtureCandidateSource {
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, AdapterError> {
        let files = list_page_files(dir).await?;
        Ok(Self { files: files.into() })
    }

    pub fn remaining(&self) -> usize {
        self.files.len()
    }
}

#[async_trait]
impl CandidateSource for FixtureCandidateSource {
    async fn next_page(&mut self) -> Result<Option<CandidatePage>, AdapterError> {
        let Some((page_no, path)) = self.files.pop_front() else {
            return Ok(None);
        };
        let bundle = load_page_bundle(page_no, &path).await?;
        let candidates = bundle
            .content
            .cards()?
            .iter()
            .map(candidate_from_card)
            .collect::<Vec<_>>();
        debug!(page_no, path = %path.display(), candidates = candidates.len(), "loaded page");
        Ok(Some(CandidatePage {
            page_no,
            raw: bundle.raw,
            candidates,
        }))
    }
}

/// In-memory pages, handed out in order.
#[derive(Debug, Default)]
pub struct StaticCandidateSource {
    pages: VecDeque<Vec<RawCandidate>>,
    next_page_no: u32,
}

impl StaticCandidateSource {
    pub fn new(pages: Vec<Vec<RawCandidate>>) -> Self {
        Self {
            pages: pages.into(),
            next_page_no: 1,
        }
    }
}

#[async_trait]
impl CandidateSource for StaticCandidateSource {
    async fn next_page(&mut self) -> Result<Option<CandidatePage>, AdapterError> {
        let Some(candidates) = self.pages.pop_front() else {
            return Ok(None);
        };
        let page_no = self.next_page_no;
        self.next_page_no += 1;
        Ok(Some(CandidatePage {
            page_no,
            raw: Vec::new(),
            candidates,
        }))
    }
}
