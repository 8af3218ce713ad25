use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use jobsift_adapters::SearchQuery;
use jobsift_core::DEFAULT_SOURCE;
use serde::Deserialize;
use tokio::fs;

pub const DEFAULT_MAX_PAGES: usize = 3;

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub workspace_root: PathBuf,
    pub artifacts_dir: PathBuf,
    pub ledger_path: PathBuf,
    pub database_url: Option<String>,
    pub max_pages: usize,
    pub max_results: Option<usize>,
    pub source: String,
}

impl SyncConfig {
    pub fn from_env() -> Self {
        Self {
            workspace_root: std::env::var("JOBSIFT_WORKSPACE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            artifacts_dir: std::env::var("ARTIFACTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./artifacts")),
            ledger_path: std::env::var("JOBSIFT_LEDGER")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data/jobs.jsonl")),
            database_url: std::env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty()),
            max_pages: std::env::var("JOBSIFT_MAX_PAGES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_PAGES),
            max_results: std::env::var("JOBSIFT_MAX_RESULTS")
                .ok()
                .and_then(|v| v.parse().ok()),
            source: std::env::var("JOBSIFT_SOURCE").unwrap_or_else(|_| DEFAULT_SOURCE.to_string()),
        }
    }

    /// Config rooted at `root`, with artifacts and ledger inside it.
    pub fn for_workspace(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            artifacts_dir: root.join("artifacts"),
            ledger_path: root.join("data").join("jobs.jsonl"),
            workspace_root: root,
            database_url: None,
            max_pages: DEFAULT_MAX_PAGES,
            max_results: None,
            source: DEFAULT_SOURCE.to_string(),
        }
    }

    pub fn registry_path(&self) -> PathBuf {
        self.workspace_root.join("searches.yaml")
    }

    /// Relative paths in the registry resolve against the workspace root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRegistry {
    pub searches: Vec<SearchConfig>,
}

impl SearchRegistry {
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("parsing search registry")
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn enabled(&self) -> impl Iterator<Item = &SearchConfig> {
        self.searches.iter().filter(|s| s.enabled)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub search_id: String,
    #[serde(flatten)]
    pub query: SearchQuery,
    #[serde(default)]
    pub max_pages: Option<usize>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Captured result pages for this search; defaults to `fixtures/searches/<search_id>`.
    #[serde(default)]
    pub pages_dir: Option<PathBuf>,
}

impl SearchConfig {
    pub fn pages_dir(&self) -> PathBuf {
        self.pages_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("fixtures").join("searches").join(&self.search_id))
    }
}

fn default_enabled() -> bool {
    true
}
