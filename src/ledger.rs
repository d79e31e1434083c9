use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{MirrorError, Result};
use crate::file_manager::FileManager;
use crate::html_parser::scan_html;

/// File name of the ledger inside the mirror root.
pub const LEDGER_FILE: &str = "metadata.json";

/// Statistics for one mirrored page, as stored in the ledger file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub url: String,
    #[serde(rename = "num_links")]
    pub link_count: usize,
    #[serde(rename = "num_images")]
    pub image_count: usize,
    pub last_fetch: DateTime<Utc>,
    #[serde(rename = "num_fetches")]
    pub fetch_count: u64,
}

/// In-memory map from canonical URL to page statistics.
///
/// Entries are only created by [`record_fetch`](Self::record_fetch), which
/// the pipeline calls after a mirror completes, so every entry has
/// `fetch_count >= 1`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataLedger {
    entries: BTreeMap<String, PageMetadata>,
}

impl MetadataLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a ledger from a persisted snapshot. Later duplicates win.
    pub fn from_entries(entries: impl IntoIterator<Item = PageMetadata>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|entry| (entry.url.clone(), entry))
                .collect(),
        }
    }

    pub fn record_fetch(&mut self, url: &str, html_content: &str) -> &PageMetadata {
        self.record_fetch_at(url, html_content, Utc::now())
    }

    /// Replaces the entry for `url` with counts from `html_content`, carrying
    /// over and incrementing the previous fetch count.
    pub fn record_fetch_at(
        &mut self,
        url: &str,
        html_content: &str,
        fetched_at: DateTime<Utc>,
    ) -> &PageMetadata {
        let scan = scan_html(html_content);
        let previous = self.entries.get(url).map_or(0, |entry| entry.fetch_count);

        let entry = PageMetadata {
            url: url.to_string(),
            link_count: scan.link_count,
            image_count: scan.image_count,
            last_fetch: fetched_at,
            fetch_count: previous + 1,
        };
        self.entries.insert(url.to_string(), entry);
        &self.entries[url]
    }

    pub fn lookup(&self, url: &str) -> Option<&PageMetadata> {
        self.entries.get(url)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Full copy of the ledger, ordered by URL.
    pub fn snapshot(&self) -> Vec<PageMetadata> {
        self.entries.values().cloned().collect()
    }
}

/// Loads and saves the ledger as a JSON array under the mirror root.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    file_manager: FileManager,
    path: PathBuf,
}

impl LedgerStore {
    pub fn new(file_manager: FileManager) -> Self {
        let path = file_manager.path_for(LEDGER_FILE);
        Self { file_manager, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes an empty ledger file if none exists. Completes before returning
    /// so a following [`load`](Self::load) never sees a partial file.
    pub async fn initialize(&self) -> Result<()> {
        if self.file_manager.file_exists(&self.path) {
            return Ok(());
        }
        tracing::info!(path = ?self.path, "creating empty metadata ledger");
        self.write(&[]).await
    }

    /// Reads the ledger file. A missing or unparsable file yields an empty
    /// ledger; the problem is logged, never returned.
    pub async fn load(&self) -> MetadataLedger {
        match self.read().await {
            Ok(entries) => {
                tracing::debug!(path = ?self.path, entries = entries.len(), "loaded metadata ledger");
                MetadataLedger::from_entries(entries)
            }
            Err(e) => {
                tracing::warn!(error = %e, "starting with an empty metadata ledger");
                MetadataLedger::new()
            }
        }
    }

    pub async fn save(&self, ledger: &MetadataLedger) -> Result<()> {
        self.write(&ledger.snapshot()).await
    }

    async fn read(&self) -> Result<Vec<PageMetadata>> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| MirrorError::ledger(&self.path, e))?;
        serde_json::from_str(&raw).map_err(|e| MirrorError::ledger(&self.path, e))
    }

    async fn write(&self, entries: &[PageMetadata]) -> Result<()> {
        let json =
            serde_json::to_string_pretty(entries).map_err(|e| MirrorError::ledger(&self.path, e))?;
        self.file_manager
            .save_file_atomic(&self.path, json.as_bytes())
            .await
            .map_err(|e| MirrorError::ledger(&self.path, e))?;
        Ok(())
    }
}
