use reqwest::Client;
use std::fmt;
use url::Url;

use crate::config::MirrorConfig;
use crate::downloader::{build_http_client, DownloadSummary, ResourceDownloader};
use crate::error::{MirrorError, Result};
use crate::file_manager::FileManager;
use crate::html_parser::{scan_html, HtmlParser};
use crate::html_rewriter::rewrite_html;
use crate::ledger::{LedgerStore, MetadataLedger, PageMetadata};
use crate::normalizer::{normalize_url, MirrorTarget};

/// Steps of one mirroring run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorStage {
    Normalizing,
    Fetching,
    RewritingAndWriting,
    DownloadingResources,
    UpdatingMetadata,
    Done,
    /// Terminal state for a run that aborted; the ledger was not touched.
    Failed,
}

impl MirrorStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, MirrorStage::Done | MirrorStage::Failed)
    }
}

impl fmt::Display for MirrorStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MirrorStage::Normalizing => "normalizing",
            MirrorStage::Fetching => "fetching",
            MirrorStage::RewritingAndWriting => "rewriting",
            MirrorStage::DownloadingResources => "downloading resources",
            MirrorStage::UpdatingMetadata => "updating metadata",
            MirrorStage::Done => "done",
            MirrorStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What a successful mirroring run produced.
#[derive(Debug)]
pub struct MirrorReport {
    pub target: MirrorTarget,
    pub resources: DownloadSummary,
    pub metadata: PageMetadata,
}

/// Result of one requested URL in [`PageMirror::mirror_all`].
#[derive(Debug)]
pub struct MirrorOutcome {
    pub url: String,
    pub result: Result<MirrorReport>,
}

/// Drives page mirroring and owns the metadata ledger for the invocation.
pub struct PageMirror {
    client: Client,
    file_manager: FileManager,
    downloader: ResourceDownloader,
    ledger: MetadataLedger,
    store: LedgerStore,
}

impl PageMirror {
    /// Bootstraps the output directory and loads the ledger. Both steps are
    /// finished before any page is mirrored.
    pub async fn new(config: MirrorConfig) -> Result<Self> {
        let client = build_http_client(&config)?;
        let file_manager =
            FileManager::new(&config.output_dir).map_err(|source| MirrorError::OutputDir {
                path: config.output_dir.clone(),
                source,
            })?;

        let store = LedgerStore::new(file_manager.clone());
        if let Err(e) = store.initialize().await {
            tracing::error!(error = %e, "could not create metadata ledger file");
        }
        let ledger = store.load().await;

        let downloader = ResourceDownloader::new(
            client.clone(),
            file_manager.clone(),
            config.max_concurrent,
            config.show_progress,
        );

        Ok(Self {
            client,
            file_manager,
            downloader,
            ledger,
            store,
        })
    }

    pub fn ledger(&self) -> &MetadataLedger {
        &self.ledger
    }

    pub fn lookup(&self, raw_url: &str) -> Result<Option<&PageMetadata>> {
        let url = normalize_url(raw_url)?;
        Ok(self.ledger.lookup(&url))
    }

    /// Mirrors each URL in turn. A failing URL is logged and does not stop
    /// the ones after it.
    pub async fn mirror_all<S: AsRef<str>>(&mut self, urls: &[S]) -> Vec<MirrorOutcome> {
        let mut outcomes = Vec::with_capacity(urls.len());
        for url in urls {
            let url = url.as_ref();
            let result = self.mirror_url(url).await;
            outcomes.push(MirrorOutcome {
                url: url.to_string(),
                result,
            });
        }
        outcomes
    }

    /// Runs the full fetch, rewrite, download and record sequence for one URL.
    ///
    /// Errors before the page file is written leave the ledger untouched.
    /// Resource failures only show up in the report.
    pub async fn mirror_url(&mut self, raw_url: &str) -> Result<MirrorReport> {
        let mut stage = MirrorStage::Normalizing;
        let result = self.run(raw_url, &mut stage).await;

        match &result {
            Ok(report) => tracing::info!(
                url = %report.target.url,
                saved = report.resources.saved.len(),
                failed = report.resources.failed.len(),
                fetches = report.metadata.fetch_count,
                "mirror complete"
            ),
            Err(e) => {
                tracing::error!(url = raw_url, failed_at = %stage, error = %e, "mirror failed");
                advance(&mut stage, MirrorStage::Failed, raw_url);
            }
        }
        result
    }

    async fn run(&mut self, raw_url: &str, stage: &mut MirrorStage) -> Result<MirrorReport> {
        let target = MirrorTarget::new(raw_url, self.file_manager.base_dir())?;

        advance(stage, MirrorStage::Fetching, &target.url);
        let (page_url, html) = self.fetch_page(&target.url).await?;

        advance(stage, MirrorStage::RewritingAndWriting, &target.url);
        let rewritten = rewrite_html(&html, &target.site_dir_name)?;
        self.file_manager
            .save_file(&target.page_path, rewritten.as_bytes())
            .await
            .map_err(|source| MirrorError::PageWrite {
                path: target.page_path.clone(),
                source,
            })?;

        advance(stage, MirrorStage::DownloadingResources, &target.url);
        let scan = scan_html(&html);
        let parser = HtmlParser::new(page_url.as_str())?;
        let references = parser.resource_references(&scan, &target.site_dir);
        let resources = self.downloader.download_all(&references).await;

        advance(stage, MirrorStage::UpdatingMetadata, &target.url);
        let metadata = self.ledger.record_fetch(&target.url, &html).clone();
        if let Err(e) = self.store.save(&self.ledger).await {
            tracing::error!(url = %target.url, error = %e, "failed to persist metadata ledger");
        }

        advance(stage, MirrorStage::Done, &target.url);
        Ok(MirrorReport {
            target,
            resources,
            metadata,
        })
    }

    /// GETs the page and returns its final URL (after redirects) and body.
    async fn fetch_page(&self, url: &str) -> Result<(Url, String)> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "text/html,*/*;q=0.8")
            .send()
            .await
            .map_err(|e| MirrorError::fetch(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MirrorError::fetch(url, format!("HTTP {}", status)));
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| MirrorError::fetch(url, e))?;

        Ok((final_url, body))
    }
}

fn advance(stage: &mut MirrorStage, next: MirrorStage, url: &str) {
    debug_assert!(!stage.is_terminal(), "no transition out of {stage}");
    tracing::debug!(url, from = %stage, to = %next, "mirror stage");
    *stage = next;
}
