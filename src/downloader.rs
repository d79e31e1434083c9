use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{Client, ClientBuilder};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use url::Url;

use crate::config::MirrorConfig;
use crate::error::{MirrorError, Result};
use crate::file_manager::FileManager;
use crate::html_parser::ResourceReference;

/// HTTP client shared by page and resource requests.
pub fn build_http_client(config: &MirrorConfig) -> Result<Client> {
    let client = ClientBuilder::new()
        .use_rustls_tls()
        .user_agent(config.user_agent.as_str())
        .timeout(config.timeout)
        .build()?;

    Ok(client)
}

/// Local destination of a resource: `dest_dir` joined with the URL path.
///
/// The query string is dropped; every `/`-separated segment becomes a
/// directory level on disk.
pub fn resource_local_path(url: &Url, dest_dir: &Path) -> Result<PathBuf> {
    let path = url.path();
    if path.ends_with('/') {
        return Err(MirrorError::resource(url.as_str(), "URL path has no file name"));
    }

    let mut local = dest_dir.to_path_buf();
    let mut depth = 0;
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if segment == "." || segment == ".." {
            return Err(MirrorError::resource(url.as_str(), "URL path escapes the site directory"));
        }
        local.push(segment);
        depth += 1;
    }

    if depth == 0 {
        return Err(MirrorError::resource(url.as_str(), "URL path has no file name"));
    }
    Ok(local)
}

#[derive(Debug)]
pub struct ResourceFailure {
    pub url: Url,
    pub error: MirrorError,
}

/// Outcome of one page's resource fan-out.
#[derive(Debug, Default)]
pub struct DownloadSummary {
    pub saved: Vec<PathBuf>,
    pub failed: Vec<ResourceFailure>,
}

impl DownloadSummary {
    pub fn attempted(&self) -> usize {
        self.saved.len() + self.failed.len()
    }
}

/// Fetches a page's resources concurrently, isolating failures per resource.
#[derive(Clone)]
pub struct ResourceDownloader {
    client: Client,
    file_manager: FileManager,
    semaphore: Arc<Semaphore>,
    show_progress: bool,
}

impl ResourceDownloader {
    pub fn new(
        client: Client,
        file_manager: FileManager,
        max_concurrent: usize,
        show_progress: bool,
    ) -> Self {
        Self {
            client,
            file_manager,
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            show_progress,
        }
    }

    /// Downloads every reference and waits for all of them to settle.
    ///
    /// Never fails as a whole: each error is logged and recorded in the
    /// returned summary while sibling downloads carry on.
    pub async fn download_all(&self, references: &[ResourceReference]) -> DownloadSummary {
        let progress = self.progress_bar(references.len());

        let tasks = references.iter().map(|reference| {
            let progress = progress.clone();
            async move {
                let outcome = match self.semaphore.acquire().await {
                    Ok(_permit) => self.download_one(reference).await,
                    Err(e) => Err(MirrorError::resource(reference.url.as_str(), e)),
                };
                progress.inc(1);
                (reference, outcome)
            }
        });

        let mut summary = DownloadSummary::default();
        for (reference, outcome) in join_all(tasks).await {
            match outcome {
                Ok(path) => {
                    tracing::debug!(url = %reference.url, path = ?path, "saved resource");
                    summary.saved.push(path);
                }
                Err(error) => {
                    tracing::warn!(url = %reference.url, error = %error, "resource download failed");
                    summary.failed.push(ResourceFailure {
                        url: reference.url.clone(),
                        error,
                    });
                }
            }
        }

        progress.finish_and_clear();
        summary
    }

    async fn download_one(&self, reference: &ResourceReference) -> Result<PathBuf> {
        let url = reference.url.as_str();

        let response = self
            .client
            .get(reference.url.clone())
            .send()
            .await
            .map_err(|e| MirrorError::resource(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MirrorError::resource(url, format!("HTTP {}", status)));
        }

        let content = response
            .bytes()
            .await
            .map_err(|e| MirrorError::resource(url, e))?;

        self.file_manager
            .save_file(&reference.local_path, &content)
            .await
            .map_err(|e| MirrorError::resource(url, e))
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress || len == 0 {
            return ProgressBar::hidden();
        }

        let progress = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} resources") {
            progress.set_style(style.progress_chars("=> "));
        }
        progress
    }
}
