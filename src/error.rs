use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong while mirroring a page.
///
/// Page-level variants (`InvalidUrl`, `Fetch`, `PageWrite`) abort the run for
/// one URL. `Resource` never escapes the downloader except as a recorded
/// failure, and `LedgerIo` is logged without rolling back in-memory state.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("failed to rewrite HTML: {0}")]
    Rewrite(String),

    #[error("failed to write page file {path:?}: {source}")]
    PageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to mirror resource {url}: {reason}")]
    Resource { url: String, reason: String },

    #[error("ledger file {path:?}: {reason}")]
    LedgerIo { path: PathBuf, reason: String },

    #[error("failed to prepare output directory {path:?}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

impl MirrorError {
    pub(crate) fn invalid_url(url: &str, reason: impl Into<String>) -> Self {
        MirrorError::InvalidUrl {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn fetch(url: &str, reason: impl ToString) -> Self {
        MirrorError::Fetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn resource(url: &str, reason: impl ToString) -> Self {
        MirrorError::Resource {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn ledger(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        MirrorError::LedgerIo {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MirrorError>;
