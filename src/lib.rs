pub mod cli;
pub mod config;
pub mod downloader;
pub mod error;
pub mod file_manager;
pub mod html_parser;
pub mod html_rewriter;
pub mod ledger;
pub mod normalizer;
pub mod pipeline;

// Re-export main types for convenience
pub use cli::{MirrorCommand, Mode};
pub use config::MirrorConfig;
pub use downloader::{DownloadSummary, ResourceDownloader, ResourceFailure};
pub use error::{MirrorError, Result};
pub use file_manager::FileManager;
pub use html_parser::{scan_html, HtmlParser, PageScan, ResourceKind, ResourceReference};
pub use html_rewriter::rewrite_html;
pub use ledger::{LedgerStore, MetadataLedger, PageMetadata};
pub use normalizer::{normalize_url, MirrorTarget};
pub use pipeline::{MirrorOutcome, MirrorReport, MirrorStage, PageMirror};
