use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_OUTPUT_DIR: &str = "./mirror";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_CONCURRENT: usize = 16;

pub fn default_user_agent() -> String {
    format!(
        "page-mirror/{} (+static page mirroring)",
        env!("CARGO_PKG_VERSION")
    )
}

/// Settings shared by every mirroring run in one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorConfig {
    /// Root holding the ledger file, page files and site directories.
    pub output_dir: PathBuf,
    pub user_agent: String,
    /// Applies to each page and resource request individually.
    pub timeout: Duration,
    /// Cap on in-flight resource fetches for one page.
    pub max_concurrent: usize,
    pub show_progress: bool,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            user_agent: default_user_agent(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            show_progress: true,
        }
    }
}

impl MirrorConfig {
    pub fn with_output_dir(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }
}
