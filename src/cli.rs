use clap::builder::RangedU64ValueParser;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{
    default_user_agent, MirrorConfig, DEFAULT_MAX_CONCURRENT, DEFAULT_OUTPUT_DIR, DEFAULT_TIMEOUT_SECS,
};

#[derive(Parser, Debug)]
#[command(
    name = "page-mirror",
    about = "A CLI utility to mirror web pages with their images, stylesheets and scripts",
    version,
    long_about = "Downloads a page's HTML and the resources it embeds into a local directory, rewrites the HTML to reference the local copies, and keeps per-page fetch statistics that can be queried later."
)]
pub struct MirrorCommand {
    #[command(subcommand)]
    pub mode: Option<Mode>,

    /// Root directory for page files, resource directories and the ledger
    #[arg(short, long, global = true, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// User agent string to use for requests
    #[arg(long, global = true)]
    pub user_agent: Option<String>,

    /// Timeout for each request in seconds
    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: u64,

    /// Maximum concurrent resource downloads per page
    #[arg(
        short = 'c',
        long,
        global = true,
        default_value_t = DEFAULT_MAX_CONCURRENT,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub max_concurrent: usize,

    /// Do not draw a progress bar while downloading resources
    #[arg(long, global = true)]
    pub no_progress: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Mirror each URL in order
    Mirror {
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Print stored statistics for each URL without fetching it
    #[command(long_flag = "metadata", short_flag = 'm')]
    Metadata {
        #[arg(required = true)]
        urls: Vec<String>,
    },
}

impl MirrorCommand {
    pub fn to_config(&self) -> MirrorConfig {
        MirrorConfig {
            output_dir: self.output_dir.clone(),
            user_agent: self.user_agent.clone().unwrap_or_else(default_user_agent),
            timeout: Duration::from_secs(self.timeout),
            max_concurrent: self.max_concurrent,
            show_progress: !self.no_progress && !self.quiet,
        }
    }
}
