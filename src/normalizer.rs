use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use url::Url;

use crate::error::{MirrorError, Result};

/// Extension given to every mirrored page file.
pub const PAGE_EXTENSION: &str = "html";

fn http_url_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(?i:https?)://[^\s/?#]+[^\s]*$").ok())
        .as_ref()
}

/// Validates `raw` as an HTTP(S) URL and strips trailing slashes.
///
/// The returned string is the input itself (minus the trailing slashes), not
/// `Url`'s re-serialization, so `https://Example.com/` becomes
/// `https://Example.com` and stays stable across runs.
pub fn normalize_url(raw: &str) -> Result<String> {
    if raw.is_empty() {
        return Err(MirrorError::invalid_url(raw, "empty URL"));
    }
    if raw.chars().any(char::is_whitespace) {
        return Err(MirrorError::invalid_url(raw, "URL contains whitespace"));
    }
    if !http_url_pattern().is_some_and(|pattern| pattern.is_match(raw)) {
        return Err(MirrorError::invalid_url(raw, "not an http(s) URL"));
    }

    let parsed = Url::parse(raw).map_err(|e| MirrorError::invalid_url(raw, e.to_string()))?;
    match parsed.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(MirrorError::invalid_url(raw, "URL has no host")),
    }

    Ok(raw.trim_end_matches('/').to_string())
}

fn strip_scheme(url: &str) -> &str {
    url.split_once("://").map(|(_, rest)| rest).unwrap_or(url)
}

/// File name of the mirrored page: scheme dropped, `/ & ?` mapped to `_`.
pub fn page_filename(url: &str) -> String {
    let stem: String = strip_scheme(url)
        .chars()
        .map(|c| match c {
            '/' | '&' | '?' => '_',
            c => c,
        })
        .collect();
    format!("{}.{}", stem, PAGE_EXTENSION)
}

/// Name of the per-page directory holding downloaded resources.
pub fn site_dirname(url: &str) -> String {
    strip_scheme(url)
        .chars()
        .map(|c| match c {
            '/' | '&' | '?' | '.' | ':' | '=' | '$' => '_',
            c => c,
        })
        .collect()
}

/// Where one mirroring run writes its output. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorTarget {
    pub url: String,
    pub page_path: PathBuf,
    pub site_dir: PathBuf,
    /// `site_dir` relative to the directory holding the page file; this is
    /// the prefix the rewriter puts in front of local references.
    pub site_dir_name: String,
}

impl MirrorTarget {
    pub fn new(raw_url: &str, root: &Path) -> Result<Self> {
        let url = normalize_url(raw_url)?;
        let site_dir_name = site_dirname(&url);

        Ok(Self {
            page_path: root.join(page_filename(&url)),
            site_dir: root.join(&site_dir_name),
            site_dir_name,
            url,
        })
    }
}
