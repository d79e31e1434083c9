use select::document::Document;
use select::predicate::Name;
use std::collections::HashSet;
use std::path::Path;
use url::Url;

use crate::downloader::resource_local_path;
use crate::error::{MirrorError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Image,
    Stylesheet,
    Script,
}

/// Raw references and tag counts found in one HTML document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageScan {
    pub images: Vec<String>,
    pub stylesheets: Vec<String>,
    pub scripts: Vec<String>,
    /// Number of `<a>` tags, unfiltered.
    pub link_count: usize,
    /// Number of `<img>` tags, unfiltered.
    pub image_count: usize,
}

impl PageScan {
    /// All downloadable references in document order, grouped by kind.
    pub fn references(&self) -> impl Iterator<Item = (ResourceKind, &str)> {
        self.images
            .iter()
            .map(|r| (ResourceKind::Image, r.as_str()))
            .chain(self.stylesheets.iter().map(|r| (ResourceKind::Stylesheet, r.as_str())))
            .chain(self.scripts.iter().map(|r| (ResourceKind::Script, r.as_str())))
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.stylesheets.is_empty() && self.scripts.is_empty()
    }
}

/// A resource to mirror for the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceReference {
    /// Value as written in the HTML.
    pub raw: String,
    pub kind: ResourceKind,
    /// `raw` resolved against the page URL.
    pub url: Url,
    pub local_path: std::path::PathBuf,
}

/// Rejects empty references and anything containing `;`, `:` or `,`.
///
/// This also drops absolute URLs and `data:` URIs, which therefore stay
/// remote.
pub fn is_downloadable(reference: &str) -> bool {
    !reference.is_empty() && !reference.contains([';', ':', ','])
}

/// True when a `rel` value is exactly `stylesheet` (ASCII case and
/// surrounding whitespace ignored). `alternate stylesheet` does not count.
pub fn is_stylesheet_rel(rel: &str) -> bool {
    rel.trim().eq_ignore_ascii_case("stylesheet")
}

/// Extracts the resources a page embeds. Malformed markup is parsed best-effort.
pub fn scan_html(html_content: &str) -> PageScan {
    let document = Document::from(html_content);
    let mut scan = PageScan::default();

    for img in document.find(Name("img")) {
        scan.image_count += 1;
        if let Some(src) = img.attr("src").filter(|s| is_downloadable(s)) {
            scan.images.push(src.to_string());
        }
    }

    for link in document.find(Name("link")) {
        if !link.attr("rel").is_some_and(is_stylesheet_rel) {
            continue;
        }
        if let Some(href) = link.attr("href").filter(|s| is_downloadable(s)) {
            scan.stylesheets.push(href.to_string());
        }
    }

    // Inline scripts have no src and are skipped.
    for script in document.find(Name("script")) {
        if let Some(src) = script.attr("src").filter(|s| is_downloadable(s)) {
            scan.scripts.push(src.to_string());
        }
    }

    scan.link_count = document.find(Name("a")).count();
    scan
}

/// Resolves scanned references against the URL of the page they came from.
#[derive(Debug, Clone)]
pub struct HtmlParser {
    base_url: Url,
}

impl HtmlParser {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| MirrorError::invalid_url(base_url, e.to_string()))?;

        Ok(Self { base_url })
    }

    pub fn resolve_url(&self, reference: &str) -> Result<Url> {
        if reference.starts_with("//") {
            // Protocol-relative URL
            let with_scheme = format!("{}:{}", self.base_url.scheme(), reference);
            return Url::parse(&with_scheme).map_err(|e| MirrorError::resource(reference, e));
        }
        self.base_url
            .join(reference)
            .map_err(|e| MirrorError::resource(reference, e))
    }

    /// Builds one reference per distinct local destination under `dest_dir`.
    ///
    /// References that cannot be resolved, or that would not map to a file,
    /// are logged and skipped.
    pub fn resource_references(&self, scan: &PageScan, dest_dir: &Path) -> Vec<ResourceReference> {
        let mut seen = HashSet::new();
        let mut references = Vec::new();

        for (kind, raw) in scan.references() {
            let resolved = self
                .resolve_url(raw)
                .and_then(|url| resource_local_path(&url, dest_dir).map(|path| (url, path)));

            match resolved {
                Ok((url, local_path)) => {
                    if seen.insert(local_path.clone()) {
                        references.push(ResourceReference {
                            raw: raw.to_string(),
                            kind,
                            url,
                            local_path,
                        });
                    }
                }
                Err(e) => tracing::warn!(reference = raw, error = %e, "skipping resource"),
            }
        }

        references
    }
}
