use lol_html::{element, rewrite_str, RewriteStrSettings};

use crate::error::{MirrorError, Result};
use crate::html_parser::is_stylesheet_rel;

/// `site_dir` and `reference` joined with exactly one `/`.
///
/// `.` and `..` segments of the reference are resolved the way URL
/// resolution does it, and `..` never climbs above `site_dir`, so the result
/// matches where the downloader stores a resource referenced from the
/// site root.
pub fn join_site_path(site_dir: &str, reference: &str) -> String {
    let (path, suffix) = match reference.find(['?', '#']) {
        Some(index) => reference.split_at(index),
        None => (reference, ""),
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }

    let dir = site_dir.trim_end_matches('/');
    let relative = segments.join("/");
    if dir.is_empty() {
        format!("{}{}", relative, suffix)
    } else {
        format!("{}/{}{}", dir, relative, suffix)
    }
}

/// The local form of `value`, or `None` when it must stay as written.
fn localized(value: &str, site_dir: &str) -> Option<String> {
    if value.is_empty() || value.starts_with("http") {
        return None;
    }
    let prefix = format!("{}/", site_dir.trim_end_matches('/'));
    if value.starts_with(&prefix) {
        return None;
    }
    Some(join_site_path(site_dir, value))
}

/// Points image, stylesheet and script references at the local mirror.
///
/// The document is tokenized, so references inside comments, inline script
/// text or `<textarea>` are not touched, and a `>` inside a quoted attribute
/// does not end the tag. Values starting with `http` are left as written, and
/// tags without a rewritten attribute are emitted byte-for-byte. Values
/// already under `site_dir` are left alone, so re-running with the same
/// directory is a no-op.
pub fn rewrite_html(html_content: &str, site_dir: &str) -> Result<String> {
    rewrite_str(
        html_content,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("img[src]", |el| {
                    if let Some(local) = el.get_attribute("src").and_then(|v| localized(&v, site_dir)) {
                        el.set_attribute("src", &local)?;
                    }
                    Ok(())
                }),
                element!("script[src]", |el| {
                    if let Some(local) = el.get_attribute("src").and_then(|v| localized(&v, site_dir)) {
                        el.set_attribute("src", &local)?;
                    }
                    Ok(())
                }),
                element!("link[href]", |el| {
                    if !el.get_attribute("rel").is_some_and(|rel| is_stylesheet_rel(&rel)) {
                        return Ok(());
                    }
                    if let Some(local) = el.get_attribute("href").and_then(|v| localized(&v, site_dir)) {
                        el.set_attribute("href", &local)?;
                    }
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| MirrorError::Rewrite(e.to_string()))
}
