use std::collections::HashSet;

use mirror_logging::mirror_debug;
use scraper::{ElementRef, Html, Selector};

use crate::filename::last_path_segment;
use crate::reference::{AttachmentMeta, ResourceKind, ResourceReference};

const DEFAULT_MAX_REFERENCES: usize = 5_000;

const OFFICE_EXTENSIONS: [&str; 6] = ["doc", "docx", "xls", "xlsx", "ppt", "pptx"];

/// Extracts resource references from rich-text bodies.
///
/// Rules run in precedence order and a URL found by an earlier rule is never
/// reported again:
/// 1. links carrying a structured attachment marker (`data-bbfile`)
/// 2. hyperlinks to PDFs
/// 3. image sources, except inline `data:` URIs
/// 4. hyperlinks to office documents
pub struct ResourceLocator {
    max_references: usize,
}

impl ResourceLocator {
    pub fn new() -> Self {
        Self::with_max_references(DEFAULT_MAX_REFERENCES)
    }

    pub fn with_max_references(max_references: usize) -> Self {
        Self { max_references }
    }

    /// All resource references in `body`. Malformed markup yields fewer
    /// references, never an error.
    pub fn locate(&self, body: &str) -> Vec<ResourceReference> {
        let fragment = Html::parse_fragment(body);
        let mut found = Found::new(self.max_references);

        for element in select(&fragment, "a[href][data-bbfile]") {
            if let Some(reference) = attachment_marker(element) {
                found.push(reference);
            }
        }
        for element in select(&fragment, "a[href]") {
            if let Some(url) = usable_url(element.value().attr("href")) {
                if has_extension(url, &["pdf"]) {
                    found.push(ResourceReference::new(url, None, ResourceKind::Document, None));
                }
            }
        }
        for element in select(&fragment, "img[src]") {
            if let Some(url) = usable_url(element.value().attr("src")) {
                if !url.to_ascii_lowercase().starts_with("data:") {
                    found.push(ResourceReference::new(url, None, ResourceKind::Image, None));
                }
            }
        }
        for element in select(&fragment, "a[href]") {
            if let Some(url) = usable_url(element.value().attr("href")) {
                if has_extension(url, &OFFICE_EXTENSIONS) {
                    found.push(ResourceReference::new(url, None, ResourceKind::Document, None));
                }
            }
        }

        found.refs
    }

    /// The embedded-PDF shortcut: attachment markers declaring a PDF plus
    /// plain PDF hyperlinks.
    pub fn locate_pdfs(&self, body: &str) -> Vec<ResourceReference> {
        self.locate(body)
            .into_iter()
            .filter(|reference| match reference.kind {
                ResourceKind::Attachment | ResourceKind::Document => reference.is_pdf(),
                ResourceKind::Image => false,
            })
            .collect()
    }
}

impl Default for ResourceLocator {
    fn default() -> Self {
        Self::new()
    }
}

fn select<'a>(fragment: &'a Html, selector: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(selector) {
        Ok(sel) => fragment.select(&sel).collect(),
        Err(_) => Vec::new(),
    }
}

fn attachment_marker(element: ElementRef<'_>) -> Option<ResourceReference> {
    let url = usable_url(element.value().attr("href"))?;
    let raw = element.value().attr("data-bbfile")?;
    match AttachmentMeta::parse(raw) {
        Ok(meta) => Some(ResourceReference::new(
            url,
            meta.declared_name(),
            ResourceKind::Attachment,
            meta.mime_type.clone().filter(|m| !m.trim().is_empty()),
        )),
        Err(err) => {
            mirror_debug!("Skipping malformed attachment marker for {}: {}", url, err);
            None
        }
    }
}

fn usable_url(raw: Option<&str>) -> Option<&str> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with('#') || lower.starts_with("javascript:") || lower.starts_with("mailto:") {
        return None;
    }
    Some(trimmed)
}

fn has_extension(url: &str, extensions: &[&str]) -> bool {
    let segment = last_path_segment(url);
    match segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => extensions
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(ext)),
        _ => false,
    }
}

struct Found {
    refs: Vec<ResourceReference>,
    seen: HashSet<String>,
    max: usize,
}

impl Found {
    fn new(max: usize) -> Self {
        Self {
            refs: Vec::new(),
            seen: HashSet::new(),
            max,
        }
    }

    fn push(&mut self, reference: ResourceReference) {
        if self.refs.len() >= self.max {
            return;
        }
        if self.seen.insert(reference.url.clone()) {
            self.refs.push(reference);
        }
    }
}
