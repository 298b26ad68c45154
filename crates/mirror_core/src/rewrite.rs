use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use scraper::{Html, Selector};
use serde::Deserialize;

use crate::document::escape_html;
use crate::reference::{AttachmentMeta, ResourceKind, ResourceReference};

const DEFAULT_IMAGE_MIME: &str = "image/png";
const IMAGE_STYLE: &str = "max-width: 100%; height: auto;";

/// Rewrite variant for captured documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum RewriteMode {
    /// Resources are stored next to the document and linked relatively.
    #[default]
    LocalLinks,
    /// Image bytes are embedded as base64 data URIs.
    InlineEmbed,
}

/// What a reference resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedResource {
    /// Stored as `<resource_dir>/<file_name>`.
    Local { file_name: String },
    /// Fetched bytes to embed.
    Inline {
        bytes: Vec<u8>,
        content_type: Option<String>,
    },
    /// Not available; the original URL stays in place.
    Unavailable,
}

/// Substitutes remote references in a body with their local counterparts.
pub struct MarkupRewriter {
    resource_dir: String,
}

impl MarkupRewriter {
    /// `resource_dir` is the relative directory local files live in, usually
    /// `<node-basename>_files`.
    pub fn new(resource_dir: impl Into<String>) -> Self {
        Self {
            resource_dir: resource_dir.into(),
        }
    }

    pub fn rewrite(&self, body: &str, mapping: &[(ResourceReference, ResolvedResource)]) -> String {
        let mut out = body.to_string();
        for (reference, resolved) in mapping {
            out = match resolved {
                ResolvedResource::Local { file_name } => {
                    let local = format!("{}/{}", self.resource_dir, href_segment(file_name));
                    let out = replace_markers(out, reference, &local);
                    let forms = url_forms(&reference.url);
                    replace_attr(out, &["href", "src"], &forms, &escape_html(&local))
                }
                ResolvedResource::Inline {
                    bytes,
                    content_type,
                } => {
                    let uri = data_uri(bytes, content_type.as_deref());
                    let out = replace_markers(out, reference, &uri);
                    replace_attr(out, &["src"], &url_forms(&reference.url), &uri)
                }
                ResolvedResource::Unavailable => out,
            };
        }
        out
    }
}

/// Replace every `<a …data-bbfile…>…</a>` wrapping an image attachment with
/// a plain `<img>` pointing at `src`.
fn replace_markers(mut body: String, reference: &ResourceReference, src: &str) -> String {
    if reference.kind != ResourceKind::Attachment || !reference.is_image() {
        return body;
    }
    let forms = url_forms(&reference.url);
    while let Some(span) = find_marker_span(&body, &forms) {
        let alt = marker_alt_text(&body[span.open.clone()])
            .unwrap_or_else(|| reference.file_name.clone());
        let img = format!(
            "<img src=\"{}\" alt=\"{}\" style=\"{}\">",
            escape_html(src),
            escape_html(&alt),
            IMAGE_STYLE
        );
        body.replace_range(span.whole, &img);
    }
    body
}

/// A stored file name as it appears in a relative link: `%` and `#` would
/// otherwise start an escape or a fragment.
fn href_segment(file_name: &str) -> String {
    file_name.replace('%', "%25").replace('#', "%23")
}

/// The URL as decoded by the parser plus its entity-escaped spelling.
fn url_forms(url: &str) -> Vec<String> {
    let mut forms = vec![url.to_string()];
    let escaped = url.replace('&', "&amp;");
    if escaped != url {
        forms.push(escaped);
    }
    forms
}

fn replace_attr(mut body: String, attrs: &[&str], forms: &[String], replacement: &str) -> String {
    for attr in attrs {
        for form in forms {
            for quote in ['"', '\''] {
                let needle = format!("{attr}={quote}{form}{quote}");
                if body.contains(&needle) {
                    body = body.replace(&needle, &format!("{attr}={quote}{replacement}{quote}"));
                }
            }
        }
    }
    body
}

fn data_uri(bytes: &[u8], content_type: Option<&str>) -> String {
    let mime = content_type
        .and_then(|ct| ct.split(';').next())
        .map(str::trim)
        .filter(|ct| !ct.is_empty())
        .unwrap_or(DEFAULT_IMAGE_MIME);
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

struct MarkerSpan {
    open: std::ops::Range<usize>,
    whole: std::ops::Range<usize>,
}

/// Locate `<a …href=URL… data-bbfile=…>…</a>` for one of the URL spellings.
fn find_marker_span(body: &str, forms: &[String]) -> Option<MarkerSpan> {
    let lower = body.to_ascii_lowercase();
    let mut from = 0;
    while let Some(rel) = lower[from..].find("<a") {
        let start = from + rel;
        from = start + 2;
        let next = lower[from..].chars().next();
        if !next.is_some_and(char::is_whitespace) {
            continue;
        }
        let Some(open_end) = open_tag_end(body, from) else {
            return None;
        };
        let open = &body[start..open_end];
        if !lower[start..open_end].contains("data-bbfile") || !has_href(open, forms) {
            continue;
        }
        let close = lower[open_end..].find("</a>")?;
        return Some(MarkerSpan {
            open: start..open_end,
            whole: start..open_end + close + "</a>".len(),
        });
    }
    None
}

/// Byte offset just past the `>` closing the tag, honouring quoted values.
fn open_tag_end(body: &str, from: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (offset, ch) in body[from..].char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(ch),
            (None, '>') => return Some(from + offset + 1),
            (None, _) => {}
        }
    }
    None
}

fn has_href(open_tag: &str, forms: &[String]) -> bool {
    forms.iter().any(|form| {
        open_tag.contains(&format!("href=\"{form}\"")) || open_tag.contains(&format!("href='{form}'"))
    })
}

fn marker_alt_text(open_tag: &str) -> Option<String> {
    let fragment = Html::parse_fragment(&format!("{open_tag}</a>"));
    let selector = Selector::parse("a[data-bbfile]").ok()?;
    let raw = fragment.select(&selector).next()?.value().attr("data-bbfile")?;
    let meta = AttachmentMeta::parse(raw).ok()?;
    meta.alt_text().map(str::to_string)
}
