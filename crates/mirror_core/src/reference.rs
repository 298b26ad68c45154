use serde::Deserialize;

use crate::filename::{last_path_segment, synthesized_name};

/// How a resource reference was discovered in a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Link carrying a structured attachment marker.
    Attachment,
    /// `<img src>`.
    Image,
    /// Hyperlink to a PDF or office document.
    Document,
}

/// One remote resource referenced from a rich-text body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceReference {
    /// Remote URL exactly as written in the body, entities decoded.
    pub url: String,
    /// Declared filename, or one derived from the URL when none was declared.
    pub file_name: String,
    pub kind: ResourceKind,
    pub mime_type: Option<String>,
}

impl ResourceReference {
    pub fn new(
        url: impl Into<String>,
        declared_name: Option<String>,
        kind: ResourceKind,
        mime_type: Option<String>,
    ) -> Self {
        let url = url.into();
        let file_name = declared_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| derive_file_name(&url, mime_type.as_deref()));
        Self {
            url,
            file_name,
            kind,
            mime_type,
        }
    }

    pub fn is_image(&self) -> bool {
        match self.kind {
            ResourceKind::Image => true,
            ResourceKind::Attachment => self
                .mime_type
                .as_deref()
                .is_some_and(|mime| mime.trim().to_ascii_lowercase().starts_with("image/")),
            ResourceKind::Document => false,
        }
    }

    pub fn is_pdf(&self) -> bool {
        !self.is_image() && self.file_name.to_ascii_lowercase().ends_with(".pdf")
    }
}

fn derive_file_name(url: &str, mime_hint: Option<&str>) -> String {
    let segment = last_path_segment(url);
    if segment.is_empty() {
        synthesized_name(url, mime_hint)
    } else {
        segment.to_string()
    }
}

/// Structured metadata carried by an attachment marker (`data-bbfile`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentMeta {
    pub file_name: Option<String>,
    pub link_name: Option<String>,
    pub display_name: Option<String>,
    pub mime_type: Option<String>,
    pub alternative_text: Option<String>,
}

impl AttachmentMeta {
    /// Parse the decoded attribute payload.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn declared_name(&self) -> Option<String> {
        [&self.file_name, &self.link_name, &self.display_name]
            .into_iter()
            .flatten()
            .find(|name| !name.trim().is_empty())
            .cloned()
    }

    pub fn alt_text(&self) -> Option<&str> {
        [&self.alternative_text, &self.display_name]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|text| !text.trim().is_empty())
    }
}
