use serde::Deserialize;

/// Classifier of a remote content node, decided once when the node is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Container,
    File,
    Document,
    Assignment,
    Other,
}

impl NodeKind {
    /// Map a remote content-handler id such as `resource/x-bb-document`.
    pub fn from_handler_id(handler_id: &str) -> Self {
        match handler_id.trim() {
            "resource/x-bb-folder" | "resource/x-bb-lesson" => NodeKind::Container,
            "resource/x-bb-file" => NodeKind::File,
            "resource/x-bb-document" => NodeKind::Document,
            "resource/x-bb-assignment" | "resource/x-bb-asmt-test-link" => NodeKind::Assignment,
            _ => NodeKind::Other,
        }
    }

    /// Whether captured pages should be produced for nodes of this kind.
    pub fn is_rich_text_document(self) -> bool {
        matches!(self, NodeKind::Document)
    }
}

/// First-class attachment of a content node.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Attachment {
    pub id: String,
    #[serde(rename = "fileName")]
    pub file_name: String,
    #[serde(rename = "mimeType", default)]
    pub mime_type: Option<String>,
}

/// Read-only view of one entry in the remote course outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentNode {
    pub id: String,
    pub title: String,
    pub has_children: bool,
    pub body: Option<String>,
    pub attachments: Option<Vec<Attachment>>,
    pub kind: NodeKind,
}

impl ContentNode {
    pub fn new(id: impl Into<String>, title: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            has_children: false,
            body: None,
            attachments: None,
            kind,
        }
    }

    pub fn with_children(mut self, has_children: bool) -> Self {
        self.has_children = has_children;
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = Some(attachments);
        self
    }
}

/// Root of a mirrored tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub id: String,
    pub name: String,
}

impl Course {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}
