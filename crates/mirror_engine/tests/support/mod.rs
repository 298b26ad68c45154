#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mirror_core::{Attachment, ContentNode, Course, NodeKind};
use mirror_engine::{
    FetchSettings, MirrorOrchestrator, MirrorSettings, RemoteError, RemoteTree, ReqwestTransport,
};

/// In-memory course outline served from a fixed table.
#[derive(Default)]
pub struct FakeRemote {
    pub origin: String,
    pub top_level: Vec<ContentNode>,
    pub children: HashMap<String, Vec<ContentNode>>,
    pub broken_listings: HashSet<String>,
    pub top_level_unavailable: bool,
}

impl FakeRemote {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            ..Self::default()
        }
    }

    pub fn top(mut self, node: ContentNode) -> Self {
        self.top_level.push(node);
        self
    }

    pub fn child(mut self, parent_id: &str, node: ContentNode) -> Self {
        self.children
            .entry(parent_id.to_string())
            .or_default()
            .push(node);
        self
    }

    pub fn broken_listing(mut self, node_id: &str) -> Self {
        self.broken_listings.insert(node_id.to_string());
        self
    }
}

#[async_trait::async_trait]
impl RemoteTree for FakeRemote {
    fn site_origin(&self) -> &str {
        &self.origin
    }

    async fn list_course_contents(&self, _course: &Course) -> Result<Vec<ContentNode>, RemoteError> {
        if self.top_level_unavailable {
            return Err(RemoteError::Unavailable("session expired".into()));
        }
        Ok(self.top_level.clone())
    }

    async fn list_children(
        &self,
        _course: &Course,
        node: &ContentNode,
    ) -> Result<Vec<ContentNode>, RemoteError> {
        if self.broken_listings.contains(&node.id) {
            return Err(RemoteError::Unavailable(format!("listing {} failed", node.id)));
        }
        Ok(self.children.get(&node.id).cloned().unwrap_or_default())
    }
}

pub fn course() -> Course {
    Course::new("_42_1", "Algo 101")
}

pub fn folder(id: &str, title: &str) -> ContentNode {
    ContentNode::new(id, title, NodeKind::Container).with_children(true)
}

pub fn document(id: &str, title: &str, body: &str) -> ContentNode {
    ContentNode::new(id, title, NodeKind::Document).with_body(body)
}

pub fn file_node(id: &str, title: &str, attachments: &[(&str, &str)]) -> ContentNode {
    ContentNode::new(id, title, NodeKind::File).with_attachments(
        attachments
            .iter()
            .map(|(id, name)| Attachment {
                id: id.to_string(),
                file_name: name.to_string(),
                mime_type: None,
            })
            .collect(),
    )
}

pub fn attachment_path(node_id: &str, attachment_id: &str) -> String {
    format!(
        "/learn/api/public/v1/courses/{}/contents/{}/attachments/{}/download",
        course().id,
        node_id,
        attachment_id
    )
}

pub fn orchestrator(remote: FakeRemote, settings: MirrorSettings) -> MirrorOrchestrator {
    mirror_logging::initialize_for_tests();
    let transport = ReqwestTransport::new(FetchSettings::default()).unwrap();
    MirrorOrchestrator::new(Arc::new(remote), Arc::new(transport), settings)
}

pub fn settings(root: &Path) -> MirrorSettings {
    MirrorSettings::default_with_output(root.to_path_buf())
}

/// Every file under `root`, keyed by its path relative to `root`.
pub fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    let mut files = BTreeMap::new();
    collect(root, root, &mut files);
    files
}

fn collect(root: &Path, dir: &Path, files: &mut BTreeMap<PathBuf, Vec<u8>>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries {
        let path = entry.unwrap().path();
        if path.is_dir() {
            collect(root, &path, files);
        } else {
            let relative = path.strip_prefix(root).unwrap().to_path_buf();
            files.insert(relative, fs::read(&path).unwrap());
        }
    }
}
