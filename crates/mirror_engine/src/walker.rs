use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use futures_util::stream::{self, StreamExt};
use mirror_core::{
    build_standalone_document, sanitize, untitled_name, ContentNode, Course, MarkupRewriter,
    ResolvedResource, ResourceKind, ResourceLocator, ResourceReference, RewriteMode,
};
use mirror_logging::{mirror_debug, mirror_info, mirror_warn};
use tokio_util::sync::CancellationToken;

use crate::counters::{ArtifactKind, DownloadCounters};
use crate::persist::{ensure_output_dir, AtomicFileWriter, WriteOutcome};
use crate::remote::RemoteTree;
use crate::resource::{FetchResult, FetchStatus, ResourceFetcher};
use crate::settings::MirrorSettings;
use crate::MirrorError;

/// On-disk location assigned to a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorPath {
    /// A node with children gets a directory named after its title.
    Container { dir: PathBuf },
    /// A leaf writes straight into the directory handed down by its parent.
    /// `flattened` records that the parent had exactly one child.
    Leaf { dir: PathBuf, flattened: bool },
}

impl MirrorPath {
    pub fn assign(node: &ContentNode, output_dir: &Path, parent_had_single_child: bool) -> Self {
        if node.has_children {
            MirrorPath::Container {
                dir: output_dir.join(node_dir_name(node)),
            }
        } else {
            MirrorPath::Leaf {
                dir: output_dir.to_path_buf(),
                flattened: parent_had_single_child,
            }
        }
    }

    pub fn dir(&self) -> &Path {
        match self {
            MirrorPath::Container { dir } | MirrorPath::Leaf { dir, .. } => dir,
        }
    }

    /// A leaf whose parent has no other children.
    pub fn is_flattened(&self) -> bool {
        matches!(self, MirrorPath::Leaf { flattened: true, .. })
    }
}

fn node_dir_name(node: &ContentNode) -> String {
    non_empty_or_untitled(sanitize(&node.title), node)
}

fn non_empty_or_untitled(name: String, node: &ContentNode) -> String {
    if name.is_empty() {
        untitled_name(&node.id)
    } else {
        name
    }
}

/// Walks one course tree, writing every node's artifacts.
pub struct TreeWalker {
    pub(crate) course: Course,
    pub(crate) remote: Arc<dyn RemoteTree>,
    pub(crate) fetcher: ResourceFetcher,
    pub(crate) settings: MirrorSettings,
    pub(crate) counters: DownloadCounters,
    pub(crate) cancel: CancellationToken,
    pub(crate) stylesheet: Option<String>,
    pub(crate) locator: ResourceLocator,
}

impl TreeWalker {
    /// Visit sibling nodes that share `output_dir`, at most
    /// `node_concurrency` at a time.
    pub async fn visit_all(&self, nodes: &[ContentNode], output_dir: &Path, parent_title: Option<&str>) {
        let single = nodes.len() == 1;
        // Futures are built before streaming so the recursive future stays `Send`.
        let visits: Vec<BoxFuture<'_, ()>> = nodes
            .iter()
            .map(|node| self.visit(node, output_dir, single, parent_title))
            .collect();
        let mut visits = stream::iter(visits).buffer_unordered(self.settings.node_concurrency);
        while visits.next().await.is_some() {}
    }

    /// Mirror `node` and its subtree. Failures are logged and counted here;
    /// nothing propagates to the caller.
    pub fn visit<'a>(
        &'a self,
        node: &'a ContentNode,
        output_dir: &'a Path,
        parent_had_single_child: bool,
        parent_title: Option<&'a str>,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            if self.cancel.is_cancelled() {
                return;
            }

            let path = MirrorPath::assign(node, output_dir, parent_had_single_child);
            let display_name = self.display_name(node, parent_title);
            mirror_info!(
                "Visiting '{}' ({:?}) -> {}{}",
                display_name,
                node.kind,
                path.dir().display(),
                if path.is_flattened() { " (only child)" } else { "" }
            );

            // Listing happens before any artifact work so a failing listing
            // still leaves this node's own files in place.
            let children = if node.has_children {
                match self.remote.list_children(&self.course, node).await {
                    Ok(children) => Some(children),
                    Err(err) => {
                        mirror_warn!("Cannot list children of '{}': {}", node.title, err);
                        self.counters.record_failure();
                        None
                    }
                }
            } else {
                None
            };

            self.process_artifacts(node, &path, &display_name).await;

            if let Some(children) = children {
                self.visit_all(&children, path.dir(), Some(display_name.as_str()))
                    .await;
            }
        })
    }

    fn display_name(&self, node: &ContentNode, parent_title: Option<&str>) -> String {
        match parent_title {
            Some(parent) if self.settings.is_generic_title(&node.title) => parent.to_string(),
            _ => node.title.clone(),
        }
    }

    async fn process_artifacts(&self, node: &ContentNode, path: &MirrorPath, display_name: &str) {
        let attachments = match self.remote.list_attachments(&self.course, node).await {
            Ok(attachments) => attachments,
            Err(err) => {
                mirror_warn!("Cannot list attachments of '{}': {}", node.title, err);
                self.counters.record_failure();
                Vec::new()
            }
        };
        let body = match self.remote.fetch_body(&self.course, node).await {
            Ok(body) => body.filter(|body| !body.trim().is_empty()),
            Err(err) => {
                mirror_warn!("Cannot fetch body of '{}': {}", node.title, err);
                self.counters.record_failure();
                None
            }
        };

        let attachment_refs: Vec<ResourceReference> = attachments
            .iter()
            .map(|attachment| {
                ResourceReference::new(
                    self.remote.attachment_url(&self.course, node, attachment),
                    Some(attachment.file_name.clone()),
                    ResourceKind::Attachment,
                    attachment.mime_type.clone(),
                )
            })
            .collect();
        let pdf_refs = body
            .as_deref()
            .map(|body| self.locator.locate_pdfs(body))
            .unwrap_or_default();
        let capture = self.settings.capture_pages && node.kind.is_rich_text_document();
        let capture_body = body.as_deref().filter(|_| capture);

        if attachment_refs.is_empty() && pdf_refs.is_empty() && capture_body.is_none() {
            return;
        }

        let dir = path.dir();
        if let Err(err) = ensure_output_dir(dir) {
            mirror_warn!("Skipping artifacts of '{}': {}", node.title, err);
            self.counters.record_failure();
            return;
        }

        self.download_all(&attachment_refs, dir, ArtifactKind::ApiAttachment)
            .await;
        self.download_all(&pdf_refs, dir, ArtifactKind::EmbeddedPdf)
            .await;
        if let Some(body) = capture_body {
            let basename = non_empty_or_untitled(sanitize(display_name), node);
            self.capture_document(display_name, body, dir, &basename)
                .await;
        }
    }

    async fn download_all(&self, references: &[ResourceReference], dir: &Path, kind: ArtifactKind) {
        let jobs: Vec<BoxFuture<'_, (&ResourceReference, FetchResult)>> = references
            .iter()
            .map(|reference| {
                async move {
                    let result = self.fetcher.fetch(reference, dir).await;
                    (reference, result)
                }
                .boxed()
            })
            .collect();
        let mut jobs = stream::iter(jobs).buffer_unordered(self.settings.fetch_concurrency);
        while let Some((reference, result)) = jobs.next().await {
            self.record(kind, reference, &result);
        }
    }

    fn record(&self, kind: ArtifactKind, reference: &ResourceReference, result: &FetchResult) {
        match result {
            Ok(fetched) => match fetched.status {
                FetchStatus::Downloaded { bytes } => {
                    mirror_debug!("Saved {} ({} bytes)", fetched.path.display(), bytes);
                    self.counters.record_download(kind);
                }
                FetchStatus::AlreadyPresent => {
                    mirror_debug!("Already present: {}", fetched.path.display());
                    self.counters.record_already_present();
                }
            },
            Err(MirrorError::Cancelled) => {
                mirror_debug!("Cancelled before fetching {}", reference.url);
            }
            Err(err @ MirrorError::Resolution { .. }) => {
                mirror_debug!("Skipping reference: {}", err);
                self.counters.record_failure();
            }
            Err(err) => {
                mirror_warn!("Failed to fetch {}: {}", reference.url, err);
                self.counters.record_failure();
            }
        }
    }

    /// Write `<basename>.html` with its resources. An existing page is left
    /// alone and nothing is fetched for it.
    async fn capture_document(&self, title: &str, body: &str, dir: &Path, basename: &str) {
        let page_name = format!("{basename}.html");
        if dir.join(&page_name).exists() {
            mirror_debug!("Page already captured: {}", dir.join(&page_name).display());
            self.counters.record_already_present();
            return;
        }

        let references = self.locator.locate(body);
        let (resource_dir, mapping) = match self.settings.rewrite_mode {
            RewriteMode::LocalLinks => {
                let resource_dir = format!("{basename}_files");
                let mapping = self
                    .fetch_local_resources(references, &dir.join(&resource_dir))
                    .await;
                (resource_dir, mapping)
            }
            RewriteMode::InlineEmbed => (String::new(), self.fetch_inline_images(references).await),
        };

        if self.cancel.is_cancelled() {
            mirror_debug!("Cancelled; not writing {}", page_name);
            return;
        }

        let rewritten = MarkupRewriter::new(resource_dir).rewrite(body, &mapping);
        let document = build_standalone_document(title, &rewritten, self.stylesheet.as_deref());
        match AtomicFileWriter::new(dir.to_path_buf()).write_new(&page_name, document.as_bytes()) {
            Ok(WriteOutcome::Written(path)) => {
                mirror_debug!("Captured page {}", path.display());
                self.counters.record_download(ArtifactKind::HtmlPage);
            }
            Ok(WriteOutcome::AlreadyExists(_)) => self.counters.record_already_present(),
            Err(err) => {
                mirror_warn!("Cannot write page {}: {}", page_name, err);
                self.counters.record_failure();
            }
        }
    }

    /// References sharing a local file name form one group: members are
    /// tried in document order until one is stored, and the rest of the group
    /// then points at that file.
    async fn fetch_local_resources(
        &self,
        references: Vec<ResourceReference>,
        resource_dir: &Path,
    ) -> Vec<(ResourceReference, ResolvedResource)> {
        let groups: Vec<BoxFuture<'_, Vec<(ResourceReference, ResolvedResource)>>> =
            group_by_file_name(references)
                .into_iter()
                .map(|(file_name, members)| self.fetch_group(file_name, members, resource_dir).boxed())
                .collect();
        let resolved: Vec<Vec<(ResourceReference, ResolvedResource)>> = stream::iter(groups)
            .buffered(self.settings.fetch_concurrency)
            .collect()
            .await;
        resolved.into_iter().flatten().collect()
    }

    async fn fetch_group(
        &self,
        file_name: String,
        members: Vec<ResourceReference>,
        resource_dir: &Path,
    ) -> Vec<(ResourceReference, ResolvedResource)> {
        let mut mapping = Vec::with_capacity(members.len());
        let mut stored = false;
        for reference in members {
            if stored {
                mirror_debug!("{} shares local file {}", reference.url, file_name);
                self.counters.record_already_present();
                mapping.push((reference, local(&file_name)));
                continue;
            }
            let result = self.fetcher.fetch_as(&reference, &file_name, resource_dir).await;
            self.record(ArtifactKind::Resource, &reference, &result);
            if result.is_ok() {
                stored = true;
                mapping.push((reference, local(&file_name)));
            } else {
                mapping.push((reference, ResolvedResource::Unavailable));
            }
        }
        mapping
    }

    async fn fetch_inline_images(
        &self,
        references: Vec<ResourceReference>,
    ) -> Vec<(ResourceReference, ResolvedResource)> {
        let jobs: Vec<BoxFuture<'_, (ResourceReference, ResolvedResource)>> = references
            .into_iter()
            .filter(ResourceReference::is_image)
            .map(|reference| self.embed_image(reference).boxed())
            .collect();
        stream::iter(jobs)
            .buffered(self.settings.fetch_concurrency)
            .collect()
            .await
    }

    async fn embed_image(&self, reference: ResourceReference) -> (ResourceReference, ResolvedResource) {
        let resolved = match self.fetcher.fetch_bytes(&reference).await {
            Ok(output) => {
                self.counters.record_download(ArtifactKind::Resource);
                ResolvedResource::Inline {
                    bytes: output.bytes,
                    content_type: output.metadata.content_type,
                }
            }
            Err(MirrorError::Cancelled) => ResolvedResource::Unavailable,
            Err(err) => {
                mirror_warn!("Cannot embed {}: {}", reference.url, err);
                self.counters.record_failure();
                ResolvedResource::Unavailable
            }
        };
        (reference, resolved)
    }
}

fn local(file_name: &str) -> ResolvedResource {
    ResolvedResource::Local {
        file_name: file_name.to_string(),
    }
}

/// Group references by local file name, keeping first-seen order for both
/// groups and members.
fn group_by_file_name(references: Vec<ResourceReference>) -> Vec<(String, Vec<ResourceReference>)> {
    let mut groups: Vec<(String, Vec<ResourceReference>)> = Vec::new();
    for reference in references {
        let name = ResourceFetcher::local_file_name(&reference);
        match groups.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, members)) => members.push(reference),
            None => groups.push((name, vec![reference])),
        }
    }
    groups
}
