//! Mirror core: pure content model, reference extraction and markup rewriting.
mod document;
mod filename;
mod locate;
mod node;
mod reference;
mod rewrite;

pub use document::{build_standalone_document, escape_html};
pub use filename::{
    last_path_segment, sanitize, short_hash, synthesized_name, untitled_name, ILLEGAL_CHARS,
};
pub use locate::ResourceLocator;
pub use node::{Attachment, ContentNode, Course, NodeKind};
pub use reference::{AttachmentMeta, ResourceKind, ResourceReference};
pub use rewrite::{MarkupRewriter, ResolvedResource, RewriteMode};
