use mirror_core::{Attachment, ContentNode, Course};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("remote tree unavailable: {0}")]
    Unavailable(String),
    #[error("remote node not found: {0}")]
    NotFound(String),
}

/// The remote course outline. Session handling lives in the implementation.
#[async_trait::async_trait]
pub trait RemoteTree: Send + Sync {
    /// Origin that site-relative references are joined to, e.g.
    /// `https://school.example`.
    fn site_origin(&self) -> &str;

    /// Top-level entries of a course outline.
    async fn list_course_contents(&self, course: &Course) -> Result<Vec<ContentNode>, RemoteError>;

    /// Direct children of `node`; one remote call.
    async fn list_children(
        &self,
        course: &Course,
        node: &ContentNode,
    ) -> Result<Vec<ContentNode>, RemoteError>;

    async fn fetch_body(
        &self,
        _course: &Course,
        node: &ContentNode,
    ) -> Result<Option<String>, RemoteError> {
        Ok(node.body.clone())
    }

    async fn list_attachments(
        &self,
        _course: &Course,
        node: &ContentNode,
    ) -> Result<Vec<Attachment>, RemoteError> {
        Ok(node.attachments.clone().unwrap_or_default())
    }

    /// Site-relative download route of a first-class attachment.
    fn attachment_url(&self, course: &Course, node: &ContentNode, attachment: &Attachment) -> String {
        format!(
            "/learn/api/public/v1/courses/{}/contents/{}/attachments/{}/download",
            course.id, node.id, attachment.id
        )
    }
}
