use crate::{FetchError, PersistError, RemoteError};

/// Failure of one artifact. None of these abort a run.
#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("cannot resolve reference {url}")]
    Resolution { url: String },
    #[error("transport error: {0}")]
    Transport(#[from] FetchError),
    #[error("filesystem error: {0}")]
    Filesystem(#[from] PersistError),
    #[error("remote tree error: {0}")]
    Remote(#[from] RemoteError),
    #[error("cancelled")]
    Cancelled,
}
