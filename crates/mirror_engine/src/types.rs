use std::fmt;

/// Body and response details of one successful GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub bytes: Vec<u8>,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    /// URL as requested, after resolution against the site origin.
    pub original_url: String,
    /// URL after redirects.
    pub final_url: String,
    /// Declared `Content-Type`, used as the MIME type of embedded images.
    pub content_type: Option<String>,
    pub byte_len: u64,
}

/// Transport failure for one resource. Reported and counted, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} ({message})")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    /// Any status other than 200, including other 2xx codes.
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => f.write_str("unparsable url"),
            FailureKind::HttpStatus(code) => write!(f, "server answered {code}"),
            FailureKind::Timeout => f.write_str("request timed out"),
            FailureKind::RedirectLimitExceeded => f.write_str("too many redirects"),
            FailureKind::TooLarge {
                max_bytes,
                actual: Some(actual),
            } => write!(f, "body of {actual} bytes exceeds limit of {max_bytes}"),
            FailureKind::TooLarge { max_bytes, actual: None } => {
                write!(f, "body exceeds limit of {max_bytes} bytes")
            }
            FailureKind::Network => f.write_str("network error"),
        }
    }
}
