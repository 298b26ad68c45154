//! Mirror engine: network, filesystem and traversal around `mirror_core`.
mod counters;
mod decode;
mod error;
mod fetch;
mod mirror;
mod persist;
mod remote;
mod resource;
mod settings;
mod types;
mod walker;

pub use counters::{ArtifactKind, CounterSnapshot, DownloadCounters};
pub use decode::{decode_text, decode_text_lossy, load_stylesheets, DecodeError, DecodedText};
pub use error::MirrorError;
pub use fetch::{FetchSettings, ReqwestTransport, Transport};
pub use mirror::{MirrorOrchestrator, MirrorSummary};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError, WriteOutcome};
pub use remote::{RemoteError, RemoteTree};
pub use resource::{
    FetchResult, FetchStatus, FetchedResource, PathLease, PathLocks, ResourceFetcher,
};
pub use settings::{ConfigError, MirrorSettings};
pub use types::{FailureKind, FetchError, FetchMetadata, FetchOutput};
pub use walker::{MirrorPath, TreeWalker};
