use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use mirror_core::{sanitize, synthesized_name, ResourceReference};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::fetch::Transport;
use crate::persist::{AtomicFileWriter, WriteOutcome};
use crate::{FetchOutput, MirrorError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    Downloaded { bytes: u64 },
    /// A file with the target name existed; nothing was fetched.
    AlreadyPresent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResource {
    /// Sanitized file name, relative to the target directory.
    pub file_name: String,
    pub path: PathBuf,
    pub status: FetchStatus,
}

pub type FetchResult = Result<FetchedResource, MirrorError>;

type PathMutex = Arc<tokio::sync::Mutex<()>>;

/// One async mutex per target path, so a path is checked, fetched and
/// written by a single worker at a time. Entries live only while a lease on
/// the path is held.
#[derive(Debug, Default)]
pub struct PathLocks {
    inner: Mutex<HashMap<PathBuf, PathMutex>>,
}

impl PathLocks {
    pub fn lease(&self, path: &Path) -> PathLease<'_> {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let mutex = map.entry(path.to_path_buf()).or_default().clone();
        PathLease {
            locks: self,
            path: path.to_path_buf(),
            mutex,
        }
    }

    fn release(&self, path: &Path, mutex: &PathMutex) {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        // The map and this lease hold the only two handles.
        if Arc::strong_count(mutex) == 2 {
            map.remove(path);
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Claim on one path's mutex; dropping it forgets the path once nobody else
/// holds or awaits it.
pub struct PathLease<'a> {
    locks: &'a PathLocks,
    path: PathBuf,
    mutex: PathMutex,
}

impl PathLease<'_> {
    pub async fn lock(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.mutex.lock().await
    }
}

impl Drop for PathLease<'_> {
    fn drop(&mut self) {
        self.locks.release(&self.path, &self.mutex);
    }
}

/// Resolves references and downloads each target path at most once.
pub struct ResourceFetcher {
    transport: Arc<dyn Transport>,
    origin: Option<Url>,
    locks: PathLocks,
    permits: Semaphore,
    cancel: CancellationToken,
}

impl ResourceFetcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        site_origin: &str,
        max_concurrent_requests: usize,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            transport,
            origin: Url::parse(site_origin).ok(),
            locks: PathLocks::default(),
            permits: Semaphore::new(max_concurrent_requests.max(1)),
            cancel,
        }
    }

    /// Local file name a reference is stored under. Never empty.
    pub fn local_file_name(reference: &ResourceReference) -> String {
        let name = sanitize(&reference.file_name);
        if name.is_empty() {
            synthesized_name(&reference.url, reference.mime_type.as_deref())
        } else {
            name
        }
    }

    /// Site-relative references are joined to the origin; only absolute
    /// http(s) URLs are accepted otherwise.
    pub fn resolve(&self, raw: &str) -> Result<Url, MirrorError> {
        if raw.starts_with('/') {
            return self
                .origin
                .as_ref()
                .and_then(|origin| origin.join(raw).ok())
                .ok_or_else(|| resolution_error(raw));
        }
        match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url),
            _ => Err(resolution_error(raw)),
        }
    }

    pub async fn fetch(&self, reference: &ResourceReference, target_dir: &Path) -> FetchResult {
        let file_name = Self::local_file_name(reference);
        self.fetch_as(reference, &file_name, target_dir).await
    }

    /// Store `reference` as `target_dir/file_name` unless that file exists.
    pub async fn fetch_as(
        &self,
        reference: &ResourceReference,
        file_name: &str,
        target_dir: &Path,
    ) -> FetchResult {
        let url = self.resolve(&reference.url)?;
        let target = target_dir.join(file_name);

        let lease = self.locks.lease(&target);
        let _guard = lease.lock().await;

        if target.exists() {
            return Ok(FetchedResource {
                file_name: file_name.to_string(),
                path: target,
                status: FetchStatus::AlreadyPresent,
            });
        }

        let output = self.download(&url).await?;
        let writer = AtomicFileWriter::new(target_dir.to_path_buf());
        let status = match writer.write_new(file_name, &output.bytes)? {
            WriteOutcome::Written(_) => FetchStatus::Downloaded {
                bytes: output.metadata.byte_len,
            },
            WriteOutcome::AlreadyExists(_) => FetchStatus::AlreadyPresent,
        };
        Ok(FetchedResource {
            file_name: file_name.to_string(),
            path: target,
            status,
        })
    }

    /// Fetch bytes without touching the filesystem.
    pub async fn fetch_bytes(&self, reference: &ResourceReference) -> Result<FetchOutput, MirrorError> {
        let url = self.resolve(&reference.url)?;
        self.download(&url).await
    }

    async fn download(&self, url: &Url) -> Result<FetchOutput, MirrorError> {
        if self.cancel.is_cancelled() {
            return Err(MirrorError::Cancelled);
        }
        let permit = tokio::select! {
            _ = self.cancel.cancelled() => None,
            permit = self.permits.acquire() => permit.ok(),
        };
        let Some(_permit) = permit else {
            return Err(MirrorError::Cancelled);
        };
        tokio::select! {
            _ = self.cancel.cancelled() => Err(MirrorError::Cancelled),
            result = self.transport.fetch(url.as_str()) => result.map_err(MirrorError::from),
        }
    }
}

fn resolution_error(raw: &str) -> MirrorError {
    MirrorError::Resolution {
        url: raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use mirror_core::{ResourceKind, ResourceReference};
    use tokio_util::sync::CancellationToken;

    use super::{PathLocks, ResourceFetcher};
    use crate::{FetchError, FetchMetadata, FetchOutput, MirrorError, Transport};

    struct Unreachable;

    #[async_trait::async_trait]
    impl Transport for Unreachable {
        async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError> {
            panic!("unexpected fetch of {url}");
        }
    }

    struct Fixed(&'static [u8]);

    #[async_trait::async_trait]
    impl Transport for Fixed {
        async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError> {
            Ok(FetchOutput {
                bytes: self.0.to_vec(),
                metadata: FetchMetadata {
                    original_url: url.to_string(),
                    final_url: url.to_string(),
                    content_type: None,
                    byte_len: self.0.len() as u64,
                },
            })
        }
    }

    fn fetcher() -> ResourceFetcher {
        ResourceFetcher::new(
            Arc::new(Unreachable),
            "https://school.example",
            2,
            CancellationToken::new(),
        )
    }

    #[test]
    fn site_relative_urls_join_the_origin() {
        let url = fetcher().resolve("/bbcswebdav/x.pdf").unwrap();
        assert_eq!(url.as_str(), "https://school.example/bbcswebdav/x.pdf");
    }

    #[test]
    fn relative_and_foreign_schemes_are_unresolvable() {
        for raw in ["images/a.png", "ftp://h/a.png", "data:image/png;base64,AA"] {
            assert!(matches!(
                fetcher().resolve(raw),
                Err(MirrorError::Resolution { .. })
            ));
        }
    }

    #[test]
    fn empty_sanitized_name_is_synthesized() {
        let reference = ResourceReference::new(
            "https://h/a",
            Some("???".into()),
            ResourceKind::Attachment,
            Some("application/pdf".into()),
        );
        let name = ResourceFetcher::local_file_name(&reference);
        assert!(name.starts_with("resource_"));
        assert!(name.ends_with(".pdf"));
    }

    #[test]
    fn same_path_shares_one_lock() {
        let locks = PathLocks::default();
        let a = locks.lease(Path::new("/tmp/x"));
        let b = locks.lease(Path::new("/tmp/x"));
        let c = locks.lease(Path::new("/tmp/y"));
        assert!(Arc::ptr_eq(&a.mutex, &b.mutex));
        assert!(!Arc::ptr_eq(&a.mutex, &c.mutex));
    }

    #[test]
    fn released_paths_are_forgotten() {
        let locks = PathLocks::default();
        let a = locks.lease(Path::new("/tmp/x"));
        let b = locks.lease(Path::new("/tmp/x"));
        assert_eq!(locks.tracked(), 1);

        drop(a);
        assert_eq!(locks.tracked(), 1);
        drop(b);
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn fetcher_forgets_paths_after_storing() {
        let temp = tempfile::TempDir::new().unwrap();
        let fetcher = ResourceFetcher::new(
            Arc::new(Fixed(b"data")),
            "https://school.example",
            2,
            CancellationToken::new(),
        );
        let reference = ResourceReference::new("/a.png", None, ResourceKind::Image, None);

        fetcher.fetch(&reference, temp.path()).await.unwrap();
        fetcher.fetch(&reference, temp.path()).await.unwrap();
        assert_eq!(fetcher.locks.tracked(), 0);
    }
}
