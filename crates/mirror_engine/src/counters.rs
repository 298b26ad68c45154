use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    ApiAttachment,
    EmbeddedPdf,
    HtmlPage,
    Resource,
}

/// Per-run tallies, shared by reference between concurrent node visits.
#[derive(Debug, Default)]
pub struct DownloadCounters {
    api_attachments: AtomicU64,
    embedded_pdfs: AtomicU64,
    html_pages: AtomicU64,
    resources: AtomicU64,
    already_present: AtomicU64,
    failures: AtomicU64,
}

impl DownloadCounters {
    pub fn record_download(&self, kind: ArtifactKind) {
        let counter = match kind {
            ArtifactKind::ApiAttachment => &self.api_attachments,
            ArtifactKind::EmbeddedPdf => &self.embedded_pdfs,
            ArtifactKind::HtmlPage => &self.html_pages,
            ArtifactKind::Resource => &self.resources,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_already_present(&self) {
        self.already_present.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            api_attachments: self.api_attachments.load(Ordering::Relaxed),
            embedded_pdfs: self.embedded_pdfs.load(Ordering::Relaxed),
            html_pages: self.html_pages.load(Ordering::Relaxed),
            resources: self.resources.load(Ordering::Relaxed),
            already_present: self.already_present.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub api_attachments: u64,
    pub embedded_pdfs: u64,
    pub html_pages: u64,
    pub resources: u64,
    pub already_present: u64,
    pub failures: u64,
}

impl CounterSnapshot {
    /// Files written at the node level; page resources are not included.
    pub fn total(&self) -> u64 {
        self.api_attachments + self.embedded_pdfs + self.html_pages
    }
}

#[cfg(test)]
mod tests {
    use super::{ArtifactKind, CounterSnapshot, DownloadCounters};

    #[test]
    fn snapshot_reflects_recorded_events() {
        let counters = DownloadCounters::default();
        counters.record_download(ArtifactKind::ApiAttachment);
        counters.record_download(ArtifactKind::HtmlPage);
        counters.record_download(ArtifactKind::Resource);
        counters.record_download(ArtifactKind::Resource);
        counters.record_already_present();
        counters.record_failure();

        let snapshot = counters.snapshot();
        assert_eq!(
            snapshot,
            CounterSnapshot {
                api_attachments: 1,
                embedded_pdfs: 0,
                html_pages: 1,
                resources: 2,
                already_present: 1,
                failures: 1,
            }
        );
        assert_eq!(snapshot.total(), 2);
    }
}
