use std::path::PathBuf;
use std::sync::Arc;

use mirror_core::{sanitize, short_hash, Course, ResourceLocator};
use mirror_logging::{mirror_error, mirror_info, mirror_warn};
use tokio_util::sync::CancellationToken;

use crate::counters::{CounterSnapshot, DownloadCounters};
use crate::decode::load_stylesheets;
use crate::fetch::Transport;
use crate::remote::RemoteTree;
use crate::resource::ResourceFetcher;
use crate::settings::MirrorSettings;
use crate::walker::TreeWalker;
use crate::MirrorError;

/// Outcome of mirroring one course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorSummary {
    pub course_dir: PathBuf,
    pub counters: CounterSnapshot,
    /// The run was interrupted or hit its deadline; the tree may be partial.
    pub cancelled: bool,
}

pub struct MirrorOrchestrator {
    remote: Arc<dyn RemoteTree>,
    transport: Arc<dyn Transport>,
    settings: MirrorSettings,
}

impl MirrorOrchestrator {
    pub fn new(
        remote: Arc<dyn RemoteTree>,
        transport: Arc<dyn Transport>,
        settings: MirrorSettings,
    ) -> Self {
        Self {
            remote,
            transport,
            settings,
        }
    }

    pub fn settings(&self) -> &MirrorSettings {
        &self.settings
    }

    /// Mirror one course into `<output_root>/<course name>/`.
    ///
    /// Only a failure to list the course's top-level contents is returned as
    /// an error; everything below that is counted in the summary.
    pub async fn run_course(
        &self,
        course: &Course,
        cancel: &CancellationToken,
    ) -> Result<MirrorSummary, MirrorError> {
        let token = cancel.child_token();
        let deadline = self.settings.run_deadline.map(|limit| {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(limit).await;
                mirror_warn!("Run deadline of {:?} reached, stopping", limit);
                token.cancel();
            })
        });

        let course_dir = self.settings.output_root.join(course_dir_name(course));
        mirror_info!("Mirroring '{}' into {}", course.name, course_dir.display());

        let result = self.walk(course, &course_dir, token.clone()).await;
        if let Some(handle) = deadline {
            handle.abort();
        }

        let counters = result?;
        let summary = MirrorSummary {
            course_dir,
            counters,
            cancelled: token.is_cancelled(),
        };
        log_summary(course, &summary);
        Ok(summary)
    }

    async fn walk(
        &self,
        course: &Course,
        course_dir: &std::path::Path,
        token: CancellationToken,
    ) -> Result<CounterSnapshot, MirrorError> {
        let nodes = self
            .remote
            .list_course_contents(course)
            .await
            .inspect_err(|err| {
                mirror_error!("Cannot list contents of '{}': {}", course.name, err);
            })?;

        let walker = TreeWalker {
            course: course.clone(),
            remote: Arc::clone(&self.remote),
            fetcher: ResourceFetcher::new(
                Arc::clone(&self.transport),
                self.remote.site_origin(),
                self.settings.fetch_concurrency,
                token.clone(),
            ),
            settings: self.settings.clone(),
            counters: DownloadCounters::default(),
            cancel: token,
            stylesheet: load_stylesheets(&self.settings.stylesheets),
            locator: ResourceLocator::new(),
        };
        walker
            .visit_all(&nodes, course_dir, Some(course.name.as_str()))
            .await;
        Ok(walker.counters.snapshot())
    }

    /// Mirror courses one after another. A course whose listing fails does
    /// not stop the others; cancellation does.
    pub async fn run_courses(
        &self,
        courses: &[Course],
        cancel: &CancellationToken,
    ) -> Vec<Result<MirrorSummary, MirrorError>> {
        let mut results = Vec::with_capacity(courses.len());
        for course in courses {
            if cancel.is_cancelled() {
                mirror_warn!("Cancelled; skipping remaining courses");
                break;
            }
            results.push(self.run_course(course, cancel).await);
        }
        results
    }

    /// Like [`run_courses`](Self::run_courses), stopping new work on Ctrl-C.
    pub async fn run_until_interrupted(
        &self,
        courses: &[Course],
    ) -> Vec<Result<MirrorSummary, MirrorError>> {
        let cancel = CancellationToken::new();
        let listener = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    mirror_warn!("Interrupt received, finishing in-flight work");
                    cancel.cancel();
                }
            })
        };
        let results = self.run_courses(courses, &cancel).await;
        listener.abort();
        results
    }
}

fn course_dir_name(course: &Course) -> String {
    let name = sanitize(&course.name);
    if name.is_empty() {
        format!("course_{}", short_hash(&course.id))
    } else {
        name
    }
}

fn log_summary(course: &Course, summary: &MirrorSummary) {
    let counts = &summary.counters;
    mirror_info!(
        "Finished '{}'{}: {} attachments, {} embedded PDFs, {} pages, {} resources, {} already present, {} failures ({} files total)",
        course.name,
        if summary.cancelled { " (cancelled)" } else { "" },
        counts.api_attachments,
        counts.embedded_pdfs,
        counts.html_pages,
        counts.resources,
        counts.already_present,
        counts.failures,
        counts.total()
    );
}
