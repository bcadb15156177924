/// Task dispatch — one typed request in, one report out.
///
/// A frontend builds a [`TaskRequest`] from whatever it collected from the
/// operator and either runs it inline with [`run_task`] or hands it to
/// [`start_task`], which runs it on a background thread and streams
/// [`TaskProgress`] messages back over a bounded channel.
pub mod progress;

use crate::error::{ItemFailure, TidyError};
use crate::ops::{
    classify, snapshot, sweep, ClassifyOptions, ClassifyReport, RetentionThreshold,
    SnapshotOptions, SnapshotReport, SweepOptions, SweepReport,
};
use progress::{TaskContext, TaskProgress};

use crossbeam_channel::Receiver;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::info;

/// Maximum number of progress messages that may queue up in the channel.
///
/// If the frontend stops draining, the worker blocks on `send` once this
/// many messages are pending instead of growing the queue without bound.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 1_024;

/// Everything needed to run one operation.
#[derive(Debug, Clone)]
pub enum TaskRequest {
    Classify {
        directory: PathBuf,
        options: ClassifyOptions,
    },
    Sweep {
        directory: PathBuf,
        threshold: RetentionThreshold,
        options: SweepOptions,
    },
    Snapshot {
        source: PathBuf,
        backup_root: PathBuf,
        options: SnapshotOptions,
    },
}

impl TaskRequest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Classify { .. } => "classify",
            Self::Sweep { .. } => "sweep",
            Self::Snapshot { .. } => "snapshot",
        }
    }

    /// The directory the operation works on.
    pub fn root(&self) -> &Path {
        match self {
            Self::Classify { directory, .. } | Self::Sweep { directory, .. } => directory,
            Self::Snapshot { source, .. } => source,
        }
    }
}

/// The report produced by whichever operation ran.
#[derive(Debug, Clone)]
pub enum TaskOutcome {
    Classified(ClassifyReport),
    Swept(SweepReport),
    Snapshotted(SnapshotReport),
}

impl TaskOutcome {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Classified(_) => "classify",
            Self::Swept(_) => "sweep",
            Self::Snapshotted(_) => "snapshot",
        }
    }

    /// Files moved, deleted (or flagged) or copied.
    pub fn succeeded(&self) -> usize {
        match self {
            Self::Classified(r) => r.moved_count(),
            Self::Swept(r) => r.deleted_count(),
            Self::Snapshotted(r) => r.copied.len(),
        }
    }

    pub fn failures(&self) -> &[ItemFailure] {
        match self {
            Self::Classified(r) => &r.failures,
            Self::Swept(r) => &r.failures,
            Self::Snapshotted(r) => &r.failures,
        }
    }

    pub fn cancelled(&self) -> bool {
        match self {
            Self::Classified(r) => r.cancelled,
            Self::Swept(r) => r.cancelled,
            Self::Snapshotted(r) => r.cancelled,
        }
    }

    /// Collapse to pass/fail: any per-file failure becomes
    /// [`TidyError::PartialFailure`] carrying the full failure list.
    pub fn into_result(self) -> Result<Self, TidyError> {
        if self.failures().is_empty() {
            return Ok(self);
        }
        let operation = self.name();
        let succeeded = self.succeeded();
        let failures = match self {
            Self::Classified(r) => r.failures,
            Self::Swept(r) => r.failures,
            Self::Snapshotted(r) => r.failures,
        };
        Err(TidyError::PartialFailure {
            operation,
            succeeded,
            failures,
        })
    }
}

/// Run `request` on the calling thread.
pub fn run_task(request: &TaskRequest, ctx: &TaskContext) -> Result<TaskOutcome, TidyError> {
    match request {
        TaskRequest::Classify { directory, options } => {
            classify(directory, options, ctx).map(TaskOutcome::Classified)
        }
        TaskRequest::Sweep {
            directory,
            threshold,
            options,
        } => sweep(directory, *threshold, options, ctx).map(TaskOutcome::Swept),
        TaskRequest::Snapshot {
            source,
            backup_root,
            options,
        } => snapshot(source, backup_root, options, ctx).map(TaskOutcome::Snapshotted),
    }
}

/// Handle to a task running on a background thread.
pub struct TaskHandle {
    /// Receiver for progress updates from the worker.
    pub progress_rx: Receiver<TaskProgress>,
    cancel_flag: Arc<AtomicBool>,
    thread: thread::JoinHandle<Result<TaskOutcome, TidyError>>,
}

impl TaskHandle {
    /// Ask the worker to stop before the next file.
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::Relaxed)
    }

    /// A clone of the cancel flag, e.g. for a signal handler.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel_flag.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the worker and take its result.
    pub fn join(self) -> Result<TaskOutcome, TidyError> {
        self.thread
            .join()
            .map_err(|_| TidyError::Worker("worker thread panicked".into()))?
    }
}

/// Start `request` on a new background thread.
///
/// The caller must keep draining `progress_rx` (or drop it) or the worker
/// stalls once [`PROGRESS_CHANNEL_CAPACITY`] messages are queued.
pub fn start_task(request: TaskRequest) -> Result<TaskHandle, TidyError> {
    let (progress_tx, progress_rx) =
        crossbeam_channel::bounded::<TaskProgress>(PROGRESS_CHANNEL_CAPACITY);
    let cancel_flag = Arc::new(AtomicBool::new(false));
    let ctx = TaskContext::new(cancel_flag.clone(), progress_tx);

    let thread = thread::Builder::new()
        .name(format!("tidysleuth-{}", request.name()))
        .spawn(move || {
            info!("Starting {} on {}", request.name(), request.root().display());
            run_task(&request, &ctx)
        })
        .map_err(|e| TidyError::Worker(format!("failed to spawn worker thread: {e}")))?;

    Ok(TaskHandle {
        progress_rx,
        cancel_flag,
        thread,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn request_names_match_outcomes() {
        let req = TaskRequest::Sweep {
            directory: PathBuf::from("/tmp"),
            threshold: RetentionThreshold::from_days(1),
            options: SweepOptions::default(),
        };
        assert_eq!(req.name(), "sweep");
        assert_eq!(req.root(), Path::new("/tmp"));
        assert_eq!(TaskOutcome::Swept(SweepReport::default()).name(), "sweep");
    }

    #[test]
    fn into_result_passes_clean_outcome() {
        let outcome = TaskOutcome::Classified(ClassifyReport::default());
        assert!(outcome.into_result().is_ok());
    }

    #[test]
    fn into_result_surfaces_partial_failure() {
        let report = SweepReport {
            failures: vec![ItemFailure::new("a.log", FailureKind::PermissionDenied, "denied")],
            ..SweepReport::default()
        };
        match TaskOutcome::Swept(report).into_result() {
            Err(TidyError::PartialFailure {
                operation,
                succeeded,
                failures,
            }) => {
                assert_eq!(operation, "sweep");
                assert_eq!(succeeded, 0);
                assert_eq!(failures.len(), 1);
            }
            other => panic!("expected PartialFailure, got {other:?}"),
        }
    }

    #[test]
    fn run_task_dispatches_classify() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), "a").unwrap();
        let req = TaskRequest::Classify {
            directory: tmp.path().to_path_buf(),
            options: ClassifyOptions::default(),
        };
        let outcome = run_task(&req, &TaskContext::default()).unwrap();
        assert_eq!(outcome.name(), "classify");
        assert_eq!(outcome.succeeded(), 1);
        assert!(tmp.path().join("txt/a.txt").is_file());
    }

    #[test]
    fn background_task_streams_progress_and_joins() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), "a").unwrap();
        fs::write(tmp.path().join("b.csv"), "b").unwrap();

        let handle = start_task(TaskRequest::Classify {
            directory: tmp.path().to_path_buf(),
            options: ClassifyOptions::default(),
        })
        .unwrap();

        let messages: Vec<TaskProgress> = handle.progress_rx.iter().collect();
        let outcome = handle.join().unwrap();

        assert_eq!(outcome.succeeded(), 2);
        assert!(matches!(messages.first(), Some(TaskProgress::Started { .. })));
        assert!(matches!(
            messages.last(),
            Some(TaskProgress::Complete { processed: 2, failed: 0, .. })
        ));
    }

    #[test]
    fn cancel_stops_background_task_between_files() {
        let tmp = TempDir::new().unwrap();
        let total = PROGRESS_CHANNEL_CAPACITY + 100;
        for i in 0..total {
            fs::write(tmp.path().join(format!("f{i:05}.txt")), "x").unwrap();
        }

        let handle = start_task(TaskRequest::Classify {
            directory: tmp.path().to_path_buf(),
            options: ClassifyOptions::default(),
        })
        .unwrap();

        // Nobody drains yet, so the worker parks once the channel is full.
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(30);
        while handle.progress_rx.len() < PROGRESS_CHANNEL_CAPACITY {
            assert!(std::time::Instant::now() < deadline, "channel never filled");
            thread::sleep(std::time::Duration::from_millis(5));
        }
        assert!(!handle.is_finished());
        assert!(!handle.is_cancelled());

        handle.cancel();
        assert!(handle.is_cancelled());
        assert!(handle.cancel_flag().load(Ordering::Relaxed));

        let messages: Vec<TaskProgress> = handle.progress_rx.iter().collect();
        let outcome = handle.join().unwrap();

        assert!(outcome.cancelled());
        assert!(outcome.succeeded() < total);
        assert!(matches!(messages.last(), Some(TaskProgress::Cancelled { .. })));
        // Unprocessed files are still at the top level.
        assert!(tmp.path().join(format!("f{:05}.txt", total - 1)).is_file());
    }

    #[test]
    fn background_task_reports_precondition_error() {
        let tmp = TempDir::new().unwrap();
        let handle = start_task(TaskRequest::Sweep {
            directory: tmp.path().join("missing"),
            threshold: RetentionThreshold::from_days(1),
            options: SweepOptions::default(),
        })
        .unwrap();
        assert!(matches!(handle.join(), Err(TidyError::NotFound(_))));
    }
}
