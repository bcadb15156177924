/// Task progress reporting — lightweight messages sent from a running
/// operation to whoever started it, plus the cooperative cancel flag.
use crossbeam_channel::Sender;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Progress updates sent from the worker to the frontend.
#[derive(Debug, Clone)]
pub enum TaskProgress {
    /// The root path passed validation and the walk is starting.
    Started { operation: &'static str, root: PathBuf },
    /// One file was handled (moved, deleted, flagged or copied).
    Item { path: PathBuf, processed: usize },
    /// A non-fatal per-file error.
    Failed { path: PathBuf, message: String },
    /// The walk reached the end of the directory.
    Complete {
        duration: Duration,
        processed: usize,
        failed: usize,
    },
    /// The cancel flag was observed between files.
    Cancelled { processed: usize },
}

/// Per-invocation plumbing handed to every operation.
///
/// Both halves are optional: a bare `TaskContext::default()` runs the
/// operation to completion with no reporting.
#[derive(Debug, Clone, Default)]
pub struct TaskContext {
    cancel_flag: Option<Arc<AtomicBool>>,
    progress_tx: Option<Sender<TaskProgress>>,
}

impl TaskContext {
    pub fn new(cancel_flag: Arc<AtomicBool>, progress_tx: Sender<TaskProgress>) -> Self {
        Self {
            cancel_flag: Some(cancel_flag),
            progress_tx: Some(progress_tx),
        }
    }

    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    pub fn with_progress(mut self, tx: Sender<TaskProgress>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    /// Checked between per-file steps; never interrupts a single move/copy.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::Relaxed))
    }

    /// Send a progress message. A dropped receiver is not an error: the
    /// operation keeps going even if nobody is listening any more.
    pub fn report(&self, msg: TaskProgress) {
        if let Some(tx) = &self.progress_tx {
            let _ = tx.send(msg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_context_is_never_cancelled() {
        let ctx = TaskContext::default();
        assert!(!ctx.is_cancelled());
        // Reporting without a channel is a no-op.
        ctx.report(TaskProgress::Cancelled { processed: 0 });
    }

    #[test]
    fn cancel_flag_is_observed() {
        let flag = Arc::new(AtomicBool::new(false));
        let ctx = TaskContext::default().with_cancel_flag(flag.clone());
        assert!(!ctx.is_cancelled());
        flag.store(true, Ordering::Relaxed);
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn progress_reaches_receiver() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let ctx = TaskContext::default().with_progress(tx);
        ctx.report(TaskProgress::Item {
            path: PathBuf::from("a.txt"),
            processed: 1,
        });
        assert!(matches!(rx.try_recv(), Ok(TaskProgress::Item { processed: 1, .. })));
    }

    #[test]
    fn dropped_receiver_does_not_panic() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        drop(rx);
        let ctx = TaskContext::default().with_progress(tx);
        ctx.report(TaskProgress::Cancelled { processed: 0 });
    }
}
