/// TidySleuth Core — file-system maintenance operations.
///
/// This crate contains all business logic with zero UI dependencies.
/// Frontends (the bundled CLI, or any other host) build a typed request and
/// receive a report; nothing here prompts, prints or renders.
///
/// # Modules
///
/// - [`ops`] — Classifier, Retention Sweeper and Snapshotter.
/// - [`walk`] — Shared direct-children walk used by every operation.
/// - [`task`] — Request/outcome types, inline and background dispatch.
/// - [`model`] — Directory entry view and size formatting.
/// - [`config`] — JSON configuration with per-operation defaults.
/// - [`report`] — CSV export of outcomes.
/// - [`error`] — Whole-operation errors and per-file failures.
///
/// # Known limitation
///
/// No locking is performed. Two invocations targeting the same directory at
/// the same time race on moves and deletes; callers must ensure exclusive
/// access for the duration of a call.
pub mod config;
pub mod error;
pub mod model;
pub mod ops;
pub mod report;
pub mod task;
pub mod walk;

pub use config::TidyConfig;
pub use error::{FailureKind, ItemFailure, TidyError};
pub use task::progress::{TaskContext, TaskProgress};
pub use task::{run_task, start_task, TaskHandle, TaskOutcome, TaskRequest};
