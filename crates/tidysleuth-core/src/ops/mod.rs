/// The three maintenance operations. Each one validates its root, walks the
/// direct children once, and returns a report of successes and per-file
/// failures.
pub mod classify;
pub mod snapshot;
pub mod sweep;

pub use classify::{
    classify, label_for, ClassificationPlan, ClassifyOptions, ClassifyReport, CollisionPolicy,
    ExtensionlessPolicy, FileMove,
};
pub use snapshot::{
    snapshot, snapshot_at, snapshot_label, SnapshotManifest, SnapshotOptions, SnapshotReport,
    SnapshotStatus,
};
pub use sweep::{sweep, sweep_at, RetentionThreshold, SweepOptions, SweepReport, SweptFile};
