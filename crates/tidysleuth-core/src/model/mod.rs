/// Data model shared by the three operations.
///
/// Re-exports the per-entry view of a directory child and the size
/// formatting helpers used in summaries.
pub mod entry;
pub mod size;

pub use entry::DirectoryEntry;
