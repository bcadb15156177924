/// TidySleuth CLI — command-line frontend for the core operations.
///
/// Collects a directory, retention age, or source/backup pair from the
/// command line, runs the matching task and reports the outcome.
pub mod app;
pub mod args;
pub mod interrupt;

pub use app::{run, RunStatus};
pub use args::{Cli, Command};
