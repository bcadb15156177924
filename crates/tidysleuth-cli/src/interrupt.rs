/// Ctrl-C handling: the first interrupt asks the running task to stop after
/// the current file, a second one (or one with no task running) exits.
///
/// `ctrlc` allows a single process-wide handler, so it is installed once and
/// reads whichever cancel flag is currently registered.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once, PoisonError};
use tracing::warn;

/// Exit status used when an interrupt ends the process outright.
pub const INTERRUPTED_EXIT_CODE: u8 = 130;

static ACTIVE: Mutex<Option<Arc<AtomicBool>>> = Mutex::new(None);
static INSTALL: Once = Once::new();

/// Keeps `flag` registered with the interrupt handler until dropped.
#[must_use = "the flag is unregistered as soon as the guard is dropped"]
pub struct InterruptGuard {
    _private: (),
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        *ACTIVE.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Route Ctrl-C to `flag` for as long as the returned guard lives.
pub fn forward_to(flag: Arc<AtomicBool>) -> InterruptGuard {
    INSTALL.call_once(|| {
        if let Err(e) = ctrlc::set_handler(on_interrupt) {
            warn!("Cannot install Ctrl-C handler, interrupts will not cancel cleanly: {e}");
        }
    });
    *ACTIVE.lock().unwrap_or_else(PoisonError::into_inner) = Some(flag);
    InterruptGuard { _private: () }
}

fn on_interrupt() {
    if !interrupt() {
        std::process::exit(i32::from(INTERRUPTED_EXIT_CODE));
    }
}

/// Raise the registered flag. Returns `false` when there is nothing left to
/// cancel gracefully (no task, or already cancelled).
fn interrupt() -> bool {
    let active = ACTIVE.lock().unwrap_or_else(PoisonError::into_inner);
    match active.as_ref() {
        Some(flag) if !flag.swap(true, Ordering::Relaxed) => {
            warn!("Interrupted, stopping after the current file (Ctrl-C again to abort)");
            true
        }
        _ => false,
    }
}
