//! Cooperative thread interruption.
//!
//! Every thread owns an interrupt flag and a parker. Another thread holding an
//! [`Interrupter`] can raise the flag and wake the target out of an
//! interruptible wait. Nothing is forcibly cancelled: code observes the flag
//! through [`check`], [`interrupted`], [`sleep`] or the lazy cell wait loop.
//!
//! Observing an interruption through any of the `Result`-returning helpers
//! consumes the flag, so a single `interrupt()` surfaces exactly once.

use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use crossbeam_utils::sync::{Parker, Unparker};

use crate::error::Interrupted;

/// State shared between a thread and the handles that can interrupt it.
struct Shared {
    flag: AtomicBool,
    unparker: Unparker,
    thread: ThreadId,
}

struct Local {
    parker: Parker,
    shared: Arc<Shared>,
}

impl Local {
    fn new() -> Self {
        let parker = Parker::new();
        let shared = Arc::new(Shared {
            flag: AtomicBool::new(false),
            unparker: parker.unparker().clone(),
            thread: thread::current().id(),
        });
        Self { parker, shared }
    }
}

thread_local! {
    static LOCAL: Local = Local::new();
}

/// A handle that can interrupt one particular thread.
#[derive(Clone)]
pub struct Interrupter {
    shared: Arc<Shared>,
}

impl Interrupter {
    /// Raises the target thread's interrupt flag and wakes it if it is parked
    /// in an interruptible wait.
    pub fn interrupt(&self) {
        self.shared.flag.store(true, Ordering::Release);
        self.shared.unparker.unpark();
    }

    /// Returns `true` if the target thread has a pending interruption.
    #[inline]
    pub fn is_interrupted(&self) -> bool {
        self.shared.flag.load(Ordering::Acquire)
    }

    /// The id of the thread this handle interrupts.
    #[inline]
    pub fn thread_id(&self) -> ThreadId {
        self.shared.thread
    }
}

impl fmt::Debug for Interrupter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interrupter")
            .field("thread", &self.shared.thread)
            .field("interrupted", &self.is_interrupted())
            .finish()
    }
}

/// Returns an [`Interrupter`] for the calling thread.
pub fn current() -> Interrupter {
    LOCAL.with(|local| Interrupter {
        shared: Arc::clone(&local.shared),
    })
}

/// Returns `true` if the calling thread has a pending interruption, without
/// clearing it.
pub fn is_interrupted() -> bool {
    LOCAL.with(|local| local.shared.flag.load(Ordering::Acquire))
}

/// Tests and clears the calling thread's interrupt flag.
pub fn interrupted() -> bool {
    LOCAL.with(|local| local.shared.flag.swap(false, Ordering::AcqRel))
}

/// Returns `Err(Interrupted)` if the calling thread has a pending
/// interruption, clearing it.
#[inline]
pub fn check() -> Result<(), Interrupted> {
    if interrupted() {
        Err(Interrupted)
    } else {
        Ok(())
    }
}

/// Sleeps for `duration` unless interrupted first.
///
/// A pending interruption is reported immediately, before any sleeping.
pub fn sleep(duration: Duration) -> Result<(), Interrupted> {
    let deadline = Instant::now() + duration;
    LOCAL.with(|local| loop {
        if local.shared.flag.swap(false, Ordering::AcqRel) {
            return Err(Interrupted);
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(());
        }
        // Wake-ups before the deadline may be spurious; the loop re-checks.
        local.parker.park_timeout(deadline - now);
    })
}

/// Parks the calling thread until it is unparked through its [`unparker`] or
/// interrupted. May return spuriously; callers re-check their condition.
pub fn park() {
    LOCAL.with(|local| {
        if !local.shared.flag.load(Ordering::Acquire) {
            local.parker.park();
        }
    });
}

/// Returns the handle that wakes the calling thread out of [`park`].
pub fn unparker() -> Unparker {
    LOCAL.with(|local| local.shared.unparker.clone())
}
