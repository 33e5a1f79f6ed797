//! Error taxonomy for lazy cells and memoized functions.
//!
//! Computations report failure with [`ComputeError`]. Callers of
//! [`LazyCell::get`](crate::LazyCell::get) observe [`LazyError`], which keeps
//! every captured failure behind an `Arc` so each observer sees the same
//! allocation.

use core::fmt;
use std::sync::Arc;

/// The calling thread was interrupted.
///
/// Returned by the interruptible helpers in
/// [`concurrency::interrupt`](crate::concurrency::interrupt). Converts into
/// [`ComputeError::Interrupted`] so computations can use `?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Interrupted;

impl fmt::Display for Interrupted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("thread was interrupted")
    }
}

impl std::error::Error for Interrupted {}

/// How a computation can fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComputeError<E> {
    /// The computation itself failed with an application error.
    Failed(E),
    /// The computation observed an interruption of its thread.
    Interrupted,
}

impl<E> ComputeError<E> {
    /// Wraps an application error.
    #[inline]
    pub fn fail(error: E) -> Self {
        Self::Failed(error)
    }
}

impl<E> From<Interrupted> for ComputeError<E> {
    #[inline]
    fn from(_: Interrupted) -> Self {
        Self::Interrupted
    }
}

impl<E: fmt::Display> fmt::Display for ComputeError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(e) => write!(f, "computation failed: {e}"),
            Self::Interrupted => f.write_str("computation was interrupted"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for ComputeError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Failed(e) => Some(e),
            Self::Interrupted => None,
        }
    }
}

/// The error observed by a caller of a lazy cell.
///
/// Terminal failures (`Failed`, `Panicked`, `Interrupted`) are stored in the
/// cell and handed to every caller. `WaitInterrupted` and `Recursive` describe
/// a single call and leave the cell untouched.
#[derive(Debug)]
pub enum LazyError<E> {
    /// The computation returned an application error.
    Failed(Arc<E>),
    /// The computation panicked; carries the panic message.
    Panicked(Arc<str>),
    /// The computing thread was interrupted mid-computation. The cell is
    /// poisoned for every caller.
    Interrupted,
    /// This caller was interrupted while blocked on another thread's
    /// computation.
    WaitInterrupted,
    /// The computation re-entered its own cell.
    Recursive,
}

impl<E> LazyError<E> {
    /// Returns `true` for either interruption variant.
    #[inline]
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted | Self::WaitInterrupted)
    }

    /// Returns `true` if this error is stored in the cell and will be seen by
    /// every later caller.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::Panicked(_) | Self::Interrupted)
    }

    /// Returns the application error, if that is what this is.
    #[inline]
    pub fn application_error(&self) -> Option<&Arc<E>> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }
}

// Manual impl: cloning shares the `Arc`, no `E: Clone` needed.
impl<E> Clone for LazyError<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Failed(e) => Self::Failed(Arc::clone(e)),
            Self::Panicked(msg) => Self::Panicked(Arc::clone(msg)),
            Self::Interrupted => Self::Interrupted,
            Self::WaitInterrupted => Self::WaitInterrupted,
            Self::Recursive => Self::Recursive,
        }
    }
}

impl<E> From<ComputeError<E>> for LazyError<E> {
    fn from(err: ComputeError<E>) -> Self {
        match err {
            ComputeError::Failed(e) => Self::Failed(Arc::new(e)),
            ComputeError::Interrupted => Self::Interrupted,
        }
    }
}

impl<E: fmt::Display> fmt::Display for LazyError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(e) => write!(f, "lazy computation failed: {e}"),
            Self::Panicked(msg) => write!(f, "lazy computation panicked: {msg}"),
            Self::Interrupted => f.write_str("lazy computation was interrupted"),
            Self::WaitInterrupted => {
                f.write_str("interrupted while waiting for a lazy computation")
            }
            Self::Recursive => f.write_str("lazy computation re-entered its own cell"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for LazyError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Failed(e) => Some(&**e),
            _ => None,
        }
    }
}
