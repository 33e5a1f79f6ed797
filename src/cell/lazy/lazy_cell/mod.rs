//! `LazyCell`: a value computed at most once, shared by any number of threads.
//!
//! The first caller of [`LazyCell::get`] runs the computation; concurrent
//! callers park until it finishes. The outcome, value or failure, is published
//! once through a `OnceLock` and replayed to every later caller without taking
//! the cell mutex.
//!
//! Interruption (see [`crate::concurrency::interrupt`]):
//! - a *waiting* caller that is interrupted gets
//!   [`LazyError::WaitInterrupted`]; the cell is not affected;
//! - if the *computing* thread is interrupted during the computation and the
//!   interruption is still pending when it returns, or the computation returns
//!   [`ComputeError::Interrupted`], the cell is poisoned with
//!   [`LazyError::Interrupted`] for everyone. The flag is consumed. This
//!   overrides a value or an application error, but not a panic;
//! - an interruption already pending when the computation starts is left
//!   pending for the caller and does not affect the outcome.

mod inner;

use core::fmt;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread;

use serde::{Deserialize, Serialize};

use crate::concurrency::interrupt;
use crate::concurrency::sync::WaitList;
use crate::error::{ComputeError, LazyError};
use crate::trace::trace_event;
use inner::{Inner, State};

/// A type-erased computation, as stored by [`Memoized`](crate::Memoized).
pub type BoxedComputation<R, E> = Box<dyn FnOnce() -> Result<R, ComputeError<E>> + Send>;

/// A diagnostic snapshot of a cell's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellState {
    /// Not computed yet, nobody is computing.
    Empty,
    /// A thread is running the computation.
    Computing,
    /// Resolved to a value.
    Succeeded,
    /// Resolved to a failure.
    Failed,
}

impl CellState {
    /// Returns `true` for the two terminal states.
    #[inline]
    pub fn is_done(self) -> bool {
        matches!(self, CellState::Succeeded | CellState::Failed)
    }
}

/// A thread-safe, single-assignment lazy value.
///
/// `R` is the value, `E` the application error and `F` the computation.
pub struct LazyCell<R, E = core::convert::Infallible, F = fn() -> Result<R, ComputeError<E>>> {
    outcome: OnceLock<Result<R, LazyError<E>>>,
    inner: Mutex<Inner<F>>,
}

impl<R, E, F> LazyCell<R, E, F>
where
    F: FnOnce() -> Result<R, ComputeError<E>>,
{
    /// Creates a cell that will run `computation` on first access.
    pub fn new(computation: F) -> Self {
        Self {
            outcome: OnceLock::new(),
            inner: Mutex::new(Inner {
                state: State::Empty(computation),
                waiters: WaitList::new(),
            }),
        }
    }

    /// Returns the value, computing it on the calling thread if nobody has
    /// started yet, or blocking until the computing thread finishes.
    ///
    /// # Errors
    /// - a terminal failure stored in the cell ([`LazyError::Failed`],
    ///   [`LazyError::Panicked`], [`LazyError::Interrupted`]); every caller
    ///   receives a clone sharing the same allocation;
    /// - [`LazyError::WaitInterrupted`] if this caller was interrupted while
    ///   blocked;
    /// - [`LazyError::Recursive`] if called from inside this cell's own
    ///   computation.
    #[inline]
    pub fn get(&self) -> Result<&R, LazyError<E>> {
        match self.outcome.get() {
            Some(outcome) => replay(outcome),
            None => self.get_slow(),
        }
    }

    #[cold]
    fn get_slow(&self) -> Result<&R, LazyError<E>> {
        let me = thread::current().id();
        let mut inner = self.lock();

        if let Some(computation) = inner.state.claim(me) {
            drop(inner);
            return self.compute(computation);
        }
        if inner.state.is_computing_on(me) {
            trace_event!("lazy cell re-entered by its computing thread");
            return Err(LazyError::Recursive);
        }

        let token = inner.waiters.register(interrupt::unparker());
        loop {
            if let Some(outcome) = self.outcome.get() {
                inner.waiters.deregister(token);
                return replay(outcome);
            }
            if interrupt::interrupted() {
                inner.waiters.deregister(token);
                trace_event!("lazy cell waiter interrupted");
                return Err(LazyError::WaitInterrupted);
            }
            drop(inner);
            interrupt::park();
            inner = self.lock();
        }
    }

    fn compute(&self, computation: F) -> Result<&R, LazyError<E>> {
        trace_event!("lazy cell computing");
        // A flag already pending on entry belongs to the caller and is left
        // alone. One raised during the run is consumed here.
        let pending = interrupt::is_interrupted();
        let result = panic::catch_unwind(AssertUnwindSafe(computation));
        let raised = !pending && interrupt::interrupted();

        // Precedence: panic, then interruption, then the returned result.
        let outcome = match result {
            Err(payload) => Err(LazyError::Panicked(panic_message(payload.as_ref()))),
            Ok(_) if raised => Err(LazyError::Interrupted),
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(LazyError::from(err)),
        };
        self.publish(outcome)
    }

    fn publish(&self, outcome: Result<R, LazyError<E>>) -> Result<&R, LazyError<E>> {
        // Only the claiming thread publishes, so this always initializes.
        let stored = self.outcome.get_or_init(move || outcome);

        let mut inner = self.lock();
        inner.state = State::Done;
        inner.waiters.wake_all();
        drop(inner);

        trace_event!(succeeded = stored.is_ok(), "lazy cell published");
        replay(stored)
    }
}

impl<R, E> LazyCell<R, E> {
    /// Creates a cell that is already resolved to `value`.
    pub fn with_value(value: R) -> Self {
        Self::resolved(Ok(value))
    }

    /// Creates a cell that is already failed with `error`.
    pub fn failed(error: E) -> Self {
        Self::resolved(Err(LazyError::Failed(Arc::new(error))))
    }

    fn resolved(outcome: Result<R, LazyError<E>>) -> Self {
        Self {
            outcome: OnceLock::from(outcome),
            inner: Mutex::new(Inner {
                state: State::Done,
                waiters: WaitList::new(),
            }),
        }
    }
}

impl<R, E, F> LazyCell<R, E, F> {
    /// Returns `true` once the cell holds a value or a failure. Never blocks.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.outcome.get().is_some()
    }

    /// Returns the outcome if the cell is ready, without blocking or
    /// computing.
    #[inline]
    pub fn try_get(&self) -> Option<Result<&R, LazyError<E>>> {
        self.outcome.get().map(replay)
    }

    /// Returns a snapshot of the cell's lifecycle.
    pub fn state(&self) -> CellState {
        if let Some(outcome) = self.outcome.get() {
            return outcome_state(outcome);
        }
        match self.lock().state {
            State::Empty(_) => CellState::Empty,
            State::Computing { .. } => CellState::Computing,
            // Published between the two reads above.
            State::Done => self.outcome.get().map_or(CellState::Computing, outcome_state),
        }
    }

    /// Consumes the cell, returning the outcome if it was computed.
    pub fn into_outcome(self) -> Option<Result<R, LazyError<E>>> {
        self.outcome.into_inner()
    }

    fn lock(&self) -> MutexGuard<'_, Inner<F>> {
        // User code never runs under this lock; poisoning cannot leave the
        // state half-written.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<R: fmt::Debug, E: fmt::Debug, F> fmt::Debug for LazyCell<R, E, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("LazyCell");
        match self.outcome.get() {
            Some(Ok(value)) => d.field("value", value),
            Some(Err(err)) => d.field("error", err),
            None => d.field("value", &format_args!("<uninit>")),
        };
        d.finish()
    }
}

fn replay<R, E>(outcome: &Result<R, LazyError<E>>) -> Result<&R, LazyError<E>> {
    outcome.as_ref().map_err(LazyError::clone)
}

fn outcome_state<R, E>(outcome: &Result<R, LazyError<E>>) -> CellState {
    if outcome.is_ok() {
        CellState::Succeeded
    } else {
        CellState::Failed
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> Arc<str> {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        Arc::from(*msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        Arc::from(msg.as_str())
    } else {
        Arc::from("Box<dyn Any>")
    }
}
