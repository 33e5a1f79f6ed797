use core::mem;
use std::thread::ThreadId;

use crate::concurrency::sync::WaitList;

/// Where a cell is in its lifecycle, as seen under the cell mutex.
pub(super) enum State<F> {
    /// Nobody has claimed the computation yet.
    Empty(F),
    /// `owner` is running the computation.
    Computing { owner: ThreadId },
    /// The outcome is published.
    Done,
}

impl<F> State<F> {
    /// Moves `Empty` to `Computing { owner }` and hands out the computation.
    /// Leaves any other state untouched and returns `None`.
    pub(super) fn claim(&mut self, owner: ThreadId) -> Option<F> {
        match mem::replace(self, State::Computing { owner }) {
            State::Empty(f) => Some(f),
            other => {
                *self = other;
                None
            }
        }
    }

    #[inline]
    pub(super) fn is_computing_on(&self, thread: ThreadId) -> bool {
        matches!(*self, State::Computing { owner } if owner == thread)
    }
}

/// Everything guarded by the cell mutex.
pub(super) struct Inner<F> {
    pub(super) state: State<F>,
    pub(super) waiters: WaitList,
}
