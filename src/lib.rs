//! # `lazymemo` - Exactly-Once Lazy Cells and Memoized Functions
//!
//! Two small concurrency primitives:
//!
//! - [`LazyCell`]: wraps a zero-argument computation and runs it at most once,
//!   no matter how many threads ask for the value at the same time.
//! - [`Memoized`]: a one-argument function that keeps one `LazyCell` per key,
//!   so each key is computed at most once and different keys never wait on
//!   each other.
//!
//! ## Guarantees
//!
//! ### Exactly once
//! The first caller of [`LazyCell::get`] runs the computation on its own
//! thread. Every other caller parks until the outcome is published. The
//! computation never runs twice, not even after a failure.
//!
//! ### Consistent replay
//! Once published, the outcome never changes. A value is returned by
//! reference to every caller; a failure is stored behind an `Arc` and every
//! caller receives the same allocation.
//!
//! ### Interruption
//! Rust threads cannot be interrupted by the runtime, so the crate ships a
//! cooperative scheme in [`concurrency::interrupt`]:
//!
//! - interrupting a thread that is *waiting* on a cell fails only that call
//!   with [`LazyError::WaitInterrupted`];
//! - interrupting the thread that is *computing* poisons the cell: every
//!   caller, current and future, sees [`LazyError::Interrupted`].
//!
//! ### Re-entrancy
//! A computation that reads its own cell gets [`LazyError::Recursive`]
//! instead of deadlocking.
//!
//! ## Architecture
//!
//! 1. **Interrupt** (`concurrency::interrupt`): per-thread flag plus parker.
//! 2. **Wait list** (`concurrency::sync`): the threads parked on one cell.
//! 3. **Lazy cell** (`cell::lazy`): mutex-guarded state machine
//!    `Empty → Computing → Done`, outcome published through a `OnceLock`.
//! 4. **Memoized** (`memo`): sharded key → cell map with atomic
//!    get-or-insert, plus a reserved slot for the absent key.
//!
//! ## Example
//!
//! ```rust
//! use lazymemo::{ComputeError, LazyCell, LazyError};
//!
//! let cell = LazyCell::new(|| Ok::<_, ComputeError<String>>(6 * 7));
//! assert!(!cell.is_ready());
//! assert_eq!(cell.get().copied().ok(), Some(42));
//!
//! let broken = LazyCell::new(|| Err::<u32, _>(ComputeError::fail("no disk".to_string())));
//! let first = broken.get().unwrap_err();
//! let again = broken.get().unwrap_err();
//! match (first, again) {
//!     (LazyError::Failed(a), LazyError::Failed(b)) => assert!(std::sync::Arc::ptr_eq(&a, &b)),
//!     _ => unreachable!(),
//! }
//! ```
//!
//! ## Features
//!
//! - `tracing`: emit `tracing` events on cell and memo transitions.
//! - `parallel`: [`Memoized::apply_all`] over `rayon`.

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod cell;
pub mod concurrency;
pub mod error;
pub mod memo;

mod trace;

pub use cell::{CellState, LazyCell};
pub use concurrency::interrupt::{self, Interrupter};
pub use error::{ComputeError, Interrupted, LazyError};
pub use memo::{MemoCell, MemoConfig, MemoStats, Memoized};

// Compile-time checks that the primitives can be shared across threads.
const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}

    assert_send_sync::<LazyCell<u64>>();
    assert_send_sync::<MemoCell<u64>>();
    assert_send_sync::<Memoized<u64, u64>>();
    assert_send_sync::<Interrupter>();
    assert_send_sync::<LazyError<std::io::Error>>();
};
