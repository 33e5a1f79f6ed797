//! Lazy, thread-safe single-assignment cells.

pub mod lazy_cell;

pub use lazy_cell::{BoxedComputation, CellState, LazyCell};
