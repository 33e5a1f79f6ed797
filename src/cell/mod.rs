//! Cell primitives.

pub mod lazy;

pub use lazy::{CellState, LazyCell};
