//! Blocking building blocks for the cell wait loop.

pub mod wait_list;

pub use wait_list::{WaitList, WaitToken};
