//! Memoized functions built from per-key lazy cells.

mod config;
mod memoized;
mod shard;

pub use config::MemoConfig;
pub use memoized::{MemoCell, MemoStats, Memoized};
