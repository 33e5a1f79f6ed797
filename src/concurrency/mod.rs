//! Thread coordination: cooperative interruption and wait lists.
//!
//! Lazy cells block only through [`interrupt::park`], which an
//! [`interrupt::Interrupter`] or a completing computation can end.

pub mod interrupt;
pub mod sync;

pub use interrupt::Interrupter;
