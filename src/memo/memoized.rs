//! `Memoized`: a function that computes its value at most once per key.

use core::convert::Infallible;
use core::fmt;
use std::hash::Hash;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use super::config::MemoConfig;
use super::shard::ShardedMap;
use crate::cell::lazy::{BoxedComputation, LazyCell};
use crate::error::{ComputeError, LazyError};
use crate::trace::debug_event;

/// The per-key cell type handed out by [`Memoized::value_for`].
pub type MemoCell<R, E = Infallible> = LazyCell<R, E, BoxedComputation<R, E>>;

type Function<K, R, E> = dyn Fn(Option<&K>) -> Result<R, ComputeError<E>> + Send + Sync;

/// Counters describing a memoized function's cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoStats {
    /// Cells created, the absent-key slot included.
    pub cells: usize,
    /// Cells holding a value or a failure.
    pub ready: usize,
    /// Cells holding a failure.
    pub failed: usize,
}

/// A memoized one-argument function.
///
/// Each key gets its own [`LazyCell`], created on first access; every
/// guarantee of [`LazyCell::get`] holds per key. Keys never block each other
/// except for the brief shard lock taken when a cell is created.
///
/// The function receives `Some(&key)` for ordinary keys and `None` for the
/// reserved absent key (see [`Memoized::apply_absent`]).
///
/// ```rust
/// use lazymemo::Memoized;
///
/// let square: Memoized<u64, u64> = Memoized::new(|x: Option<&u64>| Ok(x.map_or(0, |x| x * x)));
/// assert_eq!(square.apply(&5).ok(), Some(25));
/// assert!(square.is_computed_at(&5));
/// ```
pub struct Memoized<K, R, E = Infallible> {
    function: Arc<Function<K, R, E>>,
    cells: ShardedMap<K, Arc<MemoCell<R, E>>>,
    absent: OnceLock<Arc<MemoCell<R, E>>>,
    config: MemoConfig,
}

impl<K, R, E> Memoized<K, R, E>
where
    K: Eq + Hash + Clone + Send + 'static,
    R: 'static,
    E: 'static,
{
    /// Memoizes `function` with the default configuration.
    pub fn new<F>(function: F) -> Self
    where
        F: Fn(Option<&K>) -> Result<R, ComputeError<E>> + Send + Sync + 'static,
    {
        Self::with_config(MemoConfig::default(), function)
    }

    /// Memoizes `function` with an explicit configuration.
    pub fn with_config<F>(config: MemoConfig, function: F) -> Self
    where
        F: Fn(Option<&K>) -> Result<R, ComputeError<E>> + Send + Sync + 'static,
    {
        Self {
            function: Arc::new(function),
            cells: ShardedMap::new(config.shards()),
            absent: OnceLock::new(),
            config,
        }
    }

    /// Returns the cell for `key`, creating it if this is the first access.
    ///
    /// Concurrent first accesses agree on a single cell; no computation runs
    /// here.
    pub fn value_for(&self, key: &K) -> Arc<MemoCell<R, E>> {
        let (cell, created) = self.cells.get_or_insert_with(key, |key| {
            let function = Arc::clone(&self.function);
            let key = key.clone();
            Arc::new(LazyCell::new(Box::new(move || function(Some(&key))) as BoxedComputation<R, E>))
        });
        if created {
            debug_event!("memoized cell created");
        }
        cell
    }

    /// Returns the cell reserved for the absent key, creating it on first
    /// access.
    pub fn value_for_absent(&self) -> Arc<MemoCell<R, E>> {
        let cell = self.absent.get_or_init(|| {
            debug_event!("memoized absent-key cell created");
            let function = Arc::clone(&self.function);
            Arc::new(LazyCell::new(Box::new(move || function(None)) as BoxedComputation<R, E>))
        });
        Arc::clone(cell)
    }

    /// Returns the function's value at `key`, computing it on first access.
    ///
    /// # Errors
    /// Every error of [`LazyCell::get`], scoped to this key's cell.
    pub fn apply(&self, key: &K) -> Result<R, LazyError<E>>
    where
        R: Clone,
    {
        self.value_for(key).get().cloned()
    }

    /// Returns the function's value at the absent key.
    ///
    /// # Errors
    /// Every error of [`LazyCell::get`], scoped to the absent-key cell.
    pub fn apply_absent(&self) -> Result<R, LazyError<E>>
    where
        R: Clone,
    {
        self.value_for_absent().get().cloned()
    }

    /// Returns `true` if the value at `key` is computed (successfully or not).
    ///
    /// Creates the cell for `key` if it did not exist; no computation runs.
    pub fn is_computed_at(&self, key: &K) -> bool {
        self.value_for(key).is_ready()
    }

    /// Returns `true` if the value at the absent key is computed. Creates the
    /// absent-key cell if needed.
    pub fn is_computed_at_absent(&self) -> bool {
        self.value_for_absent().is_ready()
    }

    /// Returns the cell for `key` if one exists, without creating it.
    pub fn peek(&self, key: &K) -> Option<Arc<MemoCell<R, E>>> {
        self.cells.get(key)
    }

    /// Number of cells created so far, the absent-key slot included.
    pub fn len(&self) -> usize {
        self.cells.len() + usize::from(self.absent.get().is_some())
    }

    /// Returns `true` if no cell has been created yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Counts cells by lifecycle. Never blocks on a running computation.
    pub fn stats(&self) -> MemoStats {
        let mut stats = MemoStats::default();
        let mut count = |cell: &Arc<MemoCell<R, E>>| {
            stats.cells += 1;
            match cell.try_get() {
                Some(Ok(_)) => stats.ready += 1,
                Some(Err(_)) => {
                    stats.ready += 1;
                    stats.failed += 1;
                }
                None => {}
            }
        };
        self.cells.for_each_value(&mut count);
        if let Some(cell) = self.absent.get() {
            count(cell);
        }
        stats
    }

    /// The configuration this function was built with.
    #[inline]
    pub fn config(&self) -> &MemoConfig {
        &self.config
    }

    /// Applies the function to every key in parallel, returning results in
    /// key order.
    #[cfg(feature = "parallel")]
    pub fn apply_all(&self, keys: &[K]) -> Vec<Result<R, LazyError<E>>>
    where
        K: Sync,
        R: Clone + Send + Sync,
        E: Send + Sync,
    {
        use rayon::prelude::*;

        keys.par_iter().map(|key| self.apply(key)).collect()
    }
}

impl<K, R, E> fmt::Debug for Memoized<K, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoized")
            .field("config", &self.config)
            .field("absent", &self.absent.get().is_some())
            .finish_non_exhaustive()
    }
}
