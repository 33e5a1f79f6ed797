use lazymemo::{ComputeError, LazyError, MemoConfig, Memoized};
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone)]
enum Operation {
    Apply(u8),
    ApplyAbsent,
    IsComputedAt(u8),
}

fn operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        4 => any::<u8>().prop_map(Operation::Apply),
        1 => Just(Operation::ApplyAbsent),
        2 => any::<u8>().prop_map(Operation::IsComputedAt),
    ]
}

/// f(k) = k * 3, failing for multiples of 7; f(absent) = 0.
fn model(key: Option<u8>) -> Result<u32, String> {
    match key {
        Some(k) if k % 7 == 0 => Err(format!("multiple of seven: {k}")),
        Some(k) => Ok(u32::from(k) * 3),
        None => Ok(0),
    }
}

proptest! {
    #[test]
    fn test_memoized_matches_model(
        ops in proptest::collection::vec(operation(), 1..200),
        shards in 1usize..16,
    ) {
        let calls = Arc::new(Mutex::new(HashMap::<Option<u8>, usize>::new()));
        let memo = {
            let calls = Arc::clone(&calls);
            Memoized::with_config(MemoConfig::new().with_shards(shards), move |k: Option<&u8>| {
                *calls.lock().unwrap().entry(k.copied()).or_default() += 1;
                model(k.copied()).map_err(ComputeError::fail)
            })
        };
        let mut created = HashSet::new();
        let mut computed = HashSet::new();

        for op in ops {
            match op {
                Operation::Apply(k) => {
                    created.insert(Some(k));
                    computed.insert(Some(k));
                    match (memo.apply(&k), model(Some(k))) {
                        (Ok(got), Ok(want)) => prop_assert_eq!(got, want),
                        (Err(LazyError::Failed(got)), Err(want)) => prop_assert_eq!(&*got, &want),
                        (got, want) => prop_assert!(false, "key {}: {:?} vs {:?}", k, got, want),
                    }
                }
                Operation::ApplyAbsent => {
                    created.insert(None);
                    computed.insert(None);
                    prop_assert_eq!(memo.apply_absent().ok(), Some(0));
                }
                Operation::IsComputedAt(k) => {
                    created.insert(Some(k));
                    prop_assert_eq!(memo.is_computed_at(&k), computed.contains(&Some(k)));
                }
            }
        }

        prop_assert_eq!(memo.len(), created.len());
        prop_assert_eq!(memo.stats().ready, computed.len());
        let calls = calls.lock().unwrap();
        prop_assert_eq!(calls.len(), computed.len());
        prop_assert!(calls.values().all(|&n| n == 1));
    }

    #[test]
    fn test_concurrent_keys_each_computed_once(
        keys in proptest::collection::vec(0u16..64, 1..64),
        threads in 2usize..6,
    ) {
        let calls = Arc::new(AtomicUsize::new(0));
        let memo = {
            let calls = Arc::clone(&calls);
            Memoized::new(move |k: Option<&u16>| -> Result<u32, ComputeError<()>> {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(k.map_or(0, |&k| u32::from(k) + 1))
            })
        };

        thread::scope(|s| {
            for _ in 0..threads {
                s.spawn(|| {
                    for k in &keys {
                        assert_eq!(memo.apply(k).ok(), Some(u32::from(*k) + 1));
                    }
                });
            }
        });

        let distinct: HashSet<_> = keys.iter().collect();
        prop_assert_eq!(calls.load(Ordering::SeqCst), distinct.len());
        prop_assert_eq!(memo.len(), distinct.len());
    }
}
