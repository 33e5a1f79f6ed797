use lazymemo::{interrupt, CellState, ComputeError, LazyError, MemoConfig, Memoized};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier, Mutex, OnceLock};
use std::thread;
use std::time::Duration;

#[test]
fn test_square_from_ten_threads() {
    let invocations = Arc::new(Mutex::new(HashMap::<i32, usize>::new()));
    let square = {
        let invocations = Arc::clone(&invocations);
        Arc::new(Memoized::new(move |x: Option<&i32>| -> Result<i32, ComputeError<()>> {
            let x = *x.unwrap_or(&0);
            *invocations.lock().unwrap().entry(x).or_default() += 1;
            thread::sleep(Duration::from_millis(5));
            Ok(x * x)
        }))
    };
    let barrier = Arc::new(Barrier::new(10));

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let square = Arc::clone(&square);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                square.apply(&5)
            })
        })
        .collect();

    for h in handles {
        assert_eq!(h.join().unwrap().ok(), Some(25));
    }
    assert_eq!(invocations.lock().unwrap().get(&5), Some(&1));
    assert!(square.is_computed_at(&5));
    assert!(!square.is_computed_at(&6));
}

#[test]
fn test_interrupted_key_does_not_poison_other_keys() {
    let memo = Arc::new(Memoized::new(|k: Option<&u32>| -> Result<u32, ComputeError<()>> {
        match k {
            Some(&0) => {
                interrupt::sleep(Duration::from_secs(30))?;
                Ok(0)
            }
            Some(&k) => Ok(k + 100),
            None => Ok(0),
        }
    }));

    let (tx, rx) = mpsc::channel();
    let slow = {
        let memo = Arc::clone(&memo);
        thread::spawn(move || {
            tx.send(interrupt::current()).unwrap();
            memo.apply(&0)
        })
    };
    let handle = rx.recv().unwrap();
    while memo.peek(&0).map(|cell| cell.state()) != Some(CellState::Computing) {
        thread::yield_now();
    }
    assert_eq!(memo.apply(&1).ok(), Some(101));
    handle.interrupt();

    assert!(matches!(slow.join().unwrap(), Err(LazyError::Interrupted)));
    assert!(matches!(memo.apply(&0), Err(LazyError::Interrupted)));
    assert_eq!(memo.apply(&2).ok(), Some(102));
    assert_eq!(memo.stats().failed, 1);
}

#[test]
fn test_absent_key_matches_normal_key_semantics() {
    let calls = Arc::new(AtomicUsize::new(0));
    let memo = {
        let calls = Arc::clone(&calls);
        Arc::new(Memoized::with_config(
            MemoConfig::new().with_shards(2),
            move |k: Option<&String>| -> Result<usize, ComputeError<String>> {
                calls.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(5));
                k.map(String::len).ok_or_else(|| ComputeError::fail("no key".to_string()))
            },
        ))
    };

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let memo = Arc::clone(&memo);
            thread::spawn(move || memo.apply_absent())
        })
        .collect();
    let errors: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().unwrap().unwrap_err())
        .collect();

    let first = errors[0].application_error().unwrap();
    assert_eq!(first.as_str(), "no key");
    assert!(errors
        .iter()
        .all(|e| Arc::ptr_eq(e.application_error().unwrap(), first)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert_eq!(memo.apply(&"abc".to_string()).ok(), Some(3));
    assert!(memo.is_computed_at_absent());
    assert_eq!(memo.len(), 2);
}

#[test]
fn test_indirect_recursion_through_another_key() {
    // f(1) reads f(2), which reads f(1) back on the same thread.
    type Memo = Memoized<u32, u32, ()>;
    let slot: Arc<OnceLock<Memo>> = Arc::new(OnceLock::new());
    let inner = Arc::clone(&slot);
    let memo = slot.get_or_init(move || {
        Memoized::new(move |k: Option<&u32>| -> Result<u32, ComputeError<()>> {
            let memo = inner.get().ok_or(ComputeError::Failed(()))?;
            match k {
                Some(&1) => memo
                    .apply(&2)
                    .map(|v| v + 1)
                    .map_err(|_| ComputeError::Failed(())),
                Some(&2) => match memo.apply(&1) {
                    Err(LazyError::Recursive) => Ok(100),
                    _ => Ok(0),
                },
                _ => Ok(0),
            }
        })
    });

    let outcome = thread::spawn({
        let slot = Arc::clone(&slot);
        move || slot.get().map(|memo| memo.apply(&1))
    })
    .join()
    .unwrap();
    assert_eq!(outcome.and_then(Result::ok), Some(101));

    assert_eq!(memo.apply(&2).ok(), Some(100));
    assert!(memo.is_computed_at(&1));
}
