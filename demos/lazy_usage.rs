//! LazyCell and Memoized Usage Examples
//!
//! Run with `cargo run --example lazy_usage --features tracing` to see the
//! cell transitions logged.

use anyhow::{anyhow, Result};
use lazymemo::{interrupt, ComputeError, LazyCell, LazyError, Memoized};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() -> Result<()> {
    #[cfg(feature = "tracing")]
    {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .init();
    }

    println!("LazyCell Usage Examples");
    println!("=======================");

    // Example 1: one computation shared by several threads
    println!("\n1. Shared Lazy Computation:");
    let compute_count = Arc::new(AtomicUsize::new(0));
    let lazy = {
        let compute_count = Arc::clone(&compute_count);
        Arc::new(LazyCell::new(move || -> Result<u64, ComputeError<io::Error>> {
            compute_count.fetch_add(1, Ordering::SeqCst);
            println!("  Computing expensive value...");
            interrupt::sleep(Duration::from_millis(50))?;
            Ok(42 * 2)
        }))
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let lazy = Arc::clone(&lazy);
            thread::spawn(move || lazy.get().copied())
        })
        .collect();
    for reader in readers {
        let value = reader.join().map_err(|_| anyhow!("reader panicked"))??;
        println!("  Result: {value}, Compute count: {}", compute_count.load(Ordering::SeqCst));
    }

    // Example 2: failures are stored and replayed
    println!("\n2. Failure Replay:");
    let broken = LazyCell::new(|| {
        Err::<u64, _>(ComputeError::fail(io::Error::new(io::ErrorKind::NotFound, "config file missing")))
    });
    for attempt in 1..=2 {
        match broken.get() {
            Ok(v) => println!("  Attempt {attempt}: {v}"),
            Err(e) => println!("  Attempt {attempt}: {e}"),
        }
    }

    // Example 3: memoized function with an absent key
    println!("\n3. Memoized Function:");
    let lengths: Memoized<String, usize, io::Error> = Memoized::new(|s: Option<&String>| {
        s.map(String::len)
            .ok_or_else(|| ComputeError::fail(io::Error::new(io::ErrorKind::InvalidInput, "no input")))
    });
    for word in ["lazy", "memo", "lazy"] {
        let len = lengths.apply(&word.to_string())?;
        println!("  len({word}) = {len}");
    }
    if let Err(LazyError::Failed(e)) = lengths.apply_absent() {
        println!("  len(<absent>) failed: {e}");
    }
    println!("  Stats: {}", serde_json::to_string(&lengths.stats())?);

    Ok(())
}
