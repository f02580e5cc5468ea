#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))] // This is all test code, no need to test it.

//! Private helpers for testing the ring_pool packages.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// How long a test may run before the watchdog fails it.
///
/// Miri is far slower at thread synchronization, so it gets more time.
fn timeout() -> Duration {
    if cfg!(miri) {
        Duration::from_secs(60)
    } else {
        Duration::from_secs(10)
    }
}

/// Runs a test body on a separate thread and fails the test if it does not finish in time.
///
/// A pool test that never ends (a lost release, a checkout loop that never sees exhaustion)
/// otherwise stalls the whole test run instead of failing with a useful message.
///
/// Setting `MUTATION_TESTING=1` disables the watchdog so that cargo-mutants can detect hanging
/// mutations with its own timeout.
///
/// # Panics
///
/// Panics if the test body panics or does not finish within the timeout.
///
/// # Example
///
/// ```rust
/// use testing::with_watchdog;
///
/// let answer = with_watchdog(|| 40 + 2);
/// assert_eq!(answer, 42);
/// ```
pub fn with_watchdog<F, R>(test_fn: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    if std::env::var("MUTATION_TESTING").as_deref() == Ok("1") {
        return test_fn();
    }

    let (tx, rx) = mpsc::channel();

    let worker = thread::spawn(move || {
        // If the receiver gave up waiting, there is nobody to report to.
        drop(tx.send(test_fn()));
    });

    let timeout = timeout();

    match rx.recv_timeout(timeout) {
        Ok(result) => {
            worker.join().expect("test thread completed, so it cannot have panicked");
            result
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            panic!("test did not finish within {timeout:?}");
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => match worker.join() {
            Ok(()) => panic!("test thread exited without reporting a result"),
            Err(payload) => std::panic::resume_unwind(payload),
        },
    }
}
