#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A fixed-capacity, thread-safe object pool that recycles a preallocated block of objects.
//!
//! The pool allocates all of its items once, when it is created. After that, checking out an
//! item and releasing it are constant-time bookkeeping operations on a ring of free slot
//! indices guarded by a single lock - no memory is allocated or freed no matter how many times
//! items are recycled.
//!
//! This crate provides two flavors of the same pool:
//!
//! * [`Pool<T>`] hands out [`Pooled<T>`] handles that borrow the pool and grant exclusive
//!   access to an item. Dropping a handle returns the item. This is the flavor to use unless
//!   you have a specific reason not to.
//! * [`RawPool<T>`] hands out [`RawPooled<T>`] handles that are plain `Copy` pointers. It is
//!   up to you to release each item exactly once and to not access items you no longer hold.
//!
//! # What the pool does not do
//!
//! * It never grows. When every item is checked out, `get()` returns `None` immediately.
//! * It does not clear items. An item keeps whatever value its previous holder left in it.
//! * It does not track who holds which item, so it cannot report leaks.
//!
//! # Example
//!
//! ```rust
//! use std::thread;
//!
//! use ring_pool::Pool;
//!
//! let pool = Pool::builder()
//!     .capacity(4)
//!     .name("scratch")
//!     .build_with(|_| String::with_capacity(64))?;
//!
//! thread::scope(|s| {
//!     for worker in 0..4 {
//!         let pool = &pool;
//!
//!         s.spawn(move || {
//!             // There are as many items as workers, so this always succeeds.
//!             let mut scratch = pool.get().expect("one item per worker");
//!
//!             scratch.clear();
//!             scratch.push_str("worker ");
//!             scratch.push_str(&worker.to_string());
//!         });
//!     }
//! });
//!
//! assert_eq!(pool.avail(), 4);
//! # Ok::<(), ring_pool::Error>(())
//! ```
//!
//! # Logging
//!
//! The pool emits [`tracing`](https://docs.rs/tracing) events: `debug` when a pool is created
//! or reset, `trace` for every checkout, release and exhaustion, and `error` right before it
//! panics due to a broken release.

mod builder;
mod error;
mod pool;
mod pooled;
mod raw;
mod ring;

pub use builder::*;
pub use error::*;
pub use pool::*;
pub use pooled::*;
pub use raw::*;
pub(crate) use ring::*;
