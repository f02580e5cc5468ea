use std::fmt;
use std::ptr;

use tracing::error;

use crate::{PoolBuilder, Pooled, RawPool};

/// A fixed-capacity, thread-safe pool of `T`.
///
/// All items are allocated once, when the pool is created. Checking out an item with
/// [`get()`][Self::get] never allocates and releasing it never frees memory - the same
/// storage is handed out again and again. This makes the pool a good fit for workloads that
/// repeatedly need a short-lived object of the same type, such as scratch buffers or
/// per-request state.
///
/// # Capacity
///
/// The pool never grows. Once every item is checked out, [`get()`][Self::get] returns `None`
/// until some item is released. The pool does not wait for items to become available - if you
/// need that, build it on top (e.g. with a semaphore sized to the capacity).
///
/// # Item state
///
/// Items are not cleared between uses. A freshly checked out item contains whatever its
/// previous holder left in it (or the initial value, if it has never been used). The caller is
/// responsible for resetting item state as appropriate.
///
/// # Thread safety
///
/// The pool is thread-safe (`Send` and `Sync`) if `T: Send`. All operations take a single
/// internal lock that is only held for the constant-time bookkeeping, never while user code
/// runs. There is no fairness between threads competing for the last free item.
///
/// # Example
///
/// ```rust
/// use ring_pool::Pool;
///
/// let pool = Pool::<Vec<u8>>::new(3)?;
///
/// let mut a = pool.get().unwrap();
/// let b = pool.get().unwrap();
/// let c = pool.get().unwrap();
///
/// // Everything is checked out.
/// assert!(pool.get().is_none());
///
/// a.clear();
/// a.extend_from_slice(b"hello");
///
/// pool.put(a);
/// assert_eq!(pool.avail(), 1);
///
/// // Dropping a handle returns the item as well.
/// drop(b);
/// drop(c);
/// assert_eq!(pool.avail(), 3);
/// # Ok::<(), ring_pool::Error>(())
/// ```
pub struct Pool<T> {
    inner: RawPool<T>,
}

impl<T> Pool<T> {
    /// Creates a pool of `capacity` items, each initialized to `T::default()`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ZeroCapacity`][crate::Error::ZeroCapacity] if `capacity` is zero and
    /// [`Error::CapacityOverflow`][crate::Error::CapacityOverflow] if the storage for that many
    /// items cannot be allocated as a single block.
    ///
    /// # Example
    ///
    /// ```rust
    /// use ring_pool::{Error, Pool};
    ///
    /// let pool = Pool::<u32>::new(8)?;
    /// assert_eq!(pool.avail(), 8);
    ///
    /// assert!(matches!(Pool::<u32>::new(0), Err(Error::ZeroCapacity)));
    /// # Ok::<(), ring_pool::Error>(())
    /// ```
    pub fn new(capacity: usize) -> crate::Result<Self>
    where
        T: Default,
    {
        Self::builder().capacity(capacity).build()
    }

    /// Starts building a new [`Pool`].
    ///
    /// Use this when you want to name the pool or initialize its items with something other
    /// than `T::default()`.
    pub fn builder() -> PoolBuilder<T> {
        PoolBuilder::new()
    }

    pub(crate) fn from_raw(inner: RawPool<T>) -> Self {
        Self { inner }
    }

    /// The number of items the pool manages. Fixed for the lifetime of the pool.
    #[must_use]
    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// The number of items that are currently not checked out.
    ///
    /// This is a snapshot - other threads may check out or release items before the caller
    /// gets to act on the value. In particular, a non-zero value does not guarantee that the
    /// next [`get()`][Self::get] will succeed.
    #[must_use]
    pub fn avail(&self) -> usize {
        self.inner.avail()
    }

    /// The diagnostic name of the pool, used in log events and in its `Display` output.
    #[must_use]
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Checks out an item from the pool.
    ///
    /// Returns `None` if every item is already checked out. This is an expected condition -
    /// the pool never waits for an item to be released.
    ///
    /// The item is returned to the pool when the handle is dropped or passed to
    /// [`put()`][Self::put].
    ///
    /// # Example
    ///
    /// ```rust
    /// use ring_pool::Pool;
    ///
    /// let pool = Pool::<u32>::new(1)?;
    ///
    /// let mut item = pool.get().unwrap();
    /// *item = 42;
    /// assert!(pool.get().is_none());
    ///
    /// drop(item);
    ///
    /// // Same storage, previous contents intact.
    /// assert_eq!(*pool.get().unwrap(), 42);
    /// # Ok::<(), ring_pool::Error>(())
    /// ```
    #[must_use]
    pub fn get(&self) -> Option<Pooled<'_, T>> {
        self.inner
            .get()
            .map(|handle| Pooled::new(handle, &self.inner))
    }

    /// Returns a checked out item to the pool.
    ///
    /// This is equivalent to dropping the handle but makes the release explicit and verifies
    /// that the handle came from this pool.
    ///
    /// # Panics
    ///
    /// Panics if the item was checked out from a different pool.
    pub fn put(&self, item: Pooled<'_, T>) {
        if !ptr::eq(item.pool(), &self.inner) {
            error!(
                pool = %self.name(),
                index = item.index(),
                "released an item from a different pool"
            );
            panic!(
                "{}: released an item that was checked out from a different pool",
                self.name()
            );
        }

        drop(item);
    }

    /// Returns the pool to its initial state, with every item free and the bookkeeping
    /// rewound so that items are handed out in storage order again.
    ///
    /// Requiring exclusive access guarantees that no item is checked out, so unlike
    /// [`RawPool::reset()`] this cannot invalidate any handle. Item contents are not touched.
    pub fn reset(&mut self) {
        self.inner.reset();
    }

    /// Consumes the pool and returns the raw pool it is built on.
    #[must_use]
    pub fn into_raw(self) -> RawPool<T> {
        self.inner
    }
}

impl<T> fmt::Display for Pool<T> {
    #[cfg_attr(test, mutants::skip)] // Diagnostic output only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl<T> fmt::Debug for Pool<T> {
    #[cfg_attr(test, mutants::skip)] // Diagnostic output only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool").field("inner", &self.inner).finish()
    }
}
