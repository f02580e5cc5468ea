use std::any::type_name;
use std::borrow::Cow;
use std::cell::UnsafeCell;
use std::fmt;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, error, trace};

use crate::{FreeRing, PoolBuilder};

/// Source of pool identities. Item addresses alone cannot tell pools apart when `T` is
/// zero-sized, so every handle also remembers which pool issued it.
static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(0);

/// A fixed-capacity pool of `T` that hands out raw pointer handles to its items.
///
/// This is the building block of [`Pool`][crate::Pool]. It is exposed for callers who need the
/// pool's items to be addressable through plain pointers (e.g. to store the handles in their
/// own data structures or to pass them across an FFI boundary) and are willing to take on the
/// responsibility of upholding Rust's aliasing rules themselves.
///
/// # Bookkeeping
///
/// The pool allocates storage for all of its items once, when it is created. A ring of free
/// slot indices tracks which items are not checked out. [`get()`][Self::get] takes an index
/// from the ring and [`put()`][Self::put] returns one, both under a single lock that is only
/// held for the duration of the bookkeeping.
///
/// # Handle discipline
///
/// [`RawPooled<T>`] handles are `Copy`, so nothing stops you from returning the same handle
/// twice. The pool detects this only when the release would overflow the ring (i.e. the
/// pool already considers every item free), in which case it panics. Any other double release
/// silently enqueues the same item twice and a later pair of [`get()`][Self::get] calls will
/// hand out two handles to one item. Dereferencing handles is `unsafe` for this reason.
///
/// Items are not cleared when checked out - whatever the previous holder left in an item is
/// still there when the next holder receives it.
///
/// # Thread safety
///
/// The pool is thread-safe (`Send` and `Sync`) if `T: Send`.
///
/// # Example
///
/// ```rust
/// use ring_pool::RawPool;
///
/// let pool = RawPool::<u64>::new(2)?;
///
/// let mut handle = pool.get().expect("a fresh pool has free items");
///
/// // SAFETY: We hold the only handle to this item and the pool outlives the reference.
/// unsafe {
///     *handle.as_mut() = 42;
/// }
///
/// pool.put(handle);
/// assert_eq!(pool.avail(), 2);
/// # Ok::<(), ring_pool::Error>(())
/// ```
pub struct RawPool<T> {
    /// Storage for every item the pool will ever hand out. Never resized, so pointers into it
    /// stay valid for as long as the pool itself is alive.
    items: Box<[UnsafeCell<T>]>,

    free: Mutex<FreeRing>,

    /// Unique for the lifetime of the process.
    id: u64,

    name: Cow<'static, str>,
}

impl<T> RawPool<T> {
    /// Creates a pool of `capacity` items, each initialized to `T::default()`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ZeroCapacity`][crate::Error::ZeroCapacity] if `capacity` is zero and
    /// [`Error::CapacityOverflow`][crate::Error::CapacityOverflow] if the storage for that many
    /// items cannot be allocated as a single block.
    pub fn new(capacity: usize) -> crate::Result<Self>
    where
        T: Default,
    {
        Self::builder().capacity(capacity).build_raw()
    }

    /// Starts building a new [`RawPool`].
    ///
    /// Use this when you want to name the pool or initialize its items with something other
    /// than `T::default()`.
    pub fn builder() -> PoolBuilder<T> {
        PoolBuilder::new()
    }

    /// Allocates the storage and fills it via `init`, which receives the index of each item.
    ///
    /// The caller is expected to have validated the capacity already.
    pub(crate) fn new_inner<F>(capacity: usize, name: Option<Cow<'static, str>>, init: F) -> Self
    where
        F: FnMut(usize) -> T,
    {
        let items = (0..capacity).map(init).map(UnsafeCell::new).collect();
        let name = name.unwrap_or(Cow::Borrowed(type_name::<Self>()));

        debug!(pool = %name, capacity, "pool created");

        Self {
            items,
            free: Mutex::new(FreeRing::new(capacity)),
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            name,
        }
    }

    /// The number of items the pool manages. Fixed for the lifetime of the pool.
    #[must_use]
    #[inline]
    pub fn capacity(&self) -> usize {
        self.items.len()
    }

    /// The number of items that are currently not checked out.
    ///
    /// This is a snapshot - other threads may check out or release items before the caller
    /// gets to act on the value. In particular, a non-zero value does not guarantee that the
    /// next [`get()`][Self::get] will succeed.
    #[must_use]
    pub fn avail(&self) -> usize {
        self.free.lock().available()
    }

    /// The diagnostic name of the pool, used in log events and in its `Display` output.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Checks out an item from the pool.
    ///
    /// Returns `None` if every item is already checked out. This is an expected condition -
    /// the pool never waits for an item to be released.
    ///
    /// The returned handle stays valid until it is released via [`put()`][Self::put], the pool
    /// is [`reset()`][Self::reset] or the pool is dropped.
    #[must_use]
    pub fn get(&self) -> Option<RawPooled<T>> {
        let mut free = self.free.lock();
        let index = free.pop();
        let available = free.available();
        drop(free);

        let Some(index) = index else {
            trace!(pool = %self.name, "pool exhausted");
            return None;
        };

        trace!(pool = %self.name, index, available, "item checked out");

        Some(RawPooled::new(self.id, index, self.item_ptr(index)))
    }

    /// Releases a checked out item back to the pool.
    ///
    /// The handle must have been obtained from this pool's [`get()`][Self::get] and must not
    /// have been released since.
    ///
    /// # Panics
    ///
    /// Panics if the handle does not point into this pool.
    ///
    /// Panics if the pool already considers every item free, which means some item was
    /// released more than once. The pool state is left untouched in this case.
    pub fn put(&self, handle: RawPooled<T>) {
        let index = handle.index();

        if !self.owns(handle) {
            error!(pool = %self.name, index, "released a handle that does not belong to the pool");
            panic!(
                "{}: released a handle that does not belong to this pool",
                self.name
            );
        }

        let mut free = self.free.lock();

        if free.is_full() {
            drop(free);

            error!(pool = %self.name, index, "released an item into a pool that is already full");
            panic!(
                "{}: unexpected release into a full pool - an item was released more than once",
                self.name
            );
        }

        free.push(index);
        let available = free.available();
        drop(free);

        trace!(pool = %self.name, index, available, "item released");
    }

    /// Returns the pool to its initial state, with every item free.
    ///
    /// All handles that are checked out at the time of the call are reclaimed. The items keep
    /// their current values but the handles must no longer be used - they may now alias
    /// handles that future [`get()`][Self::get] calls return, and releasing them would corrupt
    /// the pool's bookkeeping.
    pub fn reset(&self) {
        let mut free = self.free.lock();
        let reclaimed = free
            .capacity()
            .checked_sub(free.available())
            .expect("available count never exceeds capacity");
        free.reset();
        drop(free);

        debug!(pool = %self.name, reclaimed, "pool reset");
    }

    /// Whether the handle was issued by this pool and points to the item its index designates.
    fn owns(&self, handle: RawPooled<T>) -> bool {
        handle.pool_id == self.id
            && self
                .items
                .get(handle.index())
                .is_some_and(|cell| ptr::eq(cell.get(), handle.ptr().as_ptr()))
    }

    fn item_ptr(&self, index: usize) -> NonNull<T> {
        let cell = self
            .items
            .get(index)
            .expect("the free ring only ever holds indices of existing items");

        // UnsafeCell<T> has the same in-memory representation as T.
        NonNull::from(cell).cast()
    }
}

// SAFETY: Items are only ever accessed through handles, and the ring hands out each item to at
// most one holder at a time (subject to the caller upholding the handle discipline, which is
// what the `unsafe` on handle dereferencing is for). A holder on any thread may mutate its
// item, so the items must be `Send`. The bookkeeping is guarded by the mutex.
unsafe impl<T: Send> Sync for RawPool<T> {}

impl<T> fmt::Display for RawPool<T> {
    #[cfg_attr(test, mutants::skip)] // Diagnostic output only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let free = self.free.lock();

        let tag = if free.is_full() {
            "[FULL] "
        } else if free.is_empty() {
            "[EMPTY] "
        } else {
            ""
        };

        write!(
            f,
            "<{} {tag}cap={}, free={} wr={} rd={}>",
            self.name,
            free.capacity(),
            free.available(),
            free.write_cursor(),
            free.read_cursor()
        )
    }
}

impl<T> fmt::Debug for RawPool<T> {
    #[cfg_attr(test, mutants::skip)] // Diagnostic output only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let free = self.free.lock();

        f.debug_struct(type_name::<Self>())
            .field("name", &self.name)
            .field("capacity", &free.capacity())
            .field("available", &free.available())
            .field("write_cursor", &free.write_cursor())
            .field("read_cursor", &free.read_cursor())
            .finish_non_exhaustive()
    }
}

/// A handle to an item checked out from a [`RawPool`].
///
/// The handle is a plain pointer with an index attached. It is `Copy` and does not borrow the
/// pool, so the compiler cannot help you use it correctly:
///
/// * The pointer is valid for as long as the pool is alive.
/// * The pool considers the item yours until you [`put()`][RawPool::put] it back or the pool
///   is [`reset()`][RawPool::reset]. It will not hand the same item to anyone else in the
///   meantime, so you may create exclusive references to it.
/// * After the item is released, any copies of the handle you kept must no longer be used.
pub struct RawPooled<T> {
    pool_id: u64,
    index: usize,
    ptr: NonNull<T>,
}

impl<T> RawPooled<T> {
    #[must_use]
    fn new(pool_id: u64, index: usize, ptr: NonNull<T>) -> Self {
        Self {
            pool_id,
            index,
            ptr,
        }
    }

    /// The index of the item in the pool's storage, in `0..capacity`.
    #[must_use]
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// A pointer to the item.
    ///
    /// The pointer is valid for reads and writes for as long as the pool is alive, though
    /// creating references from it is subject to the handle discipline described on the type.
    #[must_use]
    #[inline]
    pub fn ptr(&self) -> NonNull<T> {
        self.ptr
    }

    /// Creates a shared reference to the item.
    ///
    /// # Safety
    ///
    /// The pool must outlive the returned reference and the handle must not have been released.
    /// No exclusive reference to the same item may exist while the returned one is in use.
    #[must_use]
    #[inline]
    pub unsafe fn as_ref(&self) -> &T {
        // SAFETY: Forwarding guarantees from the caller.
        unsafe { self.ptr.as_ref() }
    }

    /// Creates an exclusive reference to the item.
    ///
    /// # Safety
    ///
    /// The pool must outlive the returned reference and the handle must not have been released.
    /// No other reference to the same item may exist while the returned one is in use,
    /// including references created via copies of this handle.
    #[must_use]
    #[inline]
    pub unsafe fn as_mut(&mut self) -> &mut T {
        // SAFETY: Forwarding guarantees from the caller.
        unsafe { self.ptr.as_mut() }
    }
}

impl<T> Clone for RawPooled<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for RawPooled<T> {}

impl<T> PartialEq for RawPooled<T> {
    fn eq(&self, other: &Self) -> bool {
        self.pool_id == other.pool_id && self.index == other.index && self.ptr == other.ptr
    }
}

impl<T> Eq for RawPooled<T> {}

impl<T> fmt::Debug for RawPooled<T> {
    #[cfg_attr(test, mutants::skip)] // Diagnostic output only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("pool_id", &self.pool_id)
            .field("index", &self.index)
            .field("ptr", &self.ptr)
            .finish()
    }
}

// SAFETY: The handle is a pointer to a `T` that the holder has exclusive use of, so moving the
// handle to another thread moves the right to mutate the `T` there.
unsafe impl<T: Send> Send for RawPooled<T> {}

// SAFETY: Sharing the handle only allows creating shared references via `as_ref()`.
unsafe impl<T: Sync> Sync for RawPooled<T> {}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::Cell;
    use std::collections::HashSet;
    use std::thread;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;
    use crate::Error;

    assert_impl_all!(RawPool<u32>: Send, Sync);
    assert_impl_all!(RawPool<Cell<u32>>: Send, Sync);
    assert_not_impl_any!(RawPool<*const u32>: Send, Sync);

    assert_impl_all!(RawPooled<u32>: Send, Sync, Copy);
    assert_impl_all!(RawPooled<Cell<u32>>: Send);
    assert_not_impl_any!(RawPooled<Cell<u32>>: Sync);

    #[test]
    fn starts_full() {
        let pool = RawPool::<u32>::new(5).unwrap();

        assert_eq!(pool.capacity(), 5);
        assert_eq!(pool.avail(), 5);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let result = RawPool::<u32>::new(0);

        assert!(matches!(result, Err(Error::ZeroCapacity)));
    }

    #[test]
    fn get_until_exhausted() {
        let pool = RawPool::<u32>::new(4).unwrap();

        let handles: Vec<_> = (0..4).map(|_| pool.get().unwrap()).collect();

        assert_eq!(pool.avail(), 0);
        assert!(pool.get().is_none());

        let distinct: HashSet<_> = handles.iter().map(|h| h.ptr()).collect();
        assert_eq!(distinct.len(), 4);

        for handle in handles {
            pool.put(handle);
        }

        assert_eq!(pool.avail(), 4);
    }

    #[test]
    fn handles_are_issued_in_storage_order() {
        let pool = RawPool::<u32>::new(3).unwrap();

        let indexes: Vec<_> = (0..3).map(|_| pool.get().unwrap().index()).collect();

        assert_eq!(indexes, vec![0, 1, 2]);
    }

    #[test]
    fn released_item_is_reused() {
        let pool = RawPool::<u32>::new(3).unwrap();

        let a = pool.get().unwrap();
        let b = pool.get().unwrap();
        let c = pool.get().unwrap();
        assert!(pool.get().is_none());

        pool.put(a);
        assert_eq!(pool.avail(), 1);

        let again = pool.get().unwrap();
        assert_eq!(again, a);
        assert_eq!(pool.avail(), 0);

        pool.put(again);
        pool.put(b);
        pool.put(c);
        assert_eq!(pool.avail(), 3);
    }

    #[test]
    fn contents_survive_release() {
        let pool = RawPool::<u32>::new(1).unwrap();

        let mut handle = pool.get().unwrap();
        // SAFETY: Only handle to the item, pool is alive.
        unsafe {
            *handle.as_mut() = 1234;
        }
        pool.put(handle);

        let handle = pool.get().unwrap();
        // SAFETY: Only handle to the item, pool is alive.
        assert_eq!(unsafe { *handle.as_ref() }, 1234);
        pool.put(handle);
    }

    #[test]
    #[should_panic]
    fn put_into_full_pool_panics() {
        let pool = RawPool::<u32>::new(2).unwrap();

        let handle = pool.get().unwrap();
        pool.put(handle);
        pool.put(handle);
    }

    #[test]
    fn put_into_full_pool_leaves_state_intact() {
        let pool = RawPool::<u32>::new(2).unwrap();
        let handle = pool.get().unwrap();
        pool.put(handle);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| pool.put(handle)));

        assert!(result.is_err());
        assert_eq!(pool.avail(), 2);
        assert_eq!(pool.get().unwrap().index(), 1);
    }

    #[test]
    #[should_panic]
    fn put_foreign_handle_panics() {
        let pool_a = RawPool::<u32>::new(2).unwrap();
        let pool_b = RawPool::<u32>::new(2).unwrap();

        let _held = pool_b.get().unwrap();
        let foreign = pool_a.get().unwrap();

        pool_b.put(foreign);
    }

    #[test]
    #[should_panic]
    fn put_foreign_zero_sized_handle_panics() {
        // Every item of every zero-sized pool lives at the same address.
        let pool_a = RawPool::<()>::new(1).unwrap();
        let pool_b = RawPool::<()>::new(1).unwrap();

        let foreign = pool_a.get().unwrap();
        let held = pool_b.get().unwrap();
        assert_eq!(foreign.ptr(), held.ptr());

        pool_b.put(foreign);
    }

    #[test]
    fn rejected_foreign_handle_leaves_state_intact() {
        let pool_a = RawPool::<()>::new(1).unwrap();
        let pool_b = RawPool::<()>::new(1).unwrap();
        let foreign = pool_a.get().unwrap();
        _ = pool_b.get().unwrap();

        let result =
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| pool_b.put(foreign)));

        assert!(result.is_err());
        assert_eq!(pool_b.avail(), 0);
        assert_eq!(pool_a.avail(), 0);
    }

    #[test]
    fn reset_reclaims_everything() {
        let pool = RawPool::<u32>::new(3).unwrap();

        let a = pool.get().unwrap();
        _ = pool.get().unwrap();
        pool.put(a);
        _ = pool.get().unwrap();

        pool.reset();

        assert_eq!(pool.avail(), 3);
        let indexes: Vec<_> = (0..3).map(|_| pool.get().unwrap().index()).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
        assert!(pool.get().is_none());
    }

    #[test]
    fn builder_initializes_items() {
        let pool = RawPool::builder()
            .capacity(3)
            .build_raw_with(|index| index * 10)
            .unwrap();

        let values: Vec<_> = (0..3)
            // SAFETY: Each handle is distinct and the pool is alive.
            .map(|_| unsafe { *pool.get().unwrap().as_ref() })
            .collect();

        assert_eq!(values, vec![0, 10, 20]);
    }

    #[test]
    fn display_reports_state() {
        let pool = RawPool::<u32>::builder()
            .capacity(2)
            .name("test_pool")
            .build_raw()
            .unwrap();

        assert_eq!(pool.to_string(), "<test_pool [FULL] cap=2, free=2 wr=0 rd=0>");

        let a = pool.get().unwrap();
        assert_eq!(pool.to_string(), "<test_pool cap=2, free=1 wr=0 rd=1>");

        let b = pool.get().unwrap();
        assert_eq!(pool.to_string(), "<test_pool [EMPTY] cap=2, free=0 wr=0 rd=0>");

        pool.put(b);
        pool.put(a);
        assert_eq!(pool.to_string(), "<test_pool [FULL] cap=2, free=2 wr=0 rd=0>");
    }

    #[test]
    fn default_name_is_type_name() {
        let pool = RawPool::<u32>::new(1).unwrap();

        assert!(pool.name().contains("RawPool"));
        assert!(pool.to_string().contains("RawPool"));
    }

    #[cfg_attr(miri, ignore)] // Too slow under Miri.
    #[test]
    fn handles_move_between_threads() {
        let pool = RawPool::<u64>::new(8).unwrap();

        thread::scope(|s| {
            for value in 0..8_u64 {
                let mut handle = pool.get().unwrap();
                let pool = &pool;

                s.spawn(move || {
                    // SAFETY: Each thread holds a distinct item, pool outlives the scope.
                    unsafe {
                        *handle.as_mut() = value;
                    }
                    pool.put(handle);
                });
            }
        });

        assert_eq!(pool.avail(), 8);
    }
}
