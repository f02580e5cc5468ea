use std::any::type_name;
use std::borrow::{Borrow, BorrowMut};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use crate::{RawPool, RawPooled};

/// An item checked out from a [`Pool`][crate::Pool].
///
/// The handle grants exclusive access to the item via [`Deref`] and [`DerefMut`] and borrows
/// the pool, so the pool cannot be reset or dropped while the item is checked out.
///
/// Dropping the handle returns the item to the pool. [`Pool::put()`][crate::Pool::put] does
/// the same thing explicitly.
///
/// The item keeps whatever value the previous holder left in it. Reset it before use if
/// that matters.
pub struct Pooled<'p, T> {
    inner: RawPooled<T>,
    pool: &'p RawPool<T>,
}

impl<'p, T> Pooled<'p, T> {
    #[must_use]
    pub(crate) fn new(inner: RawPooled<T>, pool: &'p RawPool<T>) -> Self {
        Self { inner, pool }
    }

    /// The index of the item in the pool's storage, in `0..capacity`.
    #[must_use]
    #[inline]
    pub fn index(&self) -> usize {
        self.inner.index()
    }

    /// A pointer to the item.
    ///
    /// The pointer remains valid for as long as the pool is alive. It may only be used to
    /// access the item while this handle exists and is not itself being used to access it.
    #[must_use]
    #[inline]
    pub fn ptr(&self) -> NonNull<T> {
        self.inner.ptr()
    }

    #[must_use]
    pub(crate) fn pool(&self) -> &'p RawPool<T> {
        self.pool
    }
}

impl<T> Deref for Pooled<'_, T> {
    type Target = T;

    #[inline]
    #[cfg_attr(test, mutants::skip)] // Every mutation is unviable.
    fn deref(&self) -> &Self::Target {
        // SAFETY: The pool hands each item to at most one `Pooled` at a time and the handle
        // borrows the pool, which keeps the storage alive and rules out a reset.
        unsafe { self.inner.as_ref() }
    }
}

impl<T> DerefMut for Pooled<'_, T> {
    #[inline]
    #[cfg_attr(test, mutants::skip)] // Every mutation is unviable.
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: As above, plus we borrow the handle exclusively for the lifetime of the
        // returned reference.
        unsafe { self.inner.as_mut() }
    }
}

impl<T> Borrow<T> for Pooled<'_, T> {
    #[inline]
    fn borrow(&self) -> &T {
        self
    }
}

impl<T> BorrowMut<T> for Pooled<'_, T> {
    #[inline]
    fn borrow_mut(&mut self) -> &mut T {
        self
    }
}

impl<T> AsRef<T> for Pooled<'_, T> {
    #[inline]
    fn as_ref(&self) -> &T {
        self
    }
}

impl<T> AsMut<T> for Pooled<'_, T> {
    #[inline]
    fn as_mut(&mut self) -> &mut T {
        self
    }
}

impl<T> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        self.pool.put(self.inner);
    }
}

#[cfg_attr(coverage_nightly, coverage(off))] // No API contract to test.
impl<T: fmt::Debug> fmt::Debug for Pooled<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("index", &self.index())
            .field("value", &**self)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::Cell;
    use std::sync::{Arc, Mutex};

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;
    use crate::Pool;

    assert_impl_all!(Pooled<'static, u32>: Send, Sync);
    assert_impl_all!(Pooled<'static, Cell<u32>>: Send);
    assert_not_impl_any!(Pooled<'static, Cell<u32>>: Sync);

    // This is a unique handle, it cannot be cloneable/copyable.
    assert_not_impl_any!(Pooled<'static, u32>: Clone, Copy);

    // We must have a destructor because we need to return the item on drop.
    assert_impl_all!(Pooled<'static, u32>: Drop);

    #[test]
    fn deref_reads_and_writes_item() {
        let pool = Pool::<String>::new(1).unwrap();

        let mut item = pool.get().unwrap();
        item.push_str("hello");

        assert_eq!(item.as_str(), "hello");
        assert_eq!(item.len(), 5);
    }

    #[test]
    fn drop_returns_item() {
        let pool = Pool::<u32>::new(2).unwrap();

        let item = pool.get().unwrap();
        assert_eq!(pool.avail(), 1);

        drop(item);
        assert_eq!(pool.avail(), 2);
    }

    #[test]
    fn borrow_traits_reach_item() {
        let pool = Pool::<Vec<u8>>::new(1).unwrap();
        let mut item = pool.get().unwrap();

        BorrowMut::<Vec<u8>>::borrow_mut(&mut item).push(1);
        AsMut::<Vec<u8>>::as_mut(&mut item).push(2);

        assert_eq!(Borrow::<Vec<u8>>::borrow(&item), &vec![1, 2]);
        assert_eq!(AsRef::<Vec<u8>>::as_ref(&item), &vec![1, 2]);
    }

    #[test]
    fn ptr_points_at_item() {
        let pool = Pool::<u32>::new(1).unwrap();
        let mut item = pool.get().unwrap();
        *item = 99;

        // SAFETY: The handle is alive and not used for access while we read.
        let value = unsafe { *item.ptr().as_ptr() };

        assert_eq!(value, 99);
    }

    #[test]
    fn item_contents_are_dropped_with_pool() {
        let tracker = Arc::new(Mutex::new(()));

        {
            let pool = Pool::builder()
                .capacity(3)
                .build_with(|_| Arc::clone(&tracker))
                .unwrap();

            let _item = pool.get().unwrap();
            assert_eq!(Arc::strong_count(&tracker), 4);
        }

        assert_eq!(Arc::strong_count(&tracker), 1);
    }
}
