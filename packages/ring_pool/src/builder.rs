use std::alloc::Layout;
use std::any::type_name;
use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;

use crate::{Error, Pool, RawPool, Result};

/// Builder for creating an instance of [`Pool`] or [`RawPool`].
///
/// The capacity must always be set. Everything else is optional.
///
/// # Examples
///
/// ```
/// use ring_pool::Pool;
///
/// let pool = Pool::builder()
///     .capacity(16)
///     .name("frame_buffers")
///     .build_with(|_| Vec::<u8>::with_capacity(4096))?;
///
/// assert_eq!(pool.capacity(), 16);
/// # Ok::<(), ring_pool::Error>(())
/// ```
#[must_use]
pub struct PoolBuilder<T> {
    capacity: usize,
    name: Option<Cow<'static, str>>,

    _item: PhantomData<T>,
}

impl<T> fmt::Debug for PoolBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("capacity", &self.capacity)
            .field("name", &self.name)
            .finish()
    }
}

impl<T> PoolBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            capacity: 0,
            name: None,
            _item: PhantomData,
        }
    }

    /// Sets the number of items the pool will manage. This is required - building a pool
    /// without setting a non-zero capacity fails.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets a name for the pool. The name identifies the pool in log events and in its
    /// `Display` output. If not set, the type name of the pool is used.
    ///
    /// # Examples
    ///
    /// ```
    /// use ring_pool::Pool;
    ///
    /// let pool = Pool::<u32>::builder().capacity(1).name("ids").build()?;
    ///
    /// assert_eq!(pool.to_string(), "<ids [FULL] cap=1, free=1 wr=0 rd=0>");
    /// # Ok::<(), ring_pool::Error>(())
    /// ```
    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builds a [`Pool`] with every item initialized to `T::default()`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ZeroCapacity`] if no capacity was set and [`Error::CapacityOverflow`]
    /// if the storage for the requested number of items cannot be allocated as a single block.
    pub fn build(self) -> Result<Pool<T>>
    where
        T: Default,
    {
        self.build_with(|_| T::default())
    }

    /// Builds a [`Pool`] with every item initialized by `init`, which receives the index of
    /// the item being initialized.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ZeroCapacity`] if no capacity was set and [`Error::CapacityOverflow`]
    /// if the storage for the requested number of items cannot be allocated as a single block.
    pub fn build_with<F>(mut self, init: F) -> Result<Pool<T>>
    where
        F: FnMut(usize) -> T,
    {
        // The raw pool would otherwise name itself after its own type.
        if self.name.is_none() {
            self.name = Some(Cow::Borrowed(type_name::<Pool<T>>()));
        }

        self.build_raw_with(init).map(Pool::from_raw)
    }

    /// Builds a [`RawPool`] with every item initialized to `T::default()`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ZeroCapacity`] if no capacity was set and [`Error::CapacityOverflow`]
    /// if the storage for the requested number of items cannot be allocated as a single block.
    pub fn build_raw(self) -> Result<RawPool<T>>
    where
        T: Default,
    {
        self.build_raw_with(|_| T::default())
    }

    /// Builds a [`RawPool`] with every item initialized by `init`, which receives the index of
    /// the item being initialized.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ZeroCapacity`] if no capacity was set and [`Error::CapacityOverflow`]
    /// if the storage for the requested number of items cannot be allocated as a single block.
    pub fn build_raw_with<F>(self, init: F) -> Result<RawPool<T>>
    where
        F: FnMut(usize) -> T,
    {
        self.validate()?;

        Ok(RawPool::new_inner(self.capacity, self.name, init))
    }

    fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::ZeroCapacity);
        }

        // Both the items and the free ring are allocated as one block each.
        if Layout::array::<T>(self.capacity).is_err()
            || Layout::array::<usize>(self.capacity).is_err()
        {
            return Err(Error::CapacityOverflow {
                capacity: self.capacity,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn default_capacity_is_rejected() {
        let result = PoolBuilder::<u32>::new().build();

        assert!(matches!(result, Err(Error::ZeroCapacity)));
    }

    #[test]
    fn huge_capacity_is_rejected() {
        let result = PoolBuilder::<u64>::new().capacity(usize::MAX).build_raw();

        assert!(matches!(
            result,
            Err(Error::CapacityOverflow {
                capacity: usize::MAX
            })
        ));
    }

    #[test]
    fn zero_sized_items_are_supported() {
        let pool = PoolBuilder::<()>::new().capacity(3).build().unwrap();

        assert_eq!(pool.capacity(), 3);
        assert_eq!(pool.avail(), 3);
    }

    #[test]
    fn name_is_applied() {
        let pool = PoolBuilder::<u8>::new()
            .capacity(1)
            .name(String::from("dynamic"))
            .build()
            .unwrap();

        assert_eq!(pool.name(), "dynamic");
    }

    #[test]
    fn safe_pool_defaults_to_its_own_type_name() {
        let pool = PoolBuilder::<u8>::new().capacity(1).build().unwrap();

        assert!(pool.name().contains("Pool<u8>"));
        assert!(!pool.name().contains("RawPool"));
    }

    #[test]
    fn init_receives_every_index() {
        let mut seen = Vec::new();

        let pool = PoolBuilder::<usize>::new()
            .capacity(4)
            .build_with(|index| {
                seen.push(index);
                index
            })
            .unwrap();

        assert_eq!(seen, vec![0, 1, 2, 3]);
        assert_eq!(pool.capacity(), 4);
    }

    #[test]
    fn debug_mentions_item_type() {
        let builder = PoolBuilder::<u16>::new().capacity(7);

        let debug = format!("{builder:?}");

        assert!(debug.contains("u16"));
        assert!(debug.contains('7'));
    }
}
