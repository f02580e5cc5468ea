/// The bookkeeping half of a pool: a fixed-length ring of indices of items that are
/// currently free to be handed out.
///
/// Indices are consumed at the read cursor and returned at the write cursor. Both cursors
/// move in the same direction and wrap around at the end of the ring, so the free indices
/// always form one contiguous (possibly wrapped) run of `available` entries starting at the
/// read cursor.
///
/// The ring does not know anything about what the indices point to and does no locking of
/// its own - the owner is responsible for both.
#[derive(Debug)]
pub(crate) struct FreeRing {
    slots: Box<[usize]>,

    read: usize,
    write: usize,

    /// Number of valid entries in `slots`, starting at `read`.
    available: usize,
}

impl FreeRing {
    /// Creates a full ring holding every index in `0..capacity` in order.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub(crate) fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "a free ring must have at least one slot");

        Self {
            slots: (0..capacity).collect(),
            read: 0,
            write: 0,
            available: capacity,
        }
    }

    #[must_use]
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub(crate) fn available(&self) -> usize {
        self.available
    }

    #[must_use]
    pub(crate) fn read_cursor(&self) -> usize {
        self.read
    }

    #[must_use]
    pub(crate) fn write_cursor(&self) -> usize {
        self.write
    }

    /// Whether every index is in the ring, i.e. nothing is checked out.
    #[must_use]
    pub(crate) fn is_full(&self) -> bool {
        self.available == self.slots.len()
    }

    /// Whether the ring holds no indices, i.e. everything is checked out.
    #[must_use]
    pub(crate) fn is_empty(&self) -> bool {
        self.available == 0
    }

    /// Takes the index at the read cursor, or `None` if the ring is empty.
    pub(crate) fn pop(&mut self) -> Option<usize> {
        if self.is_empty() {
            return None;
        }

        let index = *self
            .slots
            .get(self.read)
            .expect("read cursor is always kept within the ring");

        self.read = self.advance(self.read);
        self.available = self
            .available
            .checked_sub(1)
            .expect("we checked above that the ring is not empty");

        Some(index)
    }

    /// Stores an index at the write cursor.
    ///
    /// # Panics
    ///
    /// Panics if the ring is already full. Writing into a full ring would overwrite an index
    /// that is still free, which means the same item could be handed out twice.
    pub(crate) fn push(&mut self, index: usize) {
        assert!(
            !self.is_full(),
            "free ring is already full - an index was released more than once"
        );

        *self
            .slots
            .get_mut(self.write)
            .expect("write cursor is always kept within the ring") = index;

        self.write = self.advance(self.write);
        self.available = self
            .available
            .checked_add(1)
            .expect("we checked above that the ring is not full, so this stays within capacity");
    }

    /// Returns the ring to its initial state, with every index free and in order.
    pub(crate) fn reset(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            *slot = index;
        }

        self.read = 0;
        self.write = 0;
        self.available = self.slots.len();
    }

    fn advance(&self, cursor: usize) -> usize {
        let next = cursor
            .checked_add(1)
            .expect("cursor is always below the ring length, so it cannot overflow");

        if next == self.slots.len() { 0 } else { next }
    }
}
