//! # Memory Pool
//!
//! A bump allocator over one fixed byte region. Space is handed out from the
//! tail and only comes back on [`MemoryPool::reset`] or when the owner
//! compacts live regions with [`MemoryPool::relocate`] + [`MemoryPool::truncate`].

use crate::error::{PoolError, PoolResult};

/// A contiguous range of bytes inside a [`MemoryPool`].
///
/// Regions are plain offsets, so they never dangle; the slot tables pair
/// them with generation counters to detect reuse.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PoolRegion {
    /// Byte offset from the start of the pool.
    pub offset: usize,
    /// Length in bytes.
    pub len: usize,
}

impl PoolRegion {
    /// One past the last byte.
    #[inline]
    #[must_use]
    pub const fn end(&self) -> usize {
        self.offset + self.len
    }

    /// True if the two regions share at least one byte.
    #[inline]
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.offset < other.end() && other.offset < self.end()
    }
}

/// A bump-pointer memory pool.
///
/// # Invariants
///
/// - `used <= capacity` at all times
/// - A failed allocation never moves `used`
///
/// # Thread Safety
///
/// Owned by the render side only. Not shared.
///
/// # Example
///
/// ```rust,ignore
/// let mut pool = MemoryPool::new(1024);
/// let region = pool.alloc(64, 2)?;
/// pool.bytes_mut(region).fill(0xFF);
/// ```
pub struct MemoryPool {
    /// The backing storage.
    storage: Box<[u8]>,
    /// Current allocation offset.
    used: usize,
    /// Allocation is refused while false.
    initialized: bool,
    /// Successful allocations since creation.
    allocations: u64,
    /// Refused allocations since creation.
    failures: u64,
}

impl MemoryPool {
    /// Creates an initialized, zeroed pool of `capacity` bytes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            storage: vec![0u8; capacity].into_boxed_slice(),
            used: 0,
            initialized: true,
            allocations: 0,
            failures: 0,
        }
    }

    /// Returns the total capacity in bytes.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Returns the bytes handed out so far.
    #[inline]
    #[must_use]
    pub const fn used(&self) -> usize {
        self.used
    }

    /// Returns the bytes left at the tail.
    #[inline]
    #[must_use]
    pub fn free(&self) -> usize {
        self.capacity() - self.used
    }

    /// True until [`Self::shutdown`] is called.
    #[inline]
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Successful allocations.
    #[inline]
    #[must_use]
    pub const fn allocations(&self) -> u64 {
        self.allocations
    }

    /// Refused allocations (every error path counts).
    #[inline]
    #[must_use]
    pub const fn failures(&self) -> u64 {
        self.failures
    }

    /// Bump-allocates `size` bytes aligned to `alignment`.
    ///
    /// # Errors
    ///
    /// - [`PoolError::NotInitialized`] after shutdown
    /// - [`PoolError::ZeroSize`] for `size == 0`
    /// - [`PoolError::BadAlignment`] unless `alignment` is a power of two
    /// - [`PoolError::Exhausted`] when the aligned request does not fit
    pub fn alloc(&mut self, size: usize, alignment: usize) -> PoolResult<PoolRegion> {
        let result = self.try_alloc(size, alignment);
        match result {
            Ok(_) => self.allocations += 1,
            Err(err) => {
                self.failures += 1;
                tracing::warn!("Memory pool allocation failed: {err}");
            }
        }
        result
    }

    fn try_alloc(&mut self, size: usize, alignment: usize) -> PoolResult<PoolRegion> {
        if !self.initialized {
            return Err(PoolError::NotInitialized);
        }
        if size == 0 {
            return Err(PoolError::ZeroSize);
        }
        if !alignment.is_power_of_two() {
            return Err(PoolError::BadAlignment(alignment));
        }

        let capacity = self.capacity();
        let aligned = align_up(self.used, alignment);
        let available = capacity.saturating_sub(aligned);
        if aligned > capacity || size > available {
            return Err(PoolError::Exhausted { requested: size, available });
        }

        self.used = aligned + size;
        Ok(PoolRegion { offset: aligned, len: size })
    }

    /// Read access to a region.
    ///
    /// # Panics
    ///
    /// Panics if the region lies outside the pool. Regions handed out by
    /// [`Self::alloc`] never do.
    #[inline]
    #[must_use]
    pub fn bytes(&self, region: PoolRegion) -> &[u8] {
        &self.storage[region.offset..region.end()]
    }

    /// Write access to a region.
    ///
    /// # Panics
    ///
    /// Panics if the region lies outside the pool.
    #[inline]
    pub fn bytes_mut(&mut self, region: PoolRegion) -> &mut [u8] {
        &mut self.storage[region.offset..region.end()]
    }

    /// Moves a region's bytes down to `new_offset` and returns the moved region.
    ///
    /// Used by compaction. The caller guarantees no other live region sits
    /// in the destination range.
    pub fn relocate(&mut self, region: PoolRegion, new_offset: usize) -> PoolRegion {
        if new_offset != region.offset {
            self.storage.copy_within(region.offset..region.end(), new_offset);
        }
        PoolRegion { offset: new_offset, len: region.len }
    }

    /// Lowers the tail to `used` after compaction. Never raises it.
    pub fn truncate(&mut self, used: usize) {
        self.used = self.used.min(used);
    }

    /// Releases every allocation at once.
    #[inline]
    pub fn reset(&mut self) {
        self.used = 0;
    }

    /// Marks the pool unusable and drops all allocations.
    pub fn shutdown(&mut self) {
        self.initialized = false;
        self.used = 0;
    }

    /// Re-enables a shut-down pool with cleared memory.
    pub fn init(&mut self) {
        self.storage.fill(0);
        self.used = 0;
        self.initialized = true;
    }
}

/// Rounds `value` up to a multiple of `alignment` (a power of two).
#[inline]
#[must_use]
pub const fn align_up(value: usize, alignment: usize) -> usize {
    (value + alignment - 1) & !(alignment - 1)
}
