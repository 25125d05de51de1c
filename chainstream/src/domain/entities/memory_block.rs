//! MemoryBlock entity - one fixed-capacity buffer node of a chain.

use std::sync::Arc;

use super::BlockOrigin;
use crate::{
    adapters::default_pool,
    domain::{BlockAllocation, StreamError, ports::BufferPool},
    log_macros::{log_warn, trace},
};

/// A single fixed-capacity byte buffer.
///
/// The block tracks how many bytes at the front of its buffer hold valid data
/// (`len`, always `<= capacity`) and remembers where the buffer came from so it
/// can be handed back there exactly once. Links to neighbouring blocks are kept
/// by the owning [`BlockChain`](crate::domain::BlockChain), not by the block.
///
/// The buffer is released by [`dispose`](Self::dispose) or, failing that, when
/// the block is dropped.
///
/// # Examples
///
/// ```
/// use chainstream::domain::MemoryBlock;
///
/// let mut block = MemoryBlock::new(16).unwrap();
/// block.buffer_mut()[..3].copy_from_slice(b"abc");
/// block.set_len(3).unwrap();
/// assert_eq!(block.data(), b"abc");
/// ```
pub struct MemoryBlock {
    buffer: Option<Vec<u8>>,
    capacity: usize,
    len: usize,
    origin: BlockOrigin,
    clear_on_release: bool,
}

impl MemoryBlock {
    /// Heap-allocate a zeroed block of exactly `capacity` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::OutOfMemory`] if the allocation fails.
    pub fn new(capacity: usize) -> Result<Self, StreamError> {
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(capacity)
            .map_err(|_| StreamError::OutOfMemory {
                requested: capacity,
            })?;
        buffer.resize(capacity, 0);

        Ok(Self::from_parts(buffer, 0, BlockOrigin::Heap, false))
    }

    /// Wrap an existing vector as a full heap block.
    ///
    /// The block's capacity and length both equal `data.len()`.
    pub fn from_vec(data: Vec<u8>) -> Self {
        let len = data.len();
        Self::from_parts(data, len, BlockOrigin::Heap, false)
    }

    /// Rent a block of at least `capacity` bytes.
    ///
    /// Rents from `pool` when given, otherwise from the process-wide
    /// [`default_pool`]. The granted length becomes the block's capacity. When
    /// `clear` is set the rented buffer is zeroed, and the pool is asked to
    /// clear it again when the block is released.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::OutOfMemory`] if the pool cannot provide a buffer.
    pub fn pooled(
        capacity: usize,
        pool: Option<Arc<dyn BufferPool>>,
        clear: bool,
    ) -> Result<Self, StreamError> {
        let (pool, from_default) = match pool {
            Some(pool) => (pool, false),
            None => (default_pool(), true),
        };

        let mut buffer = pool.rent(capacity)?;
        let origin = if from_default {
            BlockOrigin::DefaultPool(pool)
        } else {
            BlockOrigin::Pool(pool)
        };
        if buffer.len() < capacity {
            log_warn!(
                "pool granted {} bytes for a rent of {}",
                buffer.len(),
                capacity
            );
            origin.release(buffer, false);
            return Err(StreamError::OutOfMemory {
                requested: capacity,
            });
        }
        if clear {
            buffer.fill(0);
        }

        trace!("rented block of {} bytes (requested {})", buffer.len(), capacity);
        Ok(Self::from_parts(buffer, 0, origin, clear))
    }

    /// Allocate a block according to a stream's allocation strategy.
    pub(crate) fn allocate(
        allocation: &BlockAllocation,
        capacity: usize,
        clear: bool,
    ) -> Result<Self, StreamError> {
        match allocation {
            BlockAllocation::Heap => Self::new(capacity),
            BlockAllocation::DefaultPool => Self::pooled(capacity, None, clear),
            BlockAllocation::Pool(pool) => Self::pooled(capacity, Some(pool.clone()), clear),
        }
    }

    fn from_parts(buffer: Vec<u8>, len: usize, origin: BlockOrigin, clear: bool) -> Self {
        Self {
            capacity: buffer.len(),
            buffer: Some(buffer),
            len,
            origin,
            clear_on_release: clear,
        }
    }

    /// Get the capacity in bytes.
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the number of valid bytes.
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Check if the block holds no valid bytes.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of bytes between the valid data and the capacity.
    #[inline]
    pub const fn spare(&self) -> usize {
        self.capacity - self.len
    }

    /// Set the number of valid bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::OutOfRange`] if `len` exceeds the capacity.
    pub fn set_len(&mut self, len: usize) -> Result<(), StreamError> {
        if len > self.capacity {
            return Err(StreamError::out_of_range("len", len as i128));
        }
        self.len = len;
        Ok(())
    }

    /// Get the buffer origin.
    #[inline]
    pub const fn origin(&self) -> &BlockOrigin {
        &self.origin
    }

    /// Check if the buffer was rented from the process-wide default pool.
    #[inline]
    pub const fn is_pooled(&self) -> bool {
        self.origin.is_default_pool()
    }

    /// The caller-supplied pool the buffer was rented from, if any.
    pub fn pool(&self) -> Option<&Arc<dyn BufferPool>> {
        match &self.origin {
            BlockOrigin::Pool(pool) => Some(pool),
            _ => None,
        }
    }

    /// Check if the buffer has already been released.
    #[inline]
    pub const fn is_released(&self) -> bool {
        self.buffer.is_none()
    }

    /// The valid bytes, `[0, len)`.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.buffer()[..self.len.min(self.buffer().len())]
    }

    /// The whole buffer, `[0, capacity)`.
    ///
    /// Empty once the block has been released.
    #[inline]
    pub fn buffer(&self) -> &[u8] {
        self.buffer.as_deref().unwrap_or(&[])
    }

    /// Mutable access to the whole buffer, `[0, capacity)`.
    ///
    /// Empty once the block has been released.
    #[inline]
    pub fn buffer_mut(&mut self) -> &mut [u8] {
        self.buffer.as_deref_mut().unwrap_or(&mut [])
    }

    /// Append as much of `data` as fits in the spare capacity. Returns the count copied.
    pub(crate) fn extend_from_slice(&mut self, data: &[u8]) -> usize {
        let start = self.len;
        let count = data.len().min(self.spare());
        self.buffer_mut()[start..start + count].copy_from_slice(&data[..count]);
        self.len = start + count;
        count
    }

    /// Append up to `count` zero bytes. Returns the count appended.
    ///
    /// The spare region is overwritten explicitly since rented buffers may be dirty.
    pub(crate) fn extend_zeroed(&mut self, count: usize) -> usize {
        let start = self.len;
        let count = count.min(self.spare());
        self.buffer_mut()[start..start + count].fill(0);
        self.len = start + count;
        count
    }

    /// Shorten the valid region to at most `len` bytes.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.len = self.len.min(len);
    }

    /// Drop the first `count` valid bytes, moving the rest to the front.
    pub(crate) fn discard_front(&mut self, count: usize) {
        let count = count.min(self.len);
        let len = self.len;
        self.buffer_mut().copy_within(count..len, 0);
        self.len = len - count;
    }

    /// Release the buffer back to its origin.
    ///
    /// Heap buffers are freed, rented buffers are given back to their pool.
    /// Calling this more than once has no further effect.
    pub fn dispose(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            trace!(
                "releasing block of {} bytes (rented: {})",
                self.capacity,
                self.origin.is_rented()
            );
            self.len = 0;
            self.capacity = 0;
            self.origin.release(buffer, self.clear_on_release);
        }
    }
}

impl Drop for MemoryBlock {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl core::fmt::Debug for MemoryBlock {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MemoryBlock")
            .field("capacity", &self.capacity)
            .field("len", &self.len)
            .field("origin", &self.origin)
            .field("released", &self.is_released())
            .finish()
    }
}
