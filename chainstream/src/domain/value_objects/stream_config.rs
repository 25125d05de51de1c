//! Stream configuration value object.

use std::sync::Arc;

use crate::domain::ports::BufferPool;

/// Minimum block capacity used when none is configured (4 KiB).
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Where a stream obtains the buffers for the blocks it allocates.
#[derive(Debug, Clone, Default)]
pub enum BlockAllocation {
    /// Plain heap allocation; released blocks are simply dropped.
    #[default]
    Heap,
    /// Rent from the process-wide default pool.
    DefaultPool,
    /// Rent from a caller-supplied pool.
    Pool(Arc<dyn BufferPool>),
}

impl BlockAllocation {
    /// Whether blocks are rented from a pool rather than heap allocated.
    #[inline]
    pub fn is_pooled(&self) -> bool {
        !matches!(self, Self::Heap)
    }
}

/// Configuration for a [`ChainStream`](crate::ChainStream).
///
/// Defines how the stream grows and which capabilities it exposes:
/// - Minimum capacity of newly allocated blocks
/// - Heap or pooled allocation, and whether rented buffers are zeroed
/// - Seekability, internal synchronization and read-release policy
///
/// # Examples
///
/// ```
/// use chainstream::domain::StreamConfig;
///
/// let config = StreamConfig::new(1000)
///     .unwrap()
///     .synchronized(true)
///     .release_read_blocks(true);
/// assert_eq!(config.minimum_block_size(), 1000);
/// assert!(config.is_synchronized());
/// ```
#[derive(Debug, Clone)]
pub struct StreamConfig {
    minimum_block_size: usize,
    allocation: BlockAllocation,
    clear_buffers: bool,
    seekable: bool,
    synchronized: bool,
    release_read_blocks: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            minimum_block_size: DEFAULT_BLOCK_SIZE,
            allocation: BlockAllocation::Heap,
            clear_buffers: false,
            seekable: true,
            synchronized: false,
            release_read_blocks: false,
        }
    }
}

impl StreamConfig {
    /// Create a configuration with the given minimum block size and defaults
    /// for everything else.
    ///
    /// # Errors
    ///
    /// Returns an error if `minimum_block_size` is zero.
    pub fn new(minimum_block_size: usize) -> Result<Self, StreamConfigError> {
        if minimum_block_size == 0 {
            return Err(StreamConfigError::ZeroBlockSize);
        }

        Ok(Self {
            minimum_block_size,
            ..Self::default()
        })
    }

    /// Use the given allocation strategy for new blocks.
    pub fn allocation(mut self, allocation: BlockAllocation) -> Self {
        self.allocation = allocation;
        self
    }

    /// Rent new blocks from `pool`.
    pub fn pool(self, pool: Arc<dyn BufferPool>) -> Self {
        self.allocation(BlockAllocation::Pool(pool))
    }

    /// Zero rented buffers before use and ask the pool to clear them on return.
    pub fn clear_buffers(mut self, clear: bool) -> Self {
        self.clear_buffers = clear;
        self
    }

    /// Enable or disable `seek`, `set_length`, `position` and `length`.
    pub fn seekable(mut self, seekable: bool) -> Self {
        self.seekable = seekable;
        self
    }

    /// Serialize every operation through the stream's internal lock.
    pub fn synchronized(mut self, synchronized: bool) -> Self {
        self.synchronized = synchronized;
        self
    }

    /// Release each block as soon as reading has consumed it.
    pub fn release_read_blocks(mut self, release: bool) -> Self {
        self.release_read_blocks = release;
        self
    }

    /// Get the minimum capacity of newly allocated blocks.
    #[inline]
    pub const fn minimum_block_size(&self) -> usize {
        self.minimum_block_size
    }

    /// Get the allocation strategy.
    #[inline]
    pub const fn block_allocation(&self) -> &BlockAllocation {
        &self.allocation
    }

    /// Whether rented buffers are zeroed.
    #[inline]
    pub const fn clears_buffers(&self) -> bool {
        self.clear_buffers
    }

    /// Whether the stream is seekable.
    #[inline]
    pub const fn is_seekable(&self) -> bool {
        self.seekable
    }

    /// Whether the stream serializes callers.
    #[inline]
    pub const fn is_synchronized(&self) -> bool {
        self.synchronized
    }

    /// Whether blocks are released after being read.
    #[inline]
    pub const fn releases_read_blocks(&self) -> bool {
        self.release_read_blocks
    }
}

/// Errors that can occur when creating a StreamConfig.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamConfigError {
    /// Minimum block size is zero.
    ZeroBlockSize,
}

impl core::fmt::Display for StreamConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ZeroBlockSize => write!(f, "Minimum block size cannot be zero"),
        }
    }
}

impl core::error::Error for StreamConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_config_defaults() {
        let config = StreamConfig::default();
        assert_eq!(config.minimum_block_size(), DEFAULT_BLOCK_SIZE);
        assert!(config.is_seekable());
        assert!(!config.is_synchronized());
        assert!(!config.releases_read_blocks());
        assert!(!config.block_allocation().is_pooled());
    }

    #[test]
    fn test_stream_config_zero_block_size() {
        let result = StreamConfig::new(0);
        assert_eq!(result.unwrap_err(), StreamConfigError::ZeroBlockSize);
    }

    #[test]
    fn test_stream_config_builder() {
        let config = StreamConfig::new(512)
            .unwrap()
            .allocation(BlockAllocation::DefaultPool)
            .clear_buffers(true)
            .seekable(false);

        assert_eq!(config.minimum_block_size(), 512);
        assert!(config.block_allocation().is_pooled());
        assert!(config.clears_buffers());
        assert!(!config.is_seekable());
    }
}
