//! Bucketed shared buffer pool adapter.

use std::sync::{
    Arc, OnceLock,
    atomic::{AtomicU64, AtomicUsize, Ordering},
};

use parking_lot::Mutex;

use crate::{
    domain::{BufferPool, StreamError},
    log_macros::{debug, trace},
};

/// Smallest bucket, 16 bytes.
const MIN_BUCKET_SHIFT: u32 = 4;
/// Largest pooled bucket, 1 MiB. Larger rents are allocated exactly and dropped on return.
const MAX_BUCKET_SHIFT: u32 = 20;
const BUCKET_COUNT: usize = (MAX_BUCKET_SHIFT - MIN_BUCKET_SHIFT + 1) as usize;

/// Default number of idle buffers kept per bucket.
pub const DEFAULT_RETAINED_PER_BUCKET: usize = 32;

/// Thread-safe [`BufferPool`] that reuses buffers in power-of-two buckets.
///
/// A rent of `n` bytes is served from the smallest bucket whose size is at
/// least `n`, so the granted buffer may be up to twice as large as requested.
/// Returned buffers are kept on the bucket's free list until the per-bucket
/// limit is reached; extra buffers are freed.
///
/// Requests above 1 MiB bypass the buckets entirely.
///
/// # Examples
///
/// ```
/// use chainstream::adapters::SharedBufferPool;
/// use chainstream::domain::BufferPool;
///
/// let pool = SharedBufferPool::new();
/// let buffer = pool.rent(1000).unwrap();
/// assert_eq!(buffer.len(), 1024);
///
/// pool.give_back(buffer, false);
/// assert_eq!(pool.statistics().outstanding, 0);
/// assert_eq!(pool.statistics().retained_buffers, 1);
/// ```
pub struct SharedBufferPool {
    buckets: [Mutex<Vec<Vec<u8>>>; BUCKET_COUNT],
    retained_per_bucket: usize,
    metrics: PoolMetrics,
}

/// Snapshot of a [`SharedBufferPool`]'s counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Total number of successful rents.
    pub rented: u64,
    /// Total number of buffers given back.
    pub returned: u64,
    /// Buffers currently rented and not yet given back.
    pub outstanding: usize,
    /// Rents that had to allocate a new buffer.
    pub allocations: u64,
    /// Idle buffers currently held on the free lists.
    pub retained_buffers: usize,
    /// Bytes currently held on the free lists.
    pub retained_bytes: usize,
}

impl Default for SharedBufferPool {
    fn default() -> Self {
        Self::with_retention(DEFAULT_RETAINED_PER_BUCKET)
    }
}

impl SharedBufferPool {
    /// Create an empty pool with the default retention limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty pool that keeps at most `retained_per_bucket` idle
    /// buffers in each bucket.
    pub fn with_retention(retained_per_bucket: usize) -> Self {
        Self {
            buckets: core::array::from_fn(|_| Mutex::new(Vec::new())),
            retained_per_bucket,
            metrics: PoolMetrics::default(),
        }
    }

    /// Current counters.
    pub fn statistics(&self) -> PoolStats {
        let mut retained_buffers = 0;
        let mut retained_bytes = 0;
        for bucket in &self.buckets {
            let list = bucket.lock();
            retained_buffers += list.len();
            retained_bytes += list.iter().map(Vec::len).sum::<usize>();
        }

        PoolStats {
            rented: self.metrics.rented.load(Ordering::Relaxed),
            returned: self.metrics.returned.load(Ordering::Relaxed),
            outstanding: self.metrics.outstanding.load(Ordering::Relaxed),
            allocations: self.metrics.allocations.load(Ordering::Relaxed),
            retained_buffers,
            retained_bytes,
        }
    }

    /// Free every idle buffer, returning how many bytes were released.
    pub fn trim(&self) -> usize {
        let reclaimed = self
            .buckets
            .iter()
            .map(|bucket| {
                let mut list = bucket.lock();
                let bytes = list.iter().map(Vec::len).sum::<usize>();
                list.clear();
                bytes
            })
            .sum();
        debug!("trimmed {} idle bytes from shared pool", reclaimed);
        reclaimed
    }

    fn bucket_index(length: usize) -> Option<usize> {
        let size = length.max(1 << MIN_BUCKET_SHIFT).checked_next_power_of_two()?;
        let shift = size.trailing_zeros();
        (shift <= MAX_BUCKET_SHIFT).then(|| (shift - MIN_BUCKET_SHIFT) as usize)
    }

    fn allocate(length: usize) -> Result<Vec<u8>, StreamError> {
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(length)
            .map_err(|_| StreamError::OutOfMemory { requested: length })?;
        buffer.resize(length, 0);
        Ok(buffer)
    }
}

impl BufferPool for SharedBufferPool {
    fn rent(&self, minimum_length: usize) -> Result<Vec<u8>, StreamError> {
        let buffer = match Self::bucket_index(minimum_length) {
            Some(index) => {
                let reused = self.buckets[index].lock().pop();
                match reused {
                    Some(buffer) => buffer,
                    None => {
                        self.metrics.allocations.fetch_add(1, Ordering::Relaxed);
                        Self::allocate(1 << (index as u32 + MIN_BUCKET_SHIFT))?
                    }
                }
            }
            None => {
                self.metrics.allocations.fetch_add(1, Ordering::Relaxed);
                Self::allocate(minimum_length)?
            }
        };

        self.metrics.rented.fetch_add(1, Ordering::Relaxed);
        self.metrics.outstanding.fetch_add(1, Ordering::Relaxed);
        trace!("rent {} -> {} bytes", minimum_length, buffer.len());
        Ok(buffer)
    }

    fn give_back(&self, mut buffer: Vec<u8>, clear: bool) {
        self.metrics.returned.fetch_add(1, Ordering::Relaxed);
        let _ = self
            .metrics
            .outstanding
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |prev| {
                Some(prev.saturating_sub(1))
            });

        // Only exact bucket sizes are pooled; anything else is freed.
        let Some(index) = Self::bucket_index(buffer.len())
            .filter(|index| buffer.len() == 1 << (*index as u32 + MIN_BUCKET_SHIFT))
        else {
            return;
        };

        if clear {
            buffer.fill(0);
        }
        let mut list = self.buckets[index].lock();
        if list.len() < self.retained_per_bucket {
            list.push(buffer);
        }
    }
}

impl core::fmt::Debug for SharedBufferPool {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SharedBufferPool")
            .field("retained_per_bucket", &self.retained_per_bucket)
            .field("statistics", &self.statistics())
            .finish()
    }
}

#[derive(Default)]
struct PoolMetrics {
    rented: AtomicU64,
    returned: AtomicU64,
    outstanding: AtomicUsize,
    allocations: AtomicU64,
}

static DEFAULT_POOL: OnceLock<Arc<dyn BufferPool>> = OnceLock::new();

/// The process-wide pool used by streams configured with
/// [`BlockAllocation::DefaultPool`](crate::domain::BlockAllocation::DefaultPool).
///
/// A [`SharedBufferPool`] is created on first use unless another pool was
/// installed with [`install_default_pool`] beforehand.
pub fn default_pool() -> Arc<dyn BufferPool> {
    DEFAULT_POOL
        .get_or_init(|| Arc::new(SharedBufferPool::new()))
        .clone()
}

/// Install `pool` as the process-wide default pool.
///
/// Must happen before the default pool is first used.
///
/// # Errors
///
/// Hands `pool` back if a default pool is already in place.
pub fn install_default_pool(pool: Arc<dyn BufferPool>) -> Result<(), Arc<dyn BufferPool>> {
    DEFAULT_POOL.set(pool)
}
