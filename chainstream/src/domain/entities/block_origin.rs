//! Buffer origin for tracking how a block's buffer must be released.

use std::sync::Arc;

use crate::domain::ports::BufferPool;

/// How a block obtained its buffer, which also decides how it is released.
///
/// - Heap: dropped normally
/// - DefaultPool: rented from the process-wide default pool
/// - Pool: rented from a caller-supplied pool
#[derive(Debug, Clone, Default)]
pub enum BlockOrigin {
    /// Plain heap allocation.
    #[default]
    Heap,
    /// Rented from the process-wide default pool.
    DefaultPool(Arc<dyn BufferPool>),
    /// Rented from a caller-supplied pool.
    Pool(Arc<dyn BufferPool>),
}

impl BlockOrigin {
    /// Check if the buffer came from the process-wide default pool.
    #[inline]
    pub const fn is_default_pool(&self) -> bool {
        matches!(self, BlockOrigin::DefaultPool(_))
    }

    /// Check if the buffer must be given back to some pool.
    #[inline]
    pub const fn is_rented(&self) -> bool {
        !matches!(self, BlockOrigin::Heap)
    }

    /// Hand `buffer` back to wherever it came from.
    pub(crate) fn release(&self, buffer: Vec<u8>, clear: bool) {
        match self {
            BlockOrigin::Heap => drop(buffer),
            BlockOrigin::DefaultPool(pool) | BlockOrigin::Pool(pool) => {
                pool.give_back(buffer, clear)
            }
        }
    }
}
