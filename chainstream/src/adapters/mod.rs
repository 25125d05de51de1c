//! Adapter layer - concrete implementations of the domain's ports.
//!
//! # Hexagonal Architecture
//!
//! ```text
//!     ┌──────────────────────────────────┐
//!     │      Domain Layer                │
//!     │  - MemoryBlock (entity)          │
//!     │  - BufferPool (port)             │
//!     └────────────┬─────────────────────┘
//!                  │
//!                  │ implements
//!                  ▼
//!     ┌──────────────────────────────────┐
//!     │      Adapter Layer               │  ◄── This module
//!     │  - SharedBufferPool              │
//!     │  - default_pool()                │
//!     └──────────────────────────────────┘
//! ```
//!
//! # Available Adapters
//!
//! - **`SharedBufferPool`**: Bucketed, thread-safe buffer pool
//! - **`default_pool`**: The process-wide pool behind `BlockAllocation::DefaultPool`

mod shared_pool;

pub use shared_pool::{
    DEFAULT_RETAINED_PER_BUCKET, PoolStats, SharedBufferPool, default_pool, install_default_pool,
};

/// Common minimum block sizes for streams.
pub mod presets {
    /// 1KB blocks, for many small streams.
    pub const BLOCK_1K: usize = 1024;

    /// 4KB blocks (the default).
    pub const BLOCK_4K: usize = 4 * 1024;

    /// 16KB blocks.
    pub const BLOCK_16K: usize = 16 * 1024;

    /// 64KB blocks.
    pub const BLOCK_64K: usize = 64 * 1024;

    /// 256KB blocks.
    pub const BLOCK_256K: usize = 256 * 1024;

    /// 1MB blocks, the largest size served from pool buckets.
    pub const BLOCK_1M: usize = 1024 * 1024;
}
