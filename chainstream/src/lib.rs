//! Chained in-memory byte streams with hexagonal architecture.
//!
//! This crate provides a growable, seekable byte stream stored in a linked
//! chain of memory blocks instead of one contiguous buffer. Blocks come from
//! the heap or from a shared buffer pool, and whole chains can be attached,
//! detached, appended or spliced into a stream without copying.
//!
//! # Architecture
//!
//! The crate is organized into three layers:
//!
//! ## Domain Layer (`domain`)
//! Block and chain logic with no runtime dependencies:
//! - **Entities**: `MemoryBlock` and its `BlockOrigin`
//! - **Value Objects**: `BlockId`, `SeekFrom`, `StreamConfig`
//! - **Services**: `BlockChain` navigation and aggregation
//! - **Ports**: `BufferPool` and `ByteStream` interfaces
//!
//! ## Adapter Layer (`adapters`)
//! - **`SharedBufferPool`**: Bucketed, thread-safe `BufferPool`
//! - **`default_pool`**: The lazily created process-wide pool
//!
//! ## Infrastructure Layer (`infrastructure`)
//! - **`ChainStream`**: The stream engine, sync and async
//! - **`ReadOnlyStream`**: Read-only view over any `ByteStream`
//! - embedded_io_async and `std::io` trait implementations
//!
//! # Quick Start
//!
//! ## Heap-Allocated Blocks
//!
//! ```
//! use chainstream::{ChainStream, SeekFrom};
//!
//! let stream = ChainStream::with_block_size(1024).unwrap();
//! stream.write(&[7u8; 3000]).unwrap();
//! assert_eq!(stream.block_count().unwrap(), 3);
//!
//! stream.seek(SeekFrom::End(-10)).unwrap();
//! let mut tail = [0u8; 16];
//! assert_eq!(stream.read(&mut tail).unwrap(), 10);
//! ```
//!
//! ## Pooled Blocks
//!
//! ```
//! use std::sync::Arc;
//! use chainstream::{ChainStream, SharedBufferPool};
//!
//! let pool = Arc::new(SharedBufferPool::new());
//! let stream = ChainStream::with_pool(pool.clone());
//! stream.write(b"rented").unwrap();
//! assert_eq!(pool.statistics().outstanding, 1);
//!
//! drop(stream);
//! assert_eq!(pool.statistics().outstanding, 0);
//! ```
//!
//! ## Async With Cancellation
//!
//! ```
//! use chainstream::{ChainStream, StreamConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # futures::executor::block_on(async {
//! let stream = ChainStream::with_config(StreamConfig::default().synchronized(true));
//! let cancel = CancellationToken::new();
//! stream.write_async(b"async", &cancel).await.unwrap();
//!
//! cancel.cancel();
//! assert!(stream.flush_async(&cancel).await.is_err());
//! # });
//! ```
//!
//! # Features
//!
//! - `log`: Enable logging through the `log` facade (default)

#![warn(missing_docs)]
#![allow(async_fn_in_trait)]

mod log_macros;

// Core layers
pub mod domain;
pub mod adapters;
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::{
    BlockAllocation, BlockChain, BlockId, BlockOrigin, BufferPool, ByteStream,
    DEFAULT_BLOCK_SIZE, DEFAULT_COPY_BUFFER_SIZE, MemoryBlock, Rejected, SeekFrom,
    StreamConfig, StreamConfigError, StreamError,
};

pub use adapters::{PoolStats, SharedBufferPool, default_pool, install_default_pool, presets};

// Infrastructure layer exports
pub use infrastructure::streaming::{ChainStream, ReadOnlyStream};

// Re-export embedded_io_async and the cancellation token for convenience
pub use embedded_io_async;
pub use tokio_util::sync::CancellationToken;
