//! BufferPool port - Secondary (driven) port for renting block buffers.
//!
//! The domain never allocates pooled memory itself. When a pool is configured
//! every block buffer is rented through this trait and handed back through it
//! exactly once.

use core::fmt;

use crate::domain::StreamError;

/// Port for a shared byte-buffer allocator.
///
/// # Contract
///
/// - `rent(n)` returns a buffer whose `len()` is at least `n`. The whole length
///   is usable; it becomes the capacity of the block that owns it.
/// - Every rented buffer is passed to `give_back` exactly once. Blocks enforce
///   this by moving the buffer out of themselves before returning it.
/// - Implementations are shared between many streams and threads, so they must
///   be internally synchronized.
///
/// ```text
/// ┌─────────────────────┐
/// │   Domain Layer      │
/// │ (MemoryBlock,       │
/// │  BlockChain)        │
/// └──────────┬──────────┘
///            │ rents from / gives back to
///            ▼
/// ┌─────────────────────┐
/// │  BufferPool Port    │  ◄── This trait
/// └──────────┬──────────┘
///            │ implemented by
///            ▼
/// ┌─────────────────────┐
/// │  Adapter Layer      │
/// │ (SharedBufferPool)  │
/// └─────────────────────┘
/// ```
pub trait BufferPool: Send + Sync {
    /// Rent a buffer of at least `minimum_length` bytes.
    ///
    /// The contents of the returned buffer are unspecified; a previous tenant's
    /// data may still be present.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::OutOfMemory`] if no buffer can be provided.
    fn rent(&self, minimum_length: usize) -> Result<Vec<u8>, StreamError>;

    /// Give a previously rented buffer back to the pool.
    ///
    /// When `clear` is true the pool zeroes the buffer before reusing it.
    fn give_back(&self, buffer: Vec<u8>, clear: bool);
}

impl fmt::Debug for dyn BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn BufferPool")
    }
}
