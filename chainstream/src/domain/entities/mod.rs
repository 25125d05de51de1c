//! Domain entities for the block chain.
//!
//! The primary entity is a [`MemoryBlock`]: one fixed-capacity buffer together
//! with how much of it holds data and where the buffer came from.

mod block_origin;
mod memory_block;

pub use block_origin::BlockOrigin;
pub use memory_block::MemoryBlock;
