//! Domain layer - block, chain and stream contracts with no runtime dependencies.
//!
//! The domain layer contains:
//! - **Entities**: Objects with identity (`MemoryBlock`, `BlockOrigin`)
//! - **Value Objects**: Validated data (`BlockId`, `SeekFrom`, `StreamConfig`)
//! - **Domain Services**: Chain navigation and aggregation (`BlockChain`)
//! - **Ports**: Interfaces to the outside world (`BufferPool`, `ByteStream`)
//! - **Domain Errors**: `StreamError` and `Rejected`
//!
//! # Hexagonal Architecture
//!
//! ```text
//!     ┌──────────────────────────────────┐
//!     │      Domain Layer (Core)         │
//!     │                                  │
//!     │  ┌────────────────────────────┐  │
//!     │  │  Entities & Value Objects  │  │
//!     │  │  - MemoryBlock, BlockId    │  │
//!     │  └────────────────────────────┘  │
//!     │              ▲                   │
//!     │              │                   │
//!     │  ┌────────────────────────────┐  │
//!     │  │    Domain Services         │  │
//!     │  │    - BlockChain            │  │
//!     │  └────────────────────────────┘  │
//!     │              │                   │
//!     │              ▼                   │
//!     │  ┌────────────────────────────┐  │
//!     │  │    Ports (Interfaces)      │  │
//!     │  │    - BufferPool            │  │
//!     │  │    - ByteStream            │  │
//!     │  └────────────────────────────┘  │
//!     └──────────────────────────────────┘
//!                    ▲
//!                    │ implemented by
//!                    │
//!     ┌──────────────────────────────────┐
//!     │  Adapters & Infrastructure       │
//!     │  - SharedBufferPool              │
//!     │  - ChainStream, ReadOnlyStream   │
//!     └──────────────────────────────────┘
//! ```
//!
//! # Examples
//!
//! ```
//! use chainstream::domain::{BlockChain, MemoryBlock};
//!
//! let mut chain = BlockChain::from_slice(b"abcdef", 4).unwrap();
//! let head = chain.head().unwrap();
//! let tail = chain.end_of_chain(head);
//!
//! assert_eq!(chain.block_count(), 2);
//! assert_eq!(chain.get(tail).unwrap().data(), b"ef");
//!
//! chain.push_back(MemoryBlock::from_vec(b"gh".to_vec()));
//! assert_eq!(chain.to_vec(), b"abcdefgh");
//! ```

pub mod entities;
pub mod value_objects;
pub mod ports;
pub mod error;

mod block_chain;

pub use entities::{BlockOrigin, MemoryBlock};
pub use value_objects::{
    BlockAllocation, BlockId, DEFAULT_BLOCK_SIZE, SeekFrom, StreamConfig, StreamConfigError,
};
pub use ports::{BufferPool, ByteStream, DEFAULT_COPY_BUFFER_SIZE};
pub use error::{Rejected, StreamError};
pub use block_chain::{BlockChain, Iter};
