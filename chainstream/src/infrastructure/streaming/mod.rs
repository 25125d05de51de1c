//! Streams over block chains.
//!
//! This module provides the chained stream engine and the read-only view,
//! plus the embedded_io_async and `std::io` trait implementations that let
//! them plug into other I/O code.
//!
//! # Send/Sync Properties
//!
//! Both streams are `Send + Sync` whenever what they wrap is. Sharing a
//! [`ChainStream`] between tasks only makes sense when it is synchronized;
//! otherwise overlapping calls fail with `StreamError::Contended`.

mod chain_stream;
mod embedded_io_impl;
mod exclusive;
mod read_only;
mod state;
mod std_io_impl;

pub use chain_stream::ChainStream;
pub use read_only::ReadOnlyStream;

pub use crate::domain::SeekFrom;
