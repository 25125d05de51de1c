//! Infrastructure layer - streams built on the domain.
//!
//! This module provides the stream engine and decorators on top of block
//! chains, adding sync and async Read/Write/Seek for integration with other
//! I/O code.

pub mod streaming;
