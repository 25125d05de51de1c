//! Ports define the interfaces between the domain and the outside world.
//!
//! - **Secondary (driven) port**: [`BufferPool`], the allocator the domain
//!   rents block buffers from.
//! - **Primary (driving) port**: [`ByteStream`], the stream contract the
//!   infrastructure layer exposes to application code.

mod buffer_pool;
mod byte_stream;

pub use buffer_pool::BufferPool;
pub use byte_stream::{ByteStream, DEFAULT_COPY_BUFFER_SIZE};

pub(crate) use byte_stream::check_copy;
