//! Value objects for the domain layer.
//!
//! Value objects are small, validated data types: block identifiers, seek
//! origins and the stream configuration.

mod block_id;
mod seek_from;
mod stream_config;

pub use block_id::BlockId;
pub use seek_from::SeekFrom;
pub use stream_config::{
    BlockAllocation, DEFAULT_BLOCK_SIZE, StreamConfig, StreamConfigError,
};
