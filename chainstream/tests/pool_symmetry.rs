//! Buffer pool accounting tests
//!
//! Every buffer a stream rents must go back to its pool exactly once,
//! whichever way the stream lets go of it.

use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use chainstream::{
    BlockAllocation, BlockChain, BufferPool, ChainStream, SeekFrom, StreamConfig, StreamError,
};
use parking_lot::Mutex;

/// Pool that hands out dirty buffers and tracks every live one.
struct CountingPool {
    live: Mutex<HashSet<usize>>,
    rented: AtomicUsize,
    returned: AtomicUsize,
    limit: usize,
}

impl CountingPool {
    fn new() -> Arc<Self> {
        Self::with_limit(usize::MAX)
    }

    fn with_limit(limit: usize) -> Arc<Self> {
        Arc::new(Self {
            live: Mutex::new(HashSet::new()),
            rented: AtomicUsize::new(0),
            returned: AtomicUsize::new(0),
            limit,
        })
    }

    fn outstanding(&self) -> usize {
        self.live.lock().len()
    }
}

impl BufferPool for CountingPool {
    fn rent(&self, minimum_length: usize) -> Result<Vec<u8>, StreamError> {
        let mut live = self.live.lock();
        if live.len() >= self.limit {
            return Err(StreamError::OutOfMemory {
                requested: minimum_length,
            });
        }
        let buffer = vec![0xAB; minimum_length];
        live.insert(buffer.as_ptr() as usize);
        self.rented.fetch_add(1, Ordering::SeqCst);
        Ok(buffer)
    }

    fn give_back(&self, buffer: Vec<u8>, _clear: bool) {
        let known = self.live.lock().remove(&(buffer.as_ptr() as usize));
        assert!(known, "buffer returned twice or never rented");
        self.returned.fetch_add(1, Ordering::SeqCst);
    }
}

fn pooled_stream(pool: &Arc<CountingPool>, block_size: usize) -> ChainStream {
    ChainStream::with_config(StreamConfig::new(block_size).unwrap().pool(pool.clone()))
}

/// Test dropping the stream returns every block
#[test]
fn test_drop_returns_all() {
    let pool = CountingPool::new();
    let stream = pooled_stream(&pool, 16);
    stream.write(&[1u8; 100]).unwrap();
    assert_eq!(pool.outstanding(), 7);

    drop(stream);
    assert_eq!(pool.outstanding(), 0);
    assert_eq!(
        pool.rented.load(Ordering::SeqCst),
        pool.returned.load(Ordering::SeqCst)
    );
}

/// Test close returns every block and a later drop returns nothing more
#[test]
fn test_close_returns_all() {
    let pool = CountingPool::new();
    let stream = pooled_stream(&pool, 16);
    stream.write(&[1u8; 40]).unwrap();

    stream.close().unwrap();
    assert_eq!(pool.outstanding(), 0);
    let returned = pool.returned.load(Ordering::SeqCst);

    drop(stream);
    assert_eq!(pool.returned.load(Ordering::SeqCst), returned);
}

/// Test a detached chain keeps its blocks until the caller drops it
#[test]
fn test_detach_then_drop() {
    let pool = CountingPool::new();
    let stream = pooled_stream(&pool, 8);
    stream.write(b"detached content").unwrap();

    let chain = stream.detach_buffer().unwrap().unwrap();
    drop(stream);
    assert_eq!(pool.outstanding(), 2);

    drop(chain);
    assert_eq!(pool.outstanding(), 0);
}

/// Test reading to the end with read-release returns every block as it is consumed
#[test]
fn test_release_read_blocks() {
    let pool = CountingPool::new();
    let config = StreamConfig::new(10)
        .unwrap()
        .pool(pool.clone())
        .release_read_blocks(true);
    let stream = ChainStream::with_config(config);
    stream.write(&(0..45u8).collect::<Vec<_>>()).unwrap();
    stream.set_position(0).unwrap();
    assert_eq!(pool.outstanding(), 5);

    let mut buf = [0u8; 25];
    assert_eq!(stream.read(&mut buf).unwrap(), 25);
    assert_eq!(pool.outstanding(), 3);

    // Released bytes can no longer be reached.
    assert!(matches!(
        stream.seek(SeekFrom::Start(5)),
        Err(StreamError::Released { .. })
    ));
    assert_eq!(stream.seek(SeekFrom::Start(20)).unwrap(), 20);
    assert_eq!(stream.read(&mut buf).unwrap(), 25);
    assert_eq!(&buf[..], &(20..45u8).collect::<Vec<_>>()[..]);

    assert_eq!(stream.read(&mut buf).unwrap(), 0);
    assert_eq!(pool.outstanding(), 0);

    // The stream keeps working after everything was released.
    stream.write(b"more").unwrap();
    assert_eq!(stream.length().unwrap(), 49);
    drop(stream);
    assert_eq!(pool.outstanding(), 0);
}

/// Test shrinking returns the blocks past the new end
#[test]
fn test_shrink_returns_blocks() {
    let pool = CountingPool::new();
    let stream = pooled_stream(&pool, 10);
    stream.write(&[7u8; 100]).unwrap();
    assert_eq!(pool.outstanding(), 10);

    stream.set_length(31).unwrap();
    assert_eq!(pool.outstanding(), 4);

    stream.set_length(0).unwrap();
    assert_eq!(pool.outstanding(), 0);
}

/// Test dirty pool buffers never leak their old bytes into the stream
#[test]
fn test_dirty_buffers_read_as_zeros() {
    let pool = CountingPool::new();
    let stream = pooled_stream(&pool, 32);
    stream.write(b"abc").unwrap();

    stream.set_length(100).unwrap();
    let content = stream.to_vec().unwrap();
    assert_eq!(&content[..3], b"abc");
    assert!(content[3..].iter().all(|&b| b == 0));

    stream.seek(SeekFrom::Start(150)).unwrap();
    stream.write(b"z").unwrap();
    let content = stream.to_vec().unwrap();
    assert_eq!(content.len(), 151);
    assert!(content[100..150].iter().all(|&b| b == 0));
}

/// Test an exhausted pool fails the write and leaves the stream untouched
#[test]
fn test_exhausted_pool() {
    let pool = CountingPool::with_limit(3);
    let stream = pooled_stream(&pool, 10);
    stream.write(&[1u8; 15]).unwrap();
    assert_eq!(pool.outstanding(), 2);

    let result = stream.write(&[2u8; 30]);
    assert!(matches!(result, Err(StreamError::OutOfMemory { .. })));
    assert_eq!(stream.length().unwrap(), 15);
    assert_eq!(stream.position().unwrap(), 15);
    assert_eq!(stream.to_vec().unwrap(), vec![1u8; 15]);
    assert_eq!(pool.outstanding(), 2);

    // An overwrite that needs no new block still works.
    stream.set_position(0).unwrap();
    stream.write(&[3u8; 20]).unwrap();
    assert_eq!(pool.outstanding(), 2);
    assert_eq!(stream.length().unwrap(), 20);
}

/// Test a failing split during inject hands the chain back unchanged
#[test]
fn test_inject_out_of_memory() {
    let pool = CountingPool::with_limit(1);
    let stream = pooled_stream(&pool, 10);
    stream.write(b"0123456789").unwrap();
    stream.set_position(4).unwrap();

    let rejected = stream
        .inject_buffer_at_current_position(BlockChain::from_slice(b"xy", 2).unwrap(), false, true)
        .unwrap_err();
    assert!(matches!(rejected.error, StreamError::OutOfMemory { .. }));
    assert_eq!(rejected.chain.to_vec(), b"xy");
    assert_eq!(stream.to_vec().unwrap(), b"0123456789");
    assert_eq!(stream.position().unwrap(), 4);
}

/// Test chains built from a pool return their blocks once spliced and dropped
#[test]
fn test_pooled_chain_moves_between_streams() {
    let pool = CountingPool::new();
    let chain = BlockChain::from_slice_with(
        b"pooled chain",
        4,
        &BlockAllocation::Pool(pool.clone()),
        false,
    )
    .unwrap();
    assert_eq!(pool.outstanding(), 3);

    let stream = ChainStream::with_block_size(4).unwrap();
    stream.write(b"heap").unwrap();
    stream.set_position(2).unwrap();
    stream
        .inject_buffer_at_current_position(chain, true, false)
        .unwrap();
    assert_eq!(stream.to_vec().unwrap(), b"hepooled chain");

    drop(stream);
    assert_eq!(pool.outstanding(), 0);
}
