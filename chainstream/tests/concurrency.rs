//! Concurrency tests for ChainStream
//!
//! These tests cover:
//! - Synchronized streams shared between tasks and threads
//! - Pre-cancelled tokens
//! - Streams copying into each other concurrently

use std::{sync::Arc, thread, time::Duration};

use chainstream::{BlockChain, CancellationToken, ChainStream, StreamConfig, StreamError};

const RECORD: usize = 8;

fn synchronized(block_size: usize) -> ChainStream {
    ChainStream::with_config(StreamConfig::new(block_size).unwrap().synchronized(true))
}

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Check every record is whole and each writer wrote `per_writer` of them.
fn assert_records(content: &[u8], writers: usize, per_writer: usize) {
    assert_eq!(content.len(), writers * per_writer * RECORD);
    let mut counts = vec![0usize; writers];
    for record in content.chunks(RECORD) {
        assert!(record.iter().all(|&b| b == record[0]), "torn record {:?}", record);
        counts[record[0] as usize] += 1;
    }
    assert!(counts.iter().all(|&count| count == per_writer));
}

// ============================================================================
// Serialization
// ============================================================================

/// Test concurrent async writers never interleave within a write
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_async_writers_keep_records_whole() {
    init();
    let stream = Arc::new(synchronized(5));
    let writers = 4;
    let per_writer = 200;

    let mut handles = Vec::new();
    for id in 0..writers {
        let stream = stream.clone();
        handles.push(tokio::spawn(async move {
            let cancel = CancellationToken::new();
            for _ in 0..per_writer {
                stream
                    .write_async(&[id as u8; RECORD], &cancel)
                    .await
                    .unwrap();
                tokio::task::yield_now().await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_records(&stream.to_vec().unwrap(), writers, per_writer);
}

/// Test threads using the blocking API are serialized too
#[test]
fn test_threads_keep_records_whole() {
    let stream = Arc::new(synchronized(7));
    let writers = 3;
    let per_writer = 300;

    let handles: Vec<_> = (0..writers)
        .map(|id| {
            let stream = stream.clone();
            thread::spawn(move || {
                for _ in 0..per_writer {
                    stream.write(&[id as u8; RECORD]).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(stream.position().unwrap(), (writers * per_writer * RECORD) as u64);
    assert_records(&stream.to_vec().unwrap(), writers, per_writer);
}

// ============================================================================
// Cancellation
// ============================================================================

/// Test a token cancelled before the call fails fast even when the lock is free
#[tokio::test]
async fn test_pre_cancelled_token() {
    let stream = synchronized(4);
    stream.write(b"data").unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    assert_eq!(stream.write_async(b"x", &cancel).await, Err(StreamError::Cancelled));
    assert_eq!(
        stream.read_async(&mut [0u8; 4], &cancel).await,
        Err(StreamError::Cancelled)
    );
    assert_eq!(stream.flush_async(&cancel).await, Err(StreamError::Cancelled));
    assert!(matches!(
        stream.detach_buffer_async(&cancel).await,
        Err(StreamError::Cancelled)
    ));

    let rejected = stream
        .attach_buffer_async(BlockChain::from_slice(b"new", 2).unwrap(), &cancel)
        .await
        .unwrap_err();
    assert_eq!(rejected.error, StreamError::Cancelled);
    assert_eq!(rejected.chain.to_vec(), b"new");

    assert_eq!(stream.to_vec().unwrap(), b"data");
}

// ============================================================================
// Cross copies
// ============================================================================

fn filled(byte: u8, len: usize) -> Arc<ChainStream> {
    let stream = synchronized(4096);
    stream.write(&vec![byte; len]).unwrap();
    stream.set_position(0).unwrap();
    Arc::new(stream)
}

/// Test two threads copying two synchronized streams into each other both finish
#[test]
fn test_cross_copy_threads() {
    init();
    let a = filled(b'a', 1 << 20);
    let b = filled(b'b', 1 << 20);

    let forward = {
        let (a, b) = (a.clone(), b.clone());
        thread::spawn(move || a.copy_to(&*b, 16))
    };
    let backward = {
        let (a, b) = (a.clone(), b.clone());
        thread::spawn(move || b.copy_to(&*a, 16))
    };

    let forward = forward.join().unwrap().unwrap();
    let backward = backward.join().unwrap().unwrap();

    // Each stream's cursor moved once per byte read out of it or written into it.
    for stream in [&a, &b] {
        assert_eq!(stream.position().unwrap(), forward + backward);
        assert_eq!(stream.length().unwrap(), forward + backward);
        assert!(stream.length().unwrap() >= 1 << 20);
    }
}

/// Test the asynchronous cross copy finishes too
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cross_copy_tasks() {
    let a = filled(b'a', 1 << 18);
    let b = filled(b'b', 1 << 18);

    let forward = {
        let (a, b) = (a.clone(), b.clone());
        tokio::spawn(async move { a.copy_to_async(&*b, 64, &CancellationToken::new()).await })
    };
    let backward = {
        let (a, b) = (a.clone(), b.clone());
        tokio::spawn(async move { b.copy_to_async(&*a, 64, &CancellationToken::new()).await })
    };

    let (forward, backward) = tokio::time::timeout(Duration::from_secs(30), async {
        (forward.await.unwrap(), backward.await.unwrap())
    })
    .await
    .expect("cross copy did not finish");
    let copied = forward.unwrap() + backward.unwrap();

    for stream in [&a, &b] {
        assert_eq!(stream.position().unwrap(), copied);
        assert_eq!(stream.length().unwrap(), copied);
    }
}
