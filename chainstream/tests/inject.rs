//! Splice tests for ChainStream
//!
//! These tests cover:
//! - Insert and overwrite content across many positions and chain lengths
//! - Splicing past the end of the stream
//! - Position handling with and without advance
//! - Attach, detach and append ownership transfers
//! - Chains carrying blocks that are not linked into them

use chainstream::{BlockChain, ChainStream, MemoryBlock, SeekFrom, StreamConfig, StreamError};

fn bytes(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| seed.wrapping_add((i % 97) as u8)).collect()
}

/// Expected content after splicing `b` into `a` at `p`.
fn expected(a: &[u8], b: &[u8], p: usize, overwrite: bool) -> Vec<u8> {
    let mut out = a[..p.min(a.len())].to_vec();
    out.resize(p, 0);
    out.extend_from_slice(b);
    let resume = if overwrite { p + b.len() } else { p };
    if resume < a.len() {
        out.extend_from_slice(&a[resume..]);
    }
    out
}

fn stream_with(data: &[u8], block_size: usize) -> ChainStream {
    let stream = ChainStream::with_block_size(block_size).unwrap();
    stream.write(data).unwrap();
    stream
}

// ============================================================================
// Content formulas
// ============================================================================

/// Test insert mode shifts the tail back by the chain length
#[test]
fn test_insert_content() {
    let a = bytes(250, 1);
    for p in [0usize, 1, 99, 100, 101, 249, 250] {
        for lb in [1usize, 50, 100, 300] {
            let b = bytes(lb, 200);
            let stream = stream_with(&a, 100);
            stream.seek(SeekFrom::Start(p as u64)).unwrap();

            let chain = BlockChain::from_slice(&b, 64).unwrap();
            stream
                .inject_buffer_at_current_position(chain, false, true)
                .unwrap();

            assert_eq!(stream.length().unwrap(), (a.len() + lb) as u64);
            assert_eq!(stream.position().unwrap(), (p + lb) as u64);
            assert_eq!(stream.to_vec().unwrap(), expected(&a, &b, p, false), "p {} lb {}", p, lb);
        }
    }
}

/// Test overwrite mode replaces bytes and only grows past the end
#[test]
fn test_overwrite_content() {
    let a = bytes(250, 1);
    for p in [0usize, 1, 99, 100, 101, 200, 249, 250] {
        for lb in [1usize, 50, 100, 300] {
            let b = bytes(lb, 200);
            let stream = stream_with(&a, 100);
            stream.seek(SeekFrom::Start(p as u64)).unwrap();

            let chain = BlockChain::from_slice(&b, 64).unwrap();
            stream
                .inject_buffer_at_current_position(chain, true, true)
                .unwrap();

            assert_eq!(stream.length().unwrap(), a.len().max(p + lb) as u64);
            assert_eq!(stream.position().unwrap(), (p + lb) as u64);
            assert_eq!(stream.to_vec().unwrap(), expected(&a, &b, p, true), "p {} lb {}", p, lb);
        }
    }
}

/// Test the 1000-byte block scenario splitting the first block one byte early
#[test]
fn test_overwrite_across_block_boundary() {
    let a = bytes(2500, 3);
    let b = bytes(1500, 150);
    let stream = stream_with(&a, 1000);
    assert_eq!(stream.block_count().unwrap(), 3);

    stream.seek(SeekFrom::Start(999)).unwrap();
    let chain = BlockChain::from_slice(&b, 1000).unwrap();
    assert_eq!(chain.block_count(), 2);
    stream
        .inject_buffer_at_current_position(chain, true, true)
        .unwrap();

    assert_eq!(stream.length().unwrap(), 2500);
    assert_eq!(stream.position().unwrap(), 2499);

    let mut content = a[..999].to_vec();
    content.extend_from_slice(&b);
    content.extend_from_slice(&a[2499..]);
    assert_eq!(stream.to_vec().unwrap(), content);

    // Reading continues from the spliced position.
    let mut last = [0u8; 4];
    assert_eq!(stream.read(&mut last).unwrap(), 1);
    assert_eq!(last[0], a[2499]);
}

/// Test splicing beyond the end zero-fills the gap first
#[test]
fn test_inject_past_end() {
    let a = bytes(10, 5);
    let b = b"tail".to_vec();
    for overwrite in [false, true] {
        let stream = stream_with(&a, 8);
        stream.seek(SeekFrom::Start(30)).unwrap();
        stream
            .inject_buffer_at_current_position(BlockChain::from_slice(&b, 3).unwrap(), overwrite, true)
            .unwrap();

        assert_eq!(stream.length().unwrap(), 34);
        assert_eq!(stream.position().unwrap(), 34);
        assert_eq!(stream.to_vec().unwrap(), expected(&a, &b, 30, overwrite));
    }
}

/// Test the position stays put when advance is off
#[test]
fn test_inject_without_advance() {
    let stream = stream_with(b"0123456789", 4);
    stream.seek(SeekFrom::Start(6)).unwrap();
    stream
        .inject_buffer_at_current_position(BlockChain::from_slice(b"abc", 2).unwrap(), false, false)
        .unwrap();

    assert_eq!(stream.position().unwrap(), 6);
    let mut buf = [0u8; 5];
    assert_eq!(stream.read(&mut buf).unwrap(), 5);
    assert_eq!(&buf, b"abc67");
}

/// Test writes after a splice land in the right place
#[test]
fn test_write_after_inject() {
    let stream = stream_with(b"hello world", 4);
    stream.seek(SeekFrom::Start(5)).unwrap();
    stream
        .inject_buffer_at_current_position(BlockChain::from_slice(b"!!", 4).unwrap(), false, true)
        .unwrap();
    stream.write(b"_").unwrap();
    stream.seek(SeekFrom::End(0)).unwrap();
    stream.write(b"?").unwrap();

    assert_eq!(stream.to_vec().unwrap(), b"hello!!_world?");
}

/// Test injecting an empty chain is a no-op
#[test]
fn test_inject_empty_chain() {
    let stream = stream_with(b"abc", 2);
    stream.seek(SeekFrom::Start(1)).unwrap();
    stream
        .inject_buffer_at_current_position(BlockChain::new(), true, true)
        .unwrap();

    assert_eq!(stream.to_vec().unwrap(), b"abc");
    assert_eq!(stream.position().unwrap(), 1);
}

// ============================================================================
// Ownership transfers
// ============================================================================

/// Test detach hands over the content and leaves an empty stream
#[test]
fn test_detach_then_attach() {
    let stream = stream_with(b"moving blocks", 5);
    stream.seek(SeekFrom::Start(4)).unwrap();

    let chain = stream.detach_buffer().unwrap().unwrap();
    assert_eq!(chain.to_vec(), b"moving blocks");
    assert_eq!(stream.length().unwrap(), 0);
    assert_eq!(stream.position().unwrap(), 0);
    assert!(stream.detach_buffer().unwrap().is_none());

    let other = ChainStream::new();
    assert!(other.attach_buffer(chain).unwrap().is_none());
    assert_eq!(other.length().unwrap(), 13);
    assert_eq!(other.read_byte().unwrap(), Some(b'm'));
}

/// Test append keeps the position and extends the length
#[test]
fn test_append_buffer() {
    let stream = stream_with(b"head", 3);
    stream.seek(SeekFrom::Start(2)).unwrap();
    stream
        .append_buffer(BlockChain::from_slice(b"-tail", 2).unwrap())
        .unwrap();

    assert_eq!(stream.position().unwrap(), 2);
    assert_eq!(stream.length().unwrap(), 9);
    assert_eq!(stream.to_vec().unwrap(), b"head-tail");

    // New writes at the end go after the appended chain.
    stream.seek(SeekFrom::End(0)).unwrap();
    stream.write(b"!").unwrap();
    assert_eq!(stream.to_vec().unwrap(), b"head-tail!");
}

/// Test a closed stream hands every chain back
#[test]
fn test_rejected_chains_come_back() {
    let stream = ChainStream::new();
    stream.close().unwrap();

    let rejected = stream
        .inject_buffer_at_current_position(BlockChain::from_slice(b"keep", 2).unwrap(), false, true)
        .unwrap_err();
    assert_eq!(rejected.error, StreamError::Disposed);
    assert_eq!(rejected.chain.to_vec(), b"keep");

    let rejected = stream
        .append_buffer(BlockChain::from_slice(b"mine", 2).unwrap())
        .unwrap_err();
    assert_eq!(rejected.into_chain().to_vec(), b"mine");
}

// ============================================================================
// Unlinked blocks
// ============================================================================

fn chain_with_fragment(data: &[u8], block_size: usize) -> BlockChain {
    let mut chain = BlockChain::from_slice(data, block_size).unwrap();
    chain.insert_unlinked(MemoryBlock::from_vec(b"xyz".to_vec()));
    chain
}

/// Test an attached chain's stray block never becomes stream content
#[test]
fn test_attach_drops_unlinked_block() {
    let stream = ChainStream::new();
    assert!(stream.attach_buffer(chain_with_fragment(b"abcd", 4)).unwrap().is_none());
    assert_eq!(stream.length().unwrap(), 4);
    assert_eq!(stream.block_count().unwrap(), 1);

    stream.set_length(0).unwrap();
    assert_eq!(stream.block_count().unwrap(), 0);

    stream.write(b"hello").unwrap();
    stream.set_position(0).unwrap();
    let mut buf = [0u8; 8];
    assert_eq!(stream.read(&mut buf).unwrap(), 5);
    assert_eq!(&buf[..5], b"hello");
    assert_eq!(stream.to_vec().unwrap(), b"hello");
}

/// Test release-after-read over an attached chain with a stray block
#[test]
fn test_release_after_read_with_unlinked_block() {
    let stream = ChainStream::with_config(
        StreamConfig::new(2).unwrap().release_read_blocks(true),
    );
    stream.attach_buffer(chain_with_fragment(b"abcdef", 2)).unwrap();

    let mut buf = [0u8; 16];
    assert_eq!(stream.read(&mut buf).unwrap(), 6);
    assert_eq!(&buf[..6], b"abcdef");
    assert_eq!(stream.block_count().unwrap(), 0);

    stream.write(b"gh").unwrap();
    stream.seek(SeekFrom::Current(-2)).unwrap();
    assert_eq!(stream.read(&mut buf).unwrap(), 2);
    assert_eq!(&buf[..2], b"gh");
    assert_eq!(stream.length().unwrap(), 8);
}

/// Test append and inject only splice the linked blocks of a chain
#[test]
fn test_splice_skips_unlinked_block() {
    let stream = stream_with(b"0123", 2);
    stream.append_buffer(chain_with_fragment(b"45", 2)).unwrap();
    assert_eq!(stream.to_vec().unwrap(), b"012345");
    assert_eq!(stream.block_count().unwrap(), 3);

    stream.set_position(2).unwrap();
    stream
        .inject_buffer_at_current_position(chain_with_fragment(b"ab", 2), false, true)
        .unwrap();
    assert_eq!(stream.to_vec().unwrap(), b"01ab2345");

    stream.set_length(0).unwrap();
    assert_eq!(stream.block_count().unwrap(), 0);
    stream.write(b"fresh").unwrap();
    assert_eq!(stream.to_vec().unwrap(), b"fresh");
}
