//! Position bookkeeping and chain mutation for [`ChainStream`](super::ChainStream).
//!
//! Everything here runs with the stream's lock held. The state keeps these
//! invariants between calls:
//!
//! - the chain's blocks hold the bytes `[origin, length)` in order;
//! - `origin` only moves forward, when read blocks are released;
//! - `position >= origin` (it may exceed `length` after a seek);
//! - the cursor names the block holding the byte at `position` and that
//!   block's start offset, or the tail when `position >= length`, or no block
//!   when the chain is empty.

use core::{cmp::min, mem};

use crate::{
    domain::{BlockChain, BlockId, MemoryBlock, Rejected, SeekFrom, StreamConfig, StreamError},
    log_macros::{debug, trace},
};

#[derive(Debug, Clone, Copy)]
struct Cursor {
    block: Option<BlockId>,
    start: u64,
}

/// Bytes appended to the end of the chain.
#[derive(Clone, Copy)]
enum Fill<'a> {
    Zeros(u64),
    Bytes(&'a [u8]),
}

impl Fill<'_> {
    fn len(&self) -> u64 {
        match self {
            Fill::Zeros(count) => *count,
            Fill::Bytes(bytes) => bytes.len() as u64,
        }
    }
}

/// Where an injected chain goes, decided before anything is mutated.
enum SplicePoint {
    /// Directly after this block, or in front of the head when `None`.
    After(Option<BlockId>),
    /// After the tail, once any gap up to the position has been filled.
    End,
    /// Inside a block's valid bytes; `right` receives the bytes after `offset`.
    Split {
        block: BlockId,
        offset: usize,
        right: MemoryBlock,
    },
}

pub(crate) struct StreamState {
    chain: BlockChain,
    cursor: Cursor,
    position: u64,
    length: u64,
    origin: u64,
    closed: bool,
}

impl StreamState {
    pub(crate) fn new() -> Self {
        Self {
            chain: BlockChain::new(),
            cursor: Cursor {
                block: None,
                start: 0,
            },
            position: 0,
            length: 0,
            origin: 0,
            closed: false,
        }
    }

    pub(crate) fn ensure_open(&self) -> Result<(), StreamError> {
        if self.closed {
            Err(StreamError::Disposed)
        } else {
            Ok(())
        }
    }

    pub(crate) fn position(&self) -> u64 {
        self.position
    }

    pub(crate) fn length(&self) -> u64 {
        self.length
    }

    pub(crate) fn remaining(&self) -> u64 {
        self.length.saturating_sub(self.position)
    }

    pub(crate) fn block_count(&self) -> usize {
        self.chain.block_count()
    }

    pub(crate) fn to_vec(&self) -> Vec<u8> {
        self.chain.to_vec()
    }

    /// Find the block holding `target`, walking from whichever known point is
    /// nearest: the head, the tail, or the current cursor.
    fn locate(&self, target: u64, from_cursor: bool) -> Cursor {
        let (Some(head), Some(tail)) = (self.chain.head(), self.chain.tail()) else {
            return Cursor {
                block: None,
                start: self.length,
            };
        };

        let tail_cursor = Cursor {
            block: Some(tail),
            start: self.length - self.chain.len_of(tail) as u64,
        };
        if target >= self.length {
            return tail_cursor;
        }

        let mut best = Cursor {
            block: Some(head),
            start: self.origin,
        };
        let mut distance = target.saturating_sub(self.origin);
        if self.length - target < distance {
            best = tail_cursor;
            distance = self.length - target;
        }
        if from_cursor && self.cursor.block.is_some() && self.cursor.start.abs_diff(target) < distance
        {
            best = self.cursor;
        }
        self.walk(best, target)
    }

    fn walk(&self, mut cursor: Cursor, target: u64) -> Cursor {
        while let Some(block) = cursor.block {
            let len = self.chain.len_of(block) as u64;
            if target < cursor.start {
                let Some(previous) = self.chain.previous(block) else {
                    break;
                };
                cursor.start -= self.chain.len_of(previous) as u64;
                cursor.block = Some(previous);
            } else if target >= cursor.start + len {
                let Some(next) = self.chain.next(block) else {
                    break;
                };
                cursor.start += len;
                cursor.block = Some(next);
            } else {
                break;
            }
        }
        cursor
    }

    fn move_to(&mut self, target: u64) -> Result<u64, StreamError> {
        if target < self.origin {
            return Err(StreamError::Released {
                offset: target,
                available_from: self.origin,
            });
        }
        self.position = target;
        self.cursor = self.locate(target, true);
        Ok(target)
    }

    pub(crate) fn seek(&mut self, pos: SeekFrom) -> Result<u64, StreamError> {
        self.ensure_open()?;
        let target = pos.target(self.position, self.length);
        let target = u64::try_from(target).map_err(|_| StreamError::out_of_range("offset", target))?;
        self.move_to(target)
    }

    pub(crate) fn read(&mut self, buf: &mut [u8], release: bool) -> Result<usize, StreamError> {
        self.ensure_open()?;

        let mut copied = 0;
        while copied < buf.len() && self.position < self.length {
            let Some(block) = self.cursor.block else {
                break;
            };
            let data = self.chain.block(block).data();
            let len = data.len();
            let offset = (self.position - self.cursor.start) as usize;
            let count = min(len - offset, buf.len() - copied);
            buf[copied..copied + count].copy_from_slice(&data[offset..offset + count]);
            copied += count;
            self.position += count as u64;

            if offset + count == len {
                self.leave_block(block, len, release);
            }
        }
        Ok(copied)
    }

    /// Step past a block whose bytes have all been consumed.
    fn leave_block(&mut self, block: BlockId, len: usize, release: bool) {
        let end = self.cursor.start + len as u64;
        let next = self.chain.next(block);

        if release {
            let mut released = 0;
            while let Some(head) = self.chain.head() {
                if let Some(mut consumed) = self.chain.remove(head) {
                    consumed.dispose();
                    released += 1;
                }
                if head == block {
                    break;
                }
            }
            trace!("released {} read blocks, data now starts at {}", released, end);
            self.origin = end;
            self.cursor = Cursor { block: next, start: end };
        } else if let Some(next) = next {
            self.cursor = Cursor {
                block: Some(next),
                start: end,
            };
        }
    }

    pub(crate) fn write(&mut self, data: &[u8], config: &StreamConfig) -> Result<(), StreamError> {
        self.ensure_open()?;
        if data.is_empty() {
            return Ok(());
        }

        let end = self
            .position
            .checked_add(data.len() as u64)
            .ok_or_else(|| StreamError::out_of_range("count", data.len() as i128))?;
        let mut fresh = self.reserve(end.saturating_sub(self.length), config)?.into_iter();

        if self.position > self.length {
            self.extend(Fill::Zeros(self.position - self.length), &mut fresh);
            self.cursor = self.locate(self.position, false);
        }

        let mut written = 0;
        while written < data.len() && self.position < self.length {
            let Some(block) = self.cursor.block else {
                break;
            };
            let offset = (self.position - self.cursor.start) as usize;
            let target = self.chain.block_mut(block);
            let len = target.len();
            let count = min(len - offset, data.len() - written);
            target.buffer_mut()[offset..offset + count]
                .copy_from_slice(&data[written..written + count]);
            written += count;
            self.position += count as u64;

            if offset + count == len {
                if let Some(next) = self.chain.next(block) {
                    self.cursor = Cursor {
                        block: Some(next),
                        start: self.cursor.start + len as u64,
                    };
                }
            }
        }

        if written < data.len() {
            self.extend(Fill::Bytes(&data[written..]), &mut fresh);
            self.position = self.length;
            self.cursor = self.locate(self.position, false);
        }
        Ok(())
    }

    /// Allocate enough new blocks to grow the stream by `growth` bytes beyond
    /// the tail's spare capacity. Nothing is mutated, so a failure leaves the
    /// stream as it was.
    fn reserve(&self, growth: u64, config: &StreamConfig) -> Result<Vec<MemoryBlock>, StreamError> {
        let spare = self
            .chain
            .tail()
            .map_or(0, |tail| self.chain.block(tail).spare()) as u64;
        let mut needed = growth.saturating_sub(spare);
        if needed > isize::MAX as u64 {
            return Err(StreamError::OutOfMemory {
                requested: usize::MAX,
            });
        }

        let mut blocks = Vec::new();
        while needed > 0 {
            let block = MemoryBlock::allocate(
                config.block_allocation(),
                config.minimum_block_size(),
                config.clears_buffers(),
            )?;
            needed = needed.saturating_sub(block.capacity() as u64);
            blocks.push(block);
        }
        if !blocks.is_empty() {
            trace!("allocated {} blocks for {} bytes of growth", blocks.len(), growth);
        }
        Ok(blocks)
    }

    /// Append bytes after the tail, first into its spare capacity and then
    /// into `fresh` blocks. Existing blocks other than the tail never grow.
    fn extend(&mut self, fill: Fill<'_>, fresh: &mut impl Iterator<Item = MemoryBlock>) {
        let total = fill.len();
        let mut done = 0u64;
        while done < total {
            let block = match self
                .chain
                .tail()
                .filter(|tail| self.chain.block(*tail).spare() > 0)
            {
                Some(tail) => tail,
                None => match fresh.next() {
                    Some(block) => self.chain.push_back(block),
                    None => break,
                },
            };

            let target = self.chain.block_mut(block);
            let count = match fill {
                Fill::Zeros(_) => {
                    let want = usize::try_from(total - done).unwrap_or(usize::MAX);
                    target.extend_zeroed(want)
                }
                Fill::Bytes(bytes) => target.extend_from_slice(&bytes[done as usize..]),
            };
            done += count as u64;
        }
        self.length += done;
    }

    pub(crate) fn set_length(&mut self, length: u64, config: &StreamConfig) -> Result<(), StreamError> {
        self.ensure_open()?;
        if length < self.origin {
            return Err(StreamError::Released {
                offset: length,
                available_from: self.origin,
            });
        }

        if length < self.length {
            if length == self.origin {
                if let Some(head) = self.chain.head() {
                    self.chain.release_chain(head);
                }
            } else {
                let last = self.locate(length - 1, true);
                if let Some(block) = last.block {
                    self.chain
                        .block_mut(block)
                        .truncate((length - last.start) as usize);
                    self.chain.release_after(block);
                }
            }
            self.length = length;
        } else if length > self.length {
            let growth = length - self.length;
            let mut fresh = self.reserve(growth, config)?.into_iter();
            self.extend(Fill::Zeros(growth), &mut fresh);
        }

        self.position = self.position.min(length);
        self.cursor = self.locate(self.position, false);
        Ok(())
    }

    /// Take ownership of `chain`, returning the chain owned so far if it held any blocks.
    pub(crate) fn attach(&mut self, chain: BlockChain) -> Result<Option<BlockChain>, Rejected> {
        if let Err(error) = self.ensure_open() {
            return Err(Rejected::new(chain, error));
        }

        let chain = chain.into_linked();
        let length = chain.total_length();
        let previous = mem::replace(&mut self.chain, chain);
        self.length = length;
        self.position = 0;
        self.origin = 0;
        self.cursor = self.locate(0, false);
        debug!(
            "attached chain of {} bytes in {} blocks",
            length,
            self.chain.block_count()
        );
        Ok((!previous.is_empty()).then_some(previous))
    }

    pub(crate) fn detach(&mut self) -> Result<Option<BlockChain>, StreamError> {
        self.ensure_open()?;

        let chain = mem::take(&mut self.chain);
        debug!("detached chain of {} bytes", self.length - self.origin);
        self.length = 0;
        self.position = 0;
        self.origin = 0;
        self.cursor = Cursor {
            block: None,
            start: 0,
        };
        Ok((!chain.is_empty()).then_some(chain))
    }

    pub(crate) fn append(&mut self, chain: BlockChain) -> Result<(), Rejected> {
        if let Err(error) = self.ensure_open() {
            return Err(Rejected::new(chain, error));
        }

        let appended = chain.total_length();
        self.chain.append(chain);
        self.length += appended;
        self.cursor = self.locate(self.position, false);
        debug!("appended chain of {} bytes", appended);
        Ok(())
    }

    /// Splice `chain` in at the current position.
    ///
    /// Insert mode shifts the bytes after the position back; overwrite mode
    /// replaces as many of them as the chain holds. All allocation happens
    /// before the first mutation, so a rejected chain leaves the stream intact.
    pub(crate) fn inject(
        &mut self,
        chain: BlockChain,
        overwrite: bool,
        advance: bool,
        config: &StreamConfig,
    ) -> Result<(), Rejected> {
        if let Err(error) = self.ensure_open() {
            return Err(Rejected::new(chain, error));
        }

        let injected = chain.total_length();
        let at = self.position;
        let (point, gap) = match self.plan_splice(at, config) {
            Ok(plan) => plan,
            Err(error) => return Err(Rejected::new(chain, error)),
        };

        let anchor = match point {
            SplicePoint::After(anchor) => anchor,
            SplicePoint::End => {
                if at > self.length {
                    self.extend(Fill::Zeros(at - self.length), &mut gap.into_iter());
                }
                self.chain.tail()
            }
            SplicePoint::Split {
                block,
                offset,
                mut right,
            } => {
                right.extend_from_slice(&self.chain.block(block).data()[offset..]);
                self.chain.block_mut(block).truncate(offset);
                self.chain.insert_after(block, right);
                Some(block)
            }
        };

        let spliced = self.chain.splice_after(anchor, chain);
        let dropped = match spliced {
            Some((_, last)) if overwrite => self.drop_after(last, injected),
            _ => 0,
        };

        self.length = self.length + injected - dropped;
        self.position = if advance { at + injected } else { at };
        self.cursor = self.locate(self.position, false);
        debug!(
            "injected {} bytes at {} (overwrite: {}, replaced {})",
            injected, at, overwrite, dropped
        );
        Ok(())
    }

    fn plan_splice(
        &self,
        at: u64,
        config: &StreamConfig,
    ) -> Result<(SplicePoint, Vec<MemoryBlock>), StreamError> {
        if at >= self.length {
            let gap = self.reserve(at - self.length, config)?;
            return Ok((SplicePoint::End, gap));
        }

        let cursor = self.locate(at, true);
        let Some(block) = cursor.block else {
            return Ok((SplicePoint::After(None), Vec::new()));
        };
        let offset = (at - cursor.start) as usize;
        if offset == 0 {
            return Ok((SplicePoint::After(self.chain.previous(block)), Vec::new()));
        }

        let right_len = self.chain.len_of(block) - offset;
        let right = MemoryBlock::allocate(
            config.block_allocation(),
            right_len.max(config.minimum_block_size()),
            config.clears_buffers(),
        )?;
        Ok((
            SplicePoint::Split {
                block,
                offset,
                right,
            },
            Vec::new(),
        ))
    }

    /// Remove up to `count` bytes following `last`. Returns how many were removed.
    fn drop_after(&mut self, last: BlockId, count: u64) -> u64 {
        let mut remaining = count;
        while remaining > 0 {
            let Some(next) = self.chain.next(last) else {
                break;
            };
            let len = self.chain.len_of(next) as u64;
            if len <= remaining {
                if let Some(mut replaced) = self.chain.remove(next) {
                    replaced.dispose();
                }
                remaining -= len;
            } else {
                self.chain.block_mut(next).discard_front(remaining as usize);
                remaining = 0;
            }
        }
        count - remaining
    }

    /// Release the whole chain. Returns false if the state was already closed.
    pub(crate) fn close(&mut self) -> bool {
        if self.closed {
            return false;
        }

        let released = mem::take(&mut self.chain).release();
        debug!("closed stream, released {} blocks", released);
        self.closed = true;
        self.length = 0;
        self.position = 0;
        self.origin = 0;
        self.cursor = Cursor {
            block: None,
            start: 0,
        };
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(block_size: usize) -> StreamConfig {
        StreamConfig::new(block_size).unwrap()
    }

    fn filled(data: &[u8], block_size: usize) -> StreamState {
        let mut state = StreamState::new();
        state.write(data, &config(block_size)).unwrap();
        state
    }

    #[test]
    fn test_write_fills_tail_before_allocating() {
        let config = config(4);
        let mut state = StreamState::new();
        state.write(b"ab", &config).unwrap();
        state.write(b"cd", &config).unwrap();
        assert_eq!(state.block_count(), 1);

        state.write(b"e", &config).unwrap();
        assert_eq!(state.block_count(), 2);
        assert_eq!(state.to_vec(), b"abcde");
    }

    #[test]
    fn test_locate_on_block_boundary_picks_next_block() {
        let mut state = filled(b"aaaabbbbcc", 4);
        state.move_to(4).unwrap();
        let mut byte = [0u8; 1];
        state.read(&mut byte, false).unwrap();
        assert_eq!(&byte, b"b");
        assert_eq!(state.cursor.start, 4);
    }

    #[test]
    fn test_cursor_tracks_backward_seek() {
        let mut state = filled(&[1u8; 40], 4);
        state.move_to(38).unwrap();
        state.move_to(13).unwrap();
        assert_eq!(state.cursor.start, 12);
        state.move_to(0).unwrap();
        assert_eq!(state.cursor.start, 0);
    }

    #[test]
    fn test_write_past_end_zero_fills_gap() {
        let config = config(4);
        let mut state = filled(b"ab", 4);
        state.move_to(6).unwrap();
        state.write(b"z", &config).unwrap();
        assert_eq!(state.to_vec(), b"ab\0\0\0\0z");
        assert_eq!(state.length(), 7);
    }

    #[test]
    fn test_release_moves_origin() {
        let mut state = filled(b"aaaabbbbcc", 4);
        state.move_to(0).unwrap();

        let mut buf = [0u8; 5];
        state.read(&mut buf, true).unwrap();
        assert_eq!(state.origin, 4);
        assert_eq!(state.block_count(), 2);
        assert!(matches!(
            state.move_to(3),
            Err(StreamError::Released {
                offset: 3,
                available_from: 4
            })
        ));

        let mut rest = [0u8; 10];
        assert_eq!(state.read(&mut rest, true).unwrap(), 5);
        assert_eq!(state.block_count(), 0);
        assert_eq!(state.origin, 10);
    }

    #[test]
    fn test_truncate_to_origin_releases_everything() {
        let config = config(4);
        let mut state = filled(b"aaaabbbb", 4);
        state.set_length(0, &config).unwrap();
        assert_eq!(state.block_count(), 0);
        assert_eq!(state.position(), 0);
    }

    #[test]
    fn test_split_keeps_both_halves() {
        let config = config(4);
        let mut state = filled(b"abcdefgh", 4);
        state.move_to(2).unwrap();
        let chain = BlockChain::from_slice(b"XY", 4).unwrap();
        state.inject(chain, false, false, &config).unwrap();

        assert_eq!(state.to_vec(), b"abXYcdefgh");
        assert_eq!(state.position(), 2);
        assert_eq!(state.block_count(), 4);
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut state = filled(b"data", 4);
        assert!(state.close());
        assert!(!state.close());
        assert_eq!(state.ensure_open(), Err(StreamError::Disposed));
    }
}
