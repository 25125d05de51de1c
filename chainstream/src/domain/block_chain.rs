//! BlockChain domain service - navigation and aggregation over linked blocks.
//!
//! A `BlockChain` owns its blocks in an arena and links them into a doubly
//! linked list by [`BlockId`]. All link changes go through one mutator,
//! [`BlockChain::join`], which keeps `previous`/`next` symmetric on both ends.

use core::fmt;

use crate::{
    domain::{BlockAllocation, BlockId, MemoryBlock, StreamError},
    log_macros::trace,
};

struct Slot {
    block: MemoryBlock,
    previous: Option<BlockId>,
    next: Option<BlockId>,
}

/// An ordered chain of [`MemoryBlock`]s.
///
/// The chain's content is the concatenation of each block's valid bytes from
/// head to tail. Ownership of a chain moves between streams and callers by
/// value: [`ChainStream::attach_buffer`](crate::ChainStream::attach_buffer),
/// [`detach_buffer`](crate::ChainStream::detach_buffer),
/// [`append_buffer`](crate::ChainStream::append_buffer) and
/// [`inject_buffer_at_current_position`](crate::ChainStream::inject_buffer_at_current_position).
///
/// Dropping a chain releases every block it still owns, linked or not.
///
/// # Examples
///
/// ```
/// use chainstream::domain::{BlockChain, MemoryBlock};
///
/// let mut chain = BlockChain::new();
/// let first = chain.push_back(MemoryBlock::from_vec(b"hello ".to_vec()));
/// chain.push_back(MemoryBlock::from_vec(b"world".to_vec()));
///
/// assert_eq!(chain.chain_length_from(first), 11);
/// assert_eq!(chain.to_vec(), b"hello world");
/// ```
#[derive(Default)]
pub struct BlockChain {
    slots: Vec<Option<Slot>>,
    vacant: Vec<usize>,
    occupied: usize,
    head: Option<BlockId>,
    tail: Option<BlockId>,
}

impl BlockChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a chain holding a single block.
    pub fn from_block(block: MemoryBlock) -> Self {
        let mut chain = Self::new();
        chain.push_back(block);
        chain
    }

    /// Build a chain of full heap blocks holding a copy of `data`.
    ///
    /// Every block except possibly the last holds exactly `block_size` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::OutOfRange`] if `block_size` is zero.
    pub fn from_slice(data: &[u8], block_size: usize) -> Result<Self, StreamError> {
        Self::from_slice_with(data, block_size, &BlockAllocation::Heap, false)
    }

    /// Build a chain holding a copy of `data`, allocating blocks of at least
    /// `block_size` bytes with the given strategy.
    ///
    /// Each block is filled to exactly `block_size` bytes (the last one may be
    /// shorter) even if the allocator grants more capacity.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::OutOfRange`] if `block_size` is zero, or
    /// [`StreamError::OutOfMemory`] if a block cannot be allocated. Blocks
    /// allocated before the failure are released.
    pub fn from_slice_with(
        data: &[u8],
        block_size: usize,
        allocation: &BlockAllocation,
        clear: bool,
    ) -> Result<Self, StreamError> {
        if block_size == 0 {
            return Err(StreamError::out_of_range("block_size", 0));
        }

        let mut chain = Self::new();
        for piece in data.chunks(block_size) {
            let mut block = MemoryBlock::allocate(allocation, block_size, clear)?;
            block.buffer_mut()[..piece.len()].copy_from_slice(piece);
            block.set_len(piece.len())?;
            chain.push_back(block);
        }
        Ok(chain)
    }

    /// Check if the chain holds no blocks.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    /// Number of blocks owned by the chain, including unlinked ones.
    #[inline]
    pub const fn block_count(&self) -> usize {
        self.occupied
    }

    /// First block of the chain.
    #[inline]
    pub const fn head(&self) -> Option<BlockId> {
        self.head
    }

    /// Last block of the chain.
    #[inline]
    pub const fn tail(&self) -> Option<BlockId> {
        self.tail
    }

    /// Get a block, or `None` if `id` does not name a block of this chain.
    pub fn get(&self, id: BlockId) -> Option<&MemoryBlock> {
        self.slots
            .get(id.index())
            .and_then(Option::as_ref)
            .map(|slot| &slot.block)
    }

    /// Get a block mutably, or `None` if `id` does not name a block of this chain.
    pub fn get_mut(&mut self, id: BlockId) -> Option<&mut MemoryBlock> {
        self.slots
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .map(|slot| &mut slot.block)
    }

    /// The block after `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not name a block of this chain.
    #[inline]
    pub fn next(&self, id: BlockId) -> Option<BlockId> {
        self.slot(id).next
    }

    /// The block before `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not name a block of this chain.
    #[inline]
    pub fn previous(&self, id: BlockId) -> Option<BlockId> {
        self.slot(id).previous
    }

    /// Valid length of the block `id`.
    #[inline]
    pub(crate) fn len_of(&self, id: BlockId) -> usize {
        self.slot(id).block.len()
    }

    pub(crate) fn block(&self, id: BlockId) -> &MemoryBlock {
        &self.slot(id).block
    }

    pub(crate) fn block_mut(&mut self, id: BlockId) -> &mut MemoryBlock {
        &mut self.slot_mut(id).block
    }

    fn slot(&self, id: BlockId) -> &Slot {
        match self.slots.get(id.index()).and_then(Option::as_ref) {
            Some(slot) => slot,
            None => panic!("{} is not part of this chain", id),
        }
    }

    fn slot_mut(&mut self, id: BlockId) -> &mut Slot {
        match self.slots.get_mut(id.index()).and_then(Option::as_mut) {
            Some(slot) => slot,
            None => panic!("{} is not part of this chain", id),
        }
    }

    /// Store a block without linking it to anything.
    ///
    /// The first block stored in an empty chain becomes its head and tail.
    /// Otherwise the block stays detached until linked with
    /// [`set_next`](Self::set_next) or [`set_previous`](Self::set_previous).
    pub fn insert_unlinked(&mut self, block: MemoryBlock) -> BlockId {
        let slot = Slot {
            block,
            previous: None,
            next: None,
        };
        let id = match self.vacant.pop() {
            Some(index) => {
                self.slots[index] = Some(slot);
                BlockId::new(index)
            }
            None => {
                self.slots.push(Some(slot));
                BlockId::new(self.slots.len() - 1)
            }
        };
        self.occupied += 1;

        if self.head.is_none() {
            self.head = Some(id);
            self.tail = Some(id);
        }
        id
    }

    /// Link `previous -> next`, detaching whatever either side was linked to.
    ///
    /// This is the only place links are written. Whichever block `previous`
    /// pointed to loses its back-link, and whichever block pointed to `next`
    /// loses its forward link, so every link stays symmetric. Passing `None`
    /// on one side only clears the other side's link.
    fn join(&mut self, previous: Option<BlockId>, next: Option<BlockId>) {
        if let Some(left) = previous {
            if let Some(old) = self.slot(left).next {
                if Some(old) != next {
                    self.slot_mut(old).previous = None;
                }
            }
            self.slot_mut(left).next = next;
        }
        if let Some(right) = next {
            if let Some(old) = self.slot(right).previous {
                if Some(old) != previous {
                    self.slot_mut(old).next = None;
                }
            }
            self.slot_mut(right).previous = previous;
        }
    }

    /// Set the block after `id`, keeping the back-link of `next` in sync.
    ///
    /// The chain's head and tail are re-derived from the current head
    /// afterwards; blocks cut off from it stay owned but unlinked.
    pub fn set_next(&mut self, id: BlockId, next: Option<BlockId>) {
        self.join(Some(id), next);
        self.refresh_ends();
    }

    /// Set the block before `id`, keeping the forward link of `previous` in sync.
    pub fn set_previous(&mut self, id: BlockId, previous: Option<BlockId>) {
        self.join(previous, Some(id));
        self.refresh_ends();
    }

    fn refresh_ends(&mut self) {
        let seed = self.head.filter(|id| self.get(*id).is_some()).or_else(|| {
            self.slots
                .iter()
                .position(Option::is_some)
                .map(BlockId::new)
        });

        match seed {
            Some(seed) => {
                let head = self.start_of_chain(seed);
                self.head = Some(head);
                self.tail = Some(self.end_of_chain(head));
            }
            None => {
                self.head = None;
                self.tail = None;
            }
        }
    }

    /// Append a block after the tail.
    pub fn push_back(&mut self, block: MemoryBlock) -> BlockId {
        let tail = self.tail;
        let id = self.insert_unlinked(block);
        if let Some(tail) = tail {
            self.join(Some(tail), Some(id));
            self.tail = Some(id);
        }
        id
    }

    /// Prepend a block before the head.
    pub fn push_front(&mut self, block: MemoryBlock) -> BlockId {
        let head = self.head;
        let id = self.insert_unlinked(block);
        if let Some(head) = head {
            self.join(Some(id), Some(head));
            self.head = Some(id);
        }
        id
    }

    /// Insert a block directly after `anchor`.
    ///
    /// # Panics
    ///
    /// Panics if `anchor` does not name a block of this chain.
    pub fn insert_after(&mut self, anchor: BlockId, block: MemoryBlock) -> BlockId {
        let next = self.next(anchor);
        let id = self.insert_unlinked(block);
        self.join(Some(anchor), Some(id));
        self.join(Some(id), next);
        if self.tail == Some(anchor) {
            self.tail = Some(id);
        }
        id
    }

    /// Unlink a block, joining its neighbours, and hand it to the caller.
    ///
    /// Removing the last linked block leaves the chain without a head even if
    /// unlinked blocks remain; those never become part of the chain by accident.
    pub fn remove(&mut self, id: BlockId) -> Option<MemoryBlock> {
        self.get(id)?;

        let (previous, next) = {
            let slot = self.slot(id);
            (slot.previous, slot.next)
        };
        match (previous, next) {
            (None, None) => {}
            (Some(_), _) => self.join(previous, next),
            (None, Some(_)) => self.join(None, next),
        }
        if self.head == Some(id) {
            self.head = next;
        }
        if self.tail == Some(id) {
            self.tail = previous;
        }

        let slot = self.slots[id.index()].take()?;
        self.vacant.push(id.index());
        self.occupied -= 1;
        Some(slot.block)
    }

    /// Walk `previous` links from `id` to the first block of its chain.
    pub fn start_of_chain(&self, id: BlockId) -> BlockId {
        self.start_of_chain_with_length(id).0
    }

    /// Like [`start_of_chain`](Self::start_of_chain), also returning the summed
    /// length of every block from the head up to and including `id`, which is
    /// the offset at which `id` ends.
    pub fn start_of_chain_with_length(&self, id: BlockId) -> (BlockId, u64) {
        let mut current = id;
        let mut accumulated = self.len_of(id) as u64;
        while let Some(previous) = self.previous(current) {
            accumulated += self.len_of(previous) as u64;
            current = previous;
        }
        (current, accumulated)
    }

    /// Walk `next` links from `id` to the last block of its chain.
    pub fn end_of_chain(&self, id: BlockId) -> BlockId {
        self.end_of_chain_with_length(id).0
    }

    /// Like [`end_of_chain`](Self::end_of_chain), also returning the summed
    /// length of every block from `id` to the tail inclusive.
    pub fn end_of_chain_with_length(&self, id: BlockId) -> (BlockId, u64) {
        let mut current = id;
        let mut accumulated = self.len_of(id) as u64;
        while let Some(next) = self.next(current) {
            accumulated += self.len_of(next) as u64;
            current = next;
        }
        (current, accumulated)
    }

    /// Summed valid length of `id` and every block after it.
    pub fn chain_length_from(&self, id: BlockId) -> u64 {
        self.end_of_chain_with_length(id).1
    }

    /// Summed valid length of the whole chain.
    pub fn total_length(&self) -> u64 {
        self.head.map_or(0, |head| self.chain_length_from(head))
    }

    /// Copy the valid bytes of `id` and every block after it into one buffer.
    ///
    /// Returns `None` when there is nothing to copy.
    pub fn materialize_from(&self, id: BlockId) -> Option<Vec<u8>> {
        let total = self.chain_length_from(id);
        if total == 0 {
            return None;
        }

        let mut flat = Vec::with_capacity(total as usize);
        let mut current = Some(id);
        while let Some(block) = current {
            flat.extend_from_slice(self.block(block).data());
            current = self.next(block);
        }
        Some(flat)
    }

    /// Copy the whole chain's content into one buffer.
    pub fn to_vec(&self) -> Vec<u8> {
        self.head
            .and_then(|head| self.materialize_from(head))
            .unwrap_or_default()
    }

    /// Iterate over the linked blocks from head to tail.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            chain: self,
            current: self.head,
        }
    }

    /// Release every block of the chain that `id` belongs to.
    ///
    /// Walks from the start of that chain to its end, giving each buffer back
    /// to its origin and removing the block. Returns how many were released.
    pub fn release_chain(&mut self, id: BlockId) -> usize {
        let mut current = Some(self.start_of_chain(id));
        let mut released = 0;
        while let Some(block) = current {
            current = self.next(block);
            if let Some(mut block) = self.remove(block) {
                block.dispose();
                released += 1;
            }
        }
        trace!("released {} chained blocks", released);
        released
    }

    /// Keep only the blocks linked from the head, releasing every unlinked one.
    pub fn into_linked(mut self) -> Self {
        let mut linked = Self::new();
        while let Some(head) = self.head {
            match self.remove(head) {
                Some(block) => {
                    linked.push_back(block);
                }
                None => break,
            }
        }

        let released = self.release();
        if released > 0 {
            trace!("released {} unlinked blocks", released);
        }
        linked
    }

    /// Release every block the chain owns, linked or not.
    pub fn release(mut self) -> usize {
        let mut released = 0;
        for slot in self.slots.iter_mut().filter_map(Option::take) {
            let mut block = slot.block;
            block.dispose();
            released += 1;
        }
        released
    }

    /// Unlink and release every block after `id`. Returns how many were released.
    pub(crate) fn release_after(&mut self, id: BlockId) -> usize {
        let mut released = 0;
        while let Some(next) = self.next(id) {
            if let Some(mut block) = self.remove(next) {
                block.dispose();
                released += 1;
            }
        }
        released
    }

    /// Move every linked block of `other` into this chain, directly after
    /// `anchor` (or in front of the head when `anchor` is `None`).
    ///
    /// Returns the ids of the first and last moved block. Blocks of `other`
    /// that are not linked into its chain are released.
    pub(crate) fn splice_after(
        &mut self,
        anchor: Option<BlockId>,
        mut other: BlockChain,
    ) -> Option<(BlockId, BlockId)> {
        let mut moved = Vec::with_capacity(other.block_count());
        while let Some(head) = other.head {
            match other.remove(head) {
                Some(block) => moved.push(block),
                None => break,
            }
        }

        let mut first = None;
        let mut last = anchor;
        for block in moved {
            let id = match last {
                Some(previous) => self.insert_after(previous, block),
                None => self.push_front(block),
            };
            first.get_or_insert(id);
            last = Some(id);
        }
        first.zip(last)
    }

    /// Move every linked block of `other` after this chain's tail.
    pub fn append(&mut self, other: BlockChain) {
        let tail = self.tail;
        self.splice_after(tail, other);
    }
}

impl fmt::Debug for BlockChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockChain")
            .field("blocks", &self.occupied)
            .field("length", &self.total_length())
            .finish()
    }
}

/// Iterator over the linked blocks of a [`BlockChain`].
pub struct Iter<'a> {
    chain: &'a BlockChain,
    current: Option<BlockId>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (BlockId, &'a MemoryBlock);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        self.current = self.chain.next(id);
        Some((id, self.chain.block(id)))
    }
}
