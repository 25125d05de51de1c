//! Type-safe block identifier value object.

use core::fmt;

/// Identifies a block within one [`BlockChain`](crate::domain::BlockChain).
///
/// Identifiers are only meaningful for the chain that issued them. A chain may
/// reuse the identifier of a removed block for a block inserted later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(usize);

impl BlockId {
    #[inline]
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Get the slot index inside the owning chain.
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Block({})", self.0)
    }
}
