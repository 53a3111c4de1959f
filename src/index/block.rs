//! Block chains - fixed-capacity lists of record references
//!
//! Every index slot holds a [`BlockChain`], which is just the id of its
//! head block. The blocks themselves live in a [`BlockArena`] owned by the
//! index, each holding up to [`BLOCK_CAPACITY`] record ids and a link to the
//! next (older) block.
//!
//! # Layout
//! ```text
//! slot ──► [blk 7: 120/500] ──► [blk 3: 500/500] ──► [blk 0: 500/500]
//!           newest                                     oldest
//! ```
//!
//! Appends always go to the head; a full head gets a new block prepended.
//! Traversal runs head to tail, so the most recently created block is seen
//! first and each block is read from slot 0 upward.

use crate::storage::{RecordId, StorageError, StorageResult};

/// Number of record references a block can hold
pub const BLOCK_CAPACITY: usize = 500;

/// Position of a block inside its arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(u32);

/// Fixed-capacity run of record references
#[derive(Debug)]
pub struct Block {
    refs: Vec<RecordId>,
    next: Option<BlockId>,
}

impl Block {
    /// Stored references, in insertion order
    pub fn records(&self) -> &[RecordId] {
        &self.refs
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.refs.len() >= BLOCK_CAPACITY
    }

    /// The older block this one was prepended to
    pub fn next(&self) -> Option<BlockId> {
        self.next
    }
}

/// Handle to a chain of blocks; empty until the first append
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockChain {
    head: Option<BlockId>,
}

impl BlockChain {
    pub const EMPTY: BlockChain = BlockChain { head: None };

    pub fn new() -> Self {
        Self::EMPTY
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn head(&self) -> Option<BlockId> {
        self.head
    }
}

/// Owner of every block used by one index
#[derive(Debug, Default)]
pub struct BlockArena {
    blocks: Vec<Block>,
}

impl BlockArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a reference to `chain`, prepending a fresh block when the
    /// chain is empty or its head is full
    pub fn append(&mut self, chain: &mut BlockChain, record: RecordId) -> StorageResult<()> {
        let head = match chain.head {
            Some(id) if !self.blocks[id.0 as usize].is_full() => id,
            old_head => {
                let id = self.allocate(old_head)?;
                chain.head = Some(id);
                id
            }
        };

        self.blocks[head.0 as usize].refs.push(record);
        Ok(())
    }

    fn allocate(&mut self, next: Option<BlockId>) -> StorageResult<BlockId> {
        let id = u32::try_from(self.blocks.len())
            .map_err(|_| StorageError::Exhausted("block ids"))?;

        let mut refs = Vec::new();
        refs.try_reserve_exact(BLOCK_CAPACITY)
            .map_err(|_| StorageError::Exhausted("demand block"))?;
        self.blocks
            .try_reserve(1)
            .map_err(|_| StorageError::Exhausted("block arena"))?;

        self.blocks.push(Block { refs, next });
        Ok(BlockId(id))
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0 as usize]
    }

    /// Blocks of `chain`, head (newest) first
    pub fn blocks(&self, chain: BlockChain) -> Blocks<'_> {
        Blocks {
            arena: self,
            cursor: chain.head,
        }
    }

    /// Every reference in `chain`, in traversal order
    pub fn iter(&self, chain: BlockChain) -> impl Iterator<Item = RecordId> + '_ {
        self.blocks(chain)
            .flat_map(|block| block.records().iter().copied())
    }

    /// Visit every reference in `chain`, in traversal order
    pub fn for_each<F: FnMut(RecordId)>(&self, chain: BlockChain, visitor: F) {
        self.iter(chain).for_each(visitor);
    }

    /// Visit every reference in `chain` oldest block first
    pub fn for_each_chronological<F: FnMut(RecordId)>(&self, chain: BlockChain, mut visitor: F) {
        let blocks: Vec<&Block> = self.blocks(chain).collect();
        for block in blocks.into_iter().rev() {
            for &id in block.records() {
                visitor(id);
            }
        }
    }

    /// Total references stored in `chain`
    pub fn chain_len(&self, chain: BlockChain) -> usize {
        self.blocks(chain).map(Block::len).sum()
    }

    /// Blocks allocated across all chains
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }
}

/// Iterator over a chain's blocks
pub struct Blocks<'a> {
    arena: &'a BlockArena,
    cursor: Option<BlockId>,
}

impl<'a> Iterator for Blocks<'a> {
    type Item = &'a Block;

    fn next(&mut self) -> Option<Self::Item> {
        let block = self.arena.block(self.cursor?);
        self.cursor = block.next;
        Some(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(arena: &mut BlockArena, chain: &mut BlockChain, n: u32) {
        for i in 0..n {
            arena.append(chain, RecordId(i)).unwrap();
        }
    }

    #[test]
    fn test_empty_chain() {
        let arena = BlockArena::new();
        let chain = BlockChain::new();

        assert!(chain.is_empty());
        assert_eq!(arena.chain_len(chain), 0);
        assert_eq!(arena.iter(chain).count(), 0);
        assert_eq!(arena.block_count(), 0);
    }

    #[test]
    fn test_first_append_allocates_block() {
        let mut arena = BlockArena::new();
        let mut chain = BlockChain::new();

        arena.append(&mut chain, RecordId(42)).unwrap();

        assert!(!chain.is_empty());
        assert_eq!(arena.block_count(), 1);
        assert_eq!(arena.iter(chain).collect::<Vec<_>>(), vec![RecordId(42)]);
    }

    #[test]
    fn test_count_accounting_across_blocks() {
        let mut arena = BlockArena::new();
        let mut chain = BlockChain::new();

        fill(&mut arena, &mut chain, 1234);

        assert_eq!(arena.chain_len(chain), 1234);
        assert_eq!(arena.blocks(chain).count(), 3);
        assert!(arena.blocks(chain).all(|b| b.len() <= BLOCK_CAPACITY));
    }

    #[test]
    fn test_exactly_full_block_does_not_allocate_early() {
        let mut arena = BlockArena::new();
        let mut chain = BlockChain::new();

        fill(&mut arena, &mut chain, BLOCK_CAPACITY as u32);
        assert_eq!(arena.block_count(), 1);
        assert!(arena.block(chain.head().unwrap()).is_full());

        arena.append(&mut chain, RecordId(9999)).unwrap();
        assert_eq!(arena.block_count(), 2);
        assert_eq!(arena.block(chain.head().unwrap()).len(), 1);
    }

    #[test]
    fn test_traversal_is_newest_block_first() {
        let mut arena = BlockArena::new();
        let mut chain = BlockChain::new();

        fill(&mut arena, &mut chain, 1200);

        let order: Vec<u32> = arena.iter(chain).map(|id| id.0).collect();
        let expected: Vec<u32> = (1000..1200).chain(500..1000).chain(0..500).collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn test_chronological_traversal() {
        let mut arena = BlockArena::new();
        let mut chain = BlockChain::new();

        fill(&mut arena, &mut chain, 1200);

        let mut order = Vec::new();
        arena.for_each_chronological(chain, |id| order.push(id.0));
        assert_eq!(order, (0..1200).collect::<Vec<u32>>());
    }

    #[test]
    fn test_chains_share_arena_independently() {
        let mut arena = BlockArena::new();
        let mut a = BlockChain::new();
        let mut b = BlockChain::new();

        arena.append(&mut a, RecordId(1)).unwrap();
        arena.append(&mut b, RecordId(2)).unwrap();
        arena.append(&mut a, RecordId(3)).unwrap();

        let mut seen = Vec::new();
        arena.for_each(a, |id| seen.push(id));
        assert_eq!(seen, vec![RecordId(1), RecordId(3)]);
        assert_eq!(arena.iter(b).collect::<Vec<_>>(), vec![RecordId(2)]);
        assert_eq!(arena.block_count(), 2);
    }
}
