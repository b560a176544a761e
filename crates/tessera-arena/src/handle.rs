//! Allocation handles.
//!
//! A [`BlockHandle`] is the offset of a payload's first byte inside the
//! arena, the owned-arena counterpart of a raw payload pointer. Handles
//! carry no generation: once released, the same offset may be handed out
//! again and the stale copy cannot be told apart.

use std::fmt;

/// Offset of an allocated payload within its arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[must_use]
pub struct BlockHandle {
    offset: usize,
}

impl BlockHandle {
    /// The null handle. Offset 0 is inside the superblock, so no
    /// allocation ever returns it.
    pub const NULL: Self = Self { offset: 0 };

    /// Build a handle from a raw payload offset.
    ///
    /// Nothing is checked here; `release` and the payload accessors
    /// validate the offset against the arena.
    pub fn from_offset(offset: usize) -> Self {
        Self { offset }
    }

    /// Byte offset of the payload within the arena.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Whether this is [`BlockHandle::NULL`].
    pub fn is_null(&self) -> bool {
        self.offset == 0
    }
}

impl fmt::Display for BlockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("BlockHandle(null)")
        } else {
            write!(f, "BlockHandle(off={})", self.offset)
        }
    }
}
