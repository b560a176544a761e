//! Physical layout of the arena.
//!
//! ```text
//! offset 0      2         4        7                              capacity-1
//!        ┌──────┬─────────┬────────┬──────────────┬─────┬───────┬───┐
//!        │marker│free ctr │ header │   payload    │ ... │ block │ G │
//!        └──────┴─────────┴────────┴──────────────┴─────┴───────┴───┘
//!        └─── superblock ─┘└──────────── block chain ─────────────┘
//! ```
//!
//! A header is one status flag byte followed by the payload size encoded
//! with [`crate::codec`]. The chain starts at [`FIRST_BLOCK_OFFSET`] and
//! tiles every byte up to the one-byte guard `G` at the end of the arena.

/// Size of the superblock (marker + free-space counter) in bytes.
pub const SUPERBLOCK_SIZE: usize = 4;

/// Offset of the two-byte initialization marker.
pub const MARKER_OFFSET: usize = 0;

/// Offset of the encoded free-space counter.
pub const FREE_SPACE_OFFSET: usize = 2;

/// Size of the status flag at the start of each header.
pub const FLAG_SIZE: usize = 1;

/// Size of a block header (flag + encoded size) in bytes.
pub const HEADER_SIZE: usize = 3;

/// Offset of the first block header.
pub const FIRST_BLOCK_OFFSET: usize = SUPERBLOCK_SIZE;

/// Lowest offset a payload (and therefore a handle) can start at.
pub const FIRST_PAYLOAD_OFFSET: usize = FIRST_BLOCK_OFFSET + HEADER_SIZE;

/// Bytes at the end of the arena that never belong to a block.
pub const TAIL_GUARD_SIZE: usize = 1;

/// Bytes of a fresh arena not available as payload.
pub const ARENA_OVERHEAD: usize = SUPERBLOCK_SIZE + HEADER_SIZE + TAIL_GUARD_SIZE;

/// Flag byte of a block handed out by `allocate`.
pub const FLAG_IN_USE: u8 = b'Y';

/// Flag byte of a block available for allocation.
pub const FLAG_FREE: u8 = b'N';

/// Marker written to the superblock on initialization.
///
/// Neither byte is a valid flag, and both lie above the largest base-64
/// digit the codec ever writes.
pub const SENTINEL: [u8; 2] = [0xA5, 0x5A];

/// Status of a block as decoded from its flag byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockStatus {
    /// Handed out by `allocate`, not yet released.
    InUse,
    /// Available for allocation or merging.
    Free,
    /// Any other flag byte. Only seen when a handle does not point at a
    /// real payload, or the chain is corrupted.
    Unknown(u8),
}

impl BlockStatus {
    /// Decode a flag byte.
    pub fn from_flag(flag: u8) -> Self {
        match flag {
            FLAG_IN_USE => Self::InUse,
            FLAG_FREE => Self::Free,
            other => Self::Unknown(other),
        }
    }

    /// The flag byte for this status.
    pub fn flag(self) -> u8 {
        match self {
            Self::InUse => FLAG_IN_USE,
            Self::Free => FLAG_FREE,
            Self::Unknown(flag) => flag,
        }
    }

    /// Whether the block is available for allocation.
    pub fn is_free(self) -> bool {
        self == Self::Free
    }

    /// Whether the block is currently allocated.
    pub fn is_in_use(self) -> bool {
        self == Self::InUse
    }
}
