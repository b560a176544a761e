//! First-fit block selection and the split policy.
//!
//! The scan returns the first free block large enough for the request in
//! offset order. It never keeps looking for a tighter fit.

use crate::block;
use crate::error::ArenaError;
use crate::layout::{BlockStatus, FIRST_BLOCK_OFFSET, HEADER_SIZE};
use crate::superblock;

/// How a free block was turned into an allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// The block was exactly the requested size.
    Exact,
    /// The tail of the block became a new free block.
    Split {
        /// Header offset of the new free block.
        remainder_offset: usize,
        /// Payload size of the new free block.
        remainder_size: usize,
    },
    /// The tail was too small for its own header and was handed out with
    /// the allocation.
    Absorbed {
        /// Extra bytes beyond the request.
        slack: usize,
    },
}

/// Header offset of the first free block with at least `size` payload bytes.
///
/// Stops early at a block whose size decodes as 0, since the chain cannot
/// be followed past it.
pub fn find_first_fit(bytes: &[u8], size: usize) -> Option<usize> {
    let end = block::chain_end(bytes);
    let mut offset = FIRST_BLOCK_OFFSET;
    while block::has_block_at(offset, end) {
        let header = block::read_header(bytes, offset);
        if header.status.is_free() && header.size >= size {
            return Some(offset);
        }
        if header.size == 0 {
            break;
        }
        offset = block::next_offset(offset, header.size);
    }
    None
}

/// Mark the free block at `offset` in use for a request of `size` bytes.
///
/// Splits off the tail as a new free block when it can hold a header and at
/// least one byte, otherwise hands the whole block out. Debits the
/// superblock counter by the payload given away plus any new header. All
/// checks run before the first write, so an error leaves the arena as it
/// was.
pub fn claim(bytes: &mut [u8], offset: usize, size: usize) -> Result<Placement, ArenaError> {
    let header = block::read_header(bytes, offset);
    if !header.status.is_free() || header.size == 0 || header.size < size {
        return Err(ArenaError::Corrupted { offset });
    }
    if block::next_offset(offset, header.size) > block::chain_end(bytes) {
        return Err(ArenaError::Corrupted { offset });
    }

    let remainder = header.size - size;
    let (placement, debit, granted) = if remainder == 0 {
        (Placement::Exact, size, size)
    } else if remainder > HEADER_SIZE {
        let placement = Placement::Split {
            remainder_offset: block::next_offset(offset, size),
            remainder_size: remainder - HEADER_SIZE,
        };
        (placement, size + HEADER_SIZE, size)
    } else {
        (Placement::Absorbed { slack: remainder }, header.size, header.size)
    };

    superblock::debit_free_space(bytes, debit)?;
    block::write_header(bytes, offset, BlockStatus::InUse, granted);
    if let Placement::Split {
        remainder_offset,
        remainder_size,
    } = placement
    {
        block::write_header(bytes, remainder_offset, BlockStatus::Free, remainder_size);
    }
    Ok(placement)
}
