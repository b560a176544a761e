//! Merging of adjacent free blocks.
//!
//! Releasing a block never merges it with its neighbours. Runs of free
//! blocks accumulate until `allocate` runs short of space (or a caller
//! asks explicitly), then a single pass folds each run into its first
//! block and credits the absorbed headers back to the free counter.

use crate::block;
use crate::error::ArenaError;
use crate::layout::{FIRST_BLOCK_OFFSET, HEADER_SIZE};
use crate::superblock;

/// Outcome of a coalescing pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CoalesceReport {
    /// Number of blocks absorbed into a preceding free block.
    pub merged: usize,
    /// Header bytes returned to the free counter.
    pub reclaimed: usize,
}

/// Merge every run of adjacent free blocks in one pass over the chain.
///
/// Each merge is complete (size, cleared header and counter) before the
/// next block is looked at, so an error part-way leaves a consistent chain
/// up to the offending block.
pub fn coalesce(bytes: &mut [u8]) -> Result<CoalesceReport, ArenaError> {
    let mut report = CoalesceReport::default();
    coalesce_into(bytes, &mut report)?;
    Ok(report)
}

/// Like [`coalesce`], but tallies into `report` as it goes so the merges
/// done before an error are still counted.
pub fn coalesce_into(bytes: &mut [u8], report: &mut CoalesceReport) -> Result<(), ArenaError> {
    let end = block::chain_end(bytes);
    let mut run_start: Option<usize> = None;
    let mut offset = FIRST_BLOCK_OFFSET;

    while block::has_block_at(offset, end) {
        let header = block::read_header(bytes, offset);
        let next = block::next_offset(offset, header.size);
        if next > end {
            return Err(ArenaError::Corrupted { offset });
        }

        if !header.status.is_free() {
            run_start = None;
        } else if let Some(start) = run_start {
            let merged = block::read_header(bytes, start).size + HEADER_SIZE + header.size;
            superblock::credit_free_space(bytes, HEADER_SIZE)?;
            block::set_size(bytes, start, merged);
            block::clear_header(bytes, offset);
            report.merged += 1;
            report.reclaimed += HEADER_SIZE;
        } else {
            run_start = Some(offset);
        }
        offset = next;
    }

    Ok(())
}
