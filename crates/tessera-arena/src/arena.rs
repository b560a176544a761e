//! The arena allocator.
//!
//! [`Arena`] owns the byte buffer and drives the other modules: lazy
//! initialization, the free-space check, first-fit search with one
//! coalesce-and-retry, and the split policy on the way in; handle
//! validation, payload clearing and the counter credit on the way out.

use std::fmt;
use std::ops::Range;

use tracing::{debug, error, warn};

use crate::block::{self, BlockInfo, Blocks};
use crate::coalesce::{self, CoalesceReport};
use crate::config::ArenaConfig;
use crate::dump::ArenaDump;
use crate::error::{ArenaError, ConfigError};
use crate::handle::BlockHandle;
use crate::layout::{
    BlockStatus, FIRST_BLOCK_OFFSET, FIRST_PAYLOAD_OFFSET, FREE_SPACE_OFFSET, HEADER_SIZE,
};
use crate::locate;
use crate::superblock;

/// Summary of a well-formed block chain, returned by [`Arena::verify`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LayoutReport {
    /// Number of blocks in the chain.
    pub blocks: usize,
    /// Number of free blocks.
    pub free_blocks: usize,
    /// Total payload bytes of the free blocks.
    pub free_bytes: usize,
}

/// A first-fit allocator over a fixed byte arena.
///
/// All bookkeeping lives inside the arena itself: a four-byte superblock
/// followed by a chain of blocks, each a three-byte header and its
/// payload. Nothing is set up until the first [`Arena::allocate`].
///
/// Single-threaded: every operation takes `&self` or `&mut self` and runs
/// to completion. Callers that share an arena across threads wrap the
/// whole value in one lock.
pub struct Arena {
    config: ArenaConfig,
    bytes: Box<[u8]>,
}

impl Arena {
    /// Create an arena with the default 4096-byte capacity.
    pub fn new() -> Self {
        Self::from_valid_config(ArenaConfig::default())
    }

    /// Create an arena from a config, rejecting capacities the layout
    /// cannot represent.
    pub fn with_config(config: ArenaConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: ArenaConfig) -> Self {
        let bytes = vec![0u8; config.capacity].into_boxed_slice();
        Self { config, bytes }
    }

    /// The config this arena was built with.
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Total size of the arena in bytes.
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the superblock has been written, i.e. `allocate` has been
    /// called at least once.
    pub fn is_initialized(&self) -> bool {
        superblock::is_initialized(&self.bytes)
    }

    /// Free payload bytes recorded in the superblock, 0 before
    /// initialization.
    ///
    /// Headers of free blocks are not counted; they are reclaimed by
    /// [`Arena::coalesce`].
    pub fn free_space(&self) -> usize {
        if self.is_initialized() {
            superblock::free_space(&self.bytes)
        } else {
            0
        }
    }

    /// Allocate `size` bytes and return a handle to the payload.
    ///
    /// The payload may be larger than requested when the leftover tail of
    /// the chosen block is too small to become a block of its own.
    ///
    /// # Errors
    ///
    /// - [`ArenaError::InvalidSize`] if `size` is 0.
    /// - [`ArenaError::OutOfSpace`] if no free block fits, even after
    ///   coalescing.
    /// - [`ArenaError::Corrupted`] if the block metadata is inconsistent.
    pub fn allocate(&mut self, size: usize) -> Result<BlockHandle, ArenaError> {
        let result = self.allocate_block(size);
        if let Err(err) = &result {
            report_failure("allocate", err);
        }
        result
    }

    fn allocate_block(&mut self, size: usize) -> Result<BlockHandle, ArenaError> {
        let usable = self.config.usable_capacity();
        if superblock::lazy_init(&mut self.bytes, usable) {
            debug!(capacity = self.capacity(), usable, "arena initialized");
        }

        if size < 1 {
            return Err(ArenaError::InvalidSize { requested: size });
        }

        if superblock::free_space(&self.bytes) < size {
            self.try_coalesce()?;
            let available = superblock::free_space(&self.bytes);
            if available < size {
                return Err(ArenaError::OutOfSpace {
                    requested: size,
                    available,
                });
            }
        }

        let offset = match locate::find_first_fit(&self.bytes, size) {
            Some(offset) => offset,
            None => {
                self.try_coalesce()?;
                locate::find_first_fit(&self.bytes, size).ok_or_else(|| {
                    ArenaError::OutOfSpace {
                        requested: size,
                        available: superblock::free_space(&self.bytes),
                    }
                })?
            }
        };

        let placement = locate::claim(&mut self.bytes, offset, size)?;
        let handle = BlockHandle::from_offset(offset + HEADER_SIZE);
        debug!(size, offset = handle.offset(), ?placement, "allocated block");
        Ok(handle)
    }

    /// Release the block behind `handle`.
    ///
    /// Failures are reported through `tracing` and otherwise ignored; the
    /// arena is left untouched. Use [`Arena::try_release`] to observe them.
    pub fn release(&mut self, handle: BlockHandle) {
        let _ = self.try_release(handle);
    }

    /// Release the block behind `handle`, returning why it was refused.
    ///
    /// On success the payload is zeroed, the block is marked free and its
    /// size is credited to the free counter. Neighbouring free blocks are
    /// not merged until the next coalescing pass.
    ///
    /// # Errors
    ///
    /// - [`ArenaError::InvalidState`] if nothing has been allocated yet.
    /// - [`ArenaError::InvalidPointer`] if the handle is null or outside the
    ///   payload range.
    /// - [`ArenaError::DoubleFreeOrInvalid`] if the header before the handle
    ///   is not marked in use.
    pub fn try_release(&mut self, handle: BlockHandle) -> Result<(), ArenaError> {
        let result = self.release_block(handle);
        if let Err(err) = &result {
            report_failure("release", err);
        }
        result
    }

    fn release_block(&mut self, handle: BlockHandle) -> Result<(), ArenaError> {
        let payload = self.resolve(handle)?;
        let size = payload.len();
        superblock::credit_free_space(&mut self.bytes, size)?;
        self.bytes[payload.clone()].fill(0);
        block::set_status(&mut self.bytes, payload.start - HEADER_SIZE, BlockStatus::Free);
        debug!(offset = payload.start, size, "released block");
        Ok(())
    }

    /// Payload range of the in-use block behind `handle`.
    fn resolve(&self, handle: BlockHandle) -> Result<Range<usize>, ArenaError> {
        if !self.is_initialized() {
            return Err(ArenaError::InvalidState);
        }
        let offset = handle.offset();
        let end = block::chain_end(&self.bytes);
        if handle.is_null() || offset < FIRST_PAYLOAD_OFFSET || offset >= end {
            return Err(ArenaError::InvalidPointer { offset });
        }
        let header_offset = offset - HEADER_SIZE;
        let header = block::read_header(&self.bytes, header_offset);
        if !header.status.is_in_use() {
            return Err(ArenaError::DoubleFreeOrInvalid { offset });
        }
        if offset + header.size > end {
            return Err(ArenaError::Corrupted {
                offset: header_offset,
            });
        }
        Ok(offset..offset + header.size)
    }

    /// Read access to an in-use payload.
    ///
    /// Fails with the same errors as [`Arena::try_release`].
    pub fn payload(&self, handle: BlockHandle) -> Result<&[u8], ArenaError> {
        let range = self.resolve(handle)?;
        Ok(&self.bytes[range])
    }

    /// Write access to an in-use payload.
    ///
    /// Fails with the same errors as [`Arena::try_release`].
    pub fn payload_mut(&mut self, handle: BlockHandle) -> Result<&mut [u8], ArenaError> {
        let range = self.resolve(handle)?;
        Ok(&mut self.bytes[range])
    }

    /// Merge every run of adjacent free blocks.
    ///
    /// `allocate` calls this on its own when it runs short; calling it
    /// directly resets fragmentation between workloads. Does nothing on an
    /// uninitialized arena.
    ///
    /// A corrupted chain stops the pass at the offending block. The error is
    /// logged and the report still counts the merges made before it.
    pub fn coalesce(&mut self) -> CoalesceReport {
        let mut report = CoalesceReport::default();
        if let Err(err) = self.merge_free_runs(&mut report) {
            report_failure("coalesce", &err);
        }
        report
    }

    /// Coalescing pass for internal callers that must not mistake a
    /// corrupted chain for a merely fragmented one.
    pub(crate) fn try_coalesce(&mut self) -> Result<CoalesceReport, ArenaError> {
        let mut report = CoalesceReport::default();
        self.merge_free_runs(&mut report)?;
        Ok(report)
    }

    fn merge_free_runs(&mut self, report: &mut CoalesceReport) -> Result<(), ArenaError> {
        if !self.is_initialized() {
            return Ok(());
        }
        coalesce::coalesce_into(&mut self.bytes, report)?;
        debug!(
            merged = report.merged,
            reclaimed = report.reclaimed,
            "coalesced free blocks"
        );
        Ok(())
    }

    /// Iterate over the block chain. Empty before initialization.
    pub fn blocks(&self) -> Blocks<'_> {
        if self.is_initialized() {
            Blocks::new(&self.bytes)
        } else {
            Blocks::empty(&self.bytes)
        }
    }

    /// Check that the chain tiles the arena exactly and that the free
    /// counter matches the free blocks.
    ///
    /// # Errors
    ///
    /// [`ArenaError::InvalidState`] before initialization,
    /// [`ArenaError::Corrupted`] at the first inconsistency found.
    pub fn verify(&self) -> Result<LayoutReport, ArenaError> {
        if !self.is_initialized() {
            return Err(ArenaError::InvalidState);
        }
        let end = block::chain_end(&self.bytes);
        let mut report = LayoutReport::default();
        let mut expected = FIRST_BLOCK_OFFSET;

        for info in self.blocks() {
            check_block(&info, expected, end)?;
            if info.status.is_free() {
                report.free_blocks += 1;
                report.free_bytes += info.size;
            }
            report.blocks += 1;
            expected = info.end();
        }

        if expected != end {
            return Err(ArenaError::Corrupted { offset: expected });
        }
        if superblock::free_space(&self.bytes) != report.free_bytes {
            return Err(ArenaError::Corrupted {
                offset: FREE_SPACE_OFFSET,
            });
        }
        Ok(report)
    }

    /// Raw arena contents, metadata included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Render the first `max_bytes` bytes for inspection.
    pub fn dump(&self, max_bytes: usize) -> ArenaDump<'_> {
        ArenaDump::new(&self.bytes, max_bytes)
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("capacity", &self.capacity())
            .field("initialized", &self.is_initialized())
            .field("free_space", &self.free_space())
            .finish()
    }
}

fn check_block(info: &BlockInfo, expected: usize, end: usize) -> Result<(), ArenaError> {
    let well_formed = info.offset == expected
        && info.size > 0
        && info.end() <= end
        && !matches!(info.status, BlockStatus::Unknown(_));
    if well_formed {
        Ok(())
    } else {
        Err(ArenaError::Corrupted {
            offset: info.offset,
        })
    }
}

fn report_failure(operation: &'static str, err: &ArenaError) {
    match err {
        ArenaError::Corrupted { offset } => {
            error!(operation, offset = *offset, error = %err, "arena invariant violated");
        }
        _ => warn!(operation, error = %err, "request denied"),
    }
}
