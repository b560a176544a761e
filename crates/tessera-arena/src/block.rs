//! Block headers and the block chain.
//!
//! Every block is `HEADER_SIZE` bytes of header followed by exactly `size`
//! bytes of payload. The next block starts right after the payload, so the
//! chain is walked by repeatedly adding `HEADER_SIZE + size`.

use crate::codec;
use crate::layout::{BlockStatus, FIRST_BLOCK_OFFSET, FLAG_SIZE, HEADER_SIZE, TAIL_GUARD_SIZE};

/// Decoded block header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    /// Status flag.
    pub status: BlockStatus,
    /// Payload size in bytes.
    pub size: usize,
}

/// A block located in the chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
    /// Offset of the block header.
    pub offset: usize,
    /// Status flag.
    pub status: BlockStatus,
    /// Payload size in bytes.
    pub size: usize,
}

impl BlockInfo {
    /// Offset of the first payload byte.
    pub fn payload_offset(&self) -> usize {
        self.offset + HEADER_SIZE
    }

    /// Offset one past the last payload byte, i.e. where the next block starts.
    pub fn end(&self) -> usize {
        next_offset(self.offset, self.size)
    }
}

/// Offset one past the last byte the chain may use.
pub fn chain_end(bytes: &[u8]) -> usize {
    bytes.len().saturating_sub(TAIL_GUARD_SIZE)
}

/// Whether a block starting at `offset` leaves room for its header and at
/// least one payload byte before `end`.
///
/// Every scan over the chain stops at the first offset where this is false.
pub fn has_block_at(offset: usize, end: usize) -> bool {
    offset + HEADER_SIZE < end
}

/// Offset of the block following one at `offset` with `size` payload bytes.
pub fn next_offset(offset: usize, size: usize) -> usize {
    offset + HEADER_SIZE + size
}

/// Read the header at `offset`.
pub fn read_header(bytes: &[u8], offset: usize) -> BlockHeader {
    BlockHeader {
        status: BlockStatus::from_flag(bytes[offset]),
        size: codec::decode(bytes, offset + FLAG_SIZE),
    }
}

/// Write a full header at `offset`.
pub fn write_header(bytes: &mut [u8], offset: usize, status: BlockStatus, size: usize) {
    bytes[offset] = status.flag();
    codec::encode(bytes, offset + FLAG_SIZE, size);
}

/// Overwrite only the status flag at `offset`.
pub fn set_status(bytes: &mut [u8], offset: usize, status: BlockStatus) {
    bytes[offset] = status.flag();
}

/// Overwrite only the encoded size at `offset`.
pub fn set_size(bytes: &mut [u8], offset: usize, size: usize) {
    codec::encode(bytes, offset + FLAG_SIZE, size);
}

/// Zero the header at `offset`, clipped to the buffer.
pub fn clear_header(bytes: &mut [u8], offset: usize) {
    let end = (offset + HEADER_SIZE).min(bytes.len());
    bytes[offset..end].fill(0);
}

/// Iterator over the block chain of an initialized arena.
///
/// Stops at the end of the chain, after a block whose size decodes as 0,
/// or after a block that runs past the end of the chain. Callers that
/// need the chain to be well formed check the last block's `end()`.
pub struct Blocks<'a> {
    bytes: &'a [u8],
    cursor: usize,
    done: bool,
}

impl<'a> Blocks<'a> {
    /// Walk the chain starting at [`FIRST_BLOCK_OFFSET`].
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            cursor: FIRST_BLOCK_OFFSET,
            done: false,
        }
    }

    /// An iterator that yields nothing.
    pub(crate) fn empty(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            cursor: FIRST_BLOCK_OFFSET,
            done: true,
        }
    }
}

impl Iterator for Blocks<'_> {
    type Item = BlockInfo;

    fn next(&mut self) -> Option<BlockInfo> {
        let end = chain_end(self.bytes);
        if self.done || !has_block_at(self.cursor, end) {
            return None;
        }
        let header = read_header(self.bytes, self.cursor);
        let info = BlockInfo {
            offset: self.cursor,
            status: header.status,
            size: header.size,
        };
        if header.size == 0 || info.end() > end {
            self.done = true;
        } else {
            self.cursor = info.end();
        }
        Some(info)
    }
}
