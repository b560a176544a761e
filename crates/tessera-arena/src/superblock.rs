//! Superblock: initialization marker and free-space counter.
//!
//! The counter holds the total payload bytes of all free blocks. Header
//! bytes are never counted, so it drops by a header's worth when a split
//! creates a block and rises by the same amount when the coalescer
//! absorbs one.

use crate::block;
use crate::codec::{self, MAX_ENCODABLE};
use crate::error::ArenaError;
use crate::layout::{
    BlockStatus, FIRST_BLOCK_OFFSET, FREE_SPACE_OFFSET, MARKER_OFFSET, SENTINEL,
};

/// Whether the marker bytes hold the sentinel.
pub fn is_initialized(bytes: &[u8]) -> bool {
    bytes[MARKER_OFFSET..MARKER_OFFSET + SENTINEL.len()] == SENTINEL
}

/// Initialize the arena if that has not happened yet.
///
/// Writes the sentinel, sets the counter to `usable` and lays down one free
/// block of `usable` bytes at [`FIRST_BLOCK_OFFSET`]. Returns `true` if
/// this call did the initialization.
pub fn lazy_init(bytes: &mut [u8], usable: usize) -> bool {
    if is_initialized(bytes) {
        return false;
    }
    bytes[MARKER_OFFSET..MARKER_OFFSET + SENTINEL.len()].copy_from_slice(&SENTINEL);
    codec::encode(bytes, FREE_SPACE_OFFSET, usable);
    block::write_header(bytes, FIRST_BLOCK_OFFSET, BlockStatus::Free, usable);
    true
}

/// Current value of the free-space counter.
pub fn free_space(bytes: &[u8]) -> usize {
    codec::decode(bytes, FREE_SPACE_OFFSET)
}

/// Add `n` bytes to the counter.
///
/// A total beyond the codec range means the chain and the counter
/// disagree; the counter is left untouched.
pub fn credit_free_space(bytes: &mut [u8], n: usize) -> Result<(), ArenaError> {
    let updated = free_space(bytes)
        .checked_add(n)
        .filter(|&total| total <= MAX_ENCODABLE)
        .ok_or(ArenaError::Corrupted {
            offset: FREE_SPACE_OFFSET,
        })?;
    codec::encode(bytes, FREE_SPACE_OFFSET, updated);
    Ok(())
}

/// Subtract `n` bytes from the counter.
///
/// Over-debiting is an invariant violation, reported as
/// [`ArenaError::Corrupted`] without touching the counter.
pub fn debit_free_space(bytes: &mut [u8], n: usize) -> Result<(), ArenaError> {
    let updated = free_space(bytes)
        .checked_sub(n)
        .ok_or(ArenaError::Corrupted {
            offset: FREE_SPACE_OFFSET,
        })?;
    codec::encode(bytes, FREE_SPACE_OFFSET, updated);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::FLAG_FREE;

    #[test]
    fn zeroed_buffer_is_not_initialized() {
        let bytes = [0u8; 64];
        assert!(!is_initialized(&bytes));
    }

    #[test]
    fn lazy_init_lays_down_one_free_block() {
        let mut bytes = vec![0u8; 64];
        assert!(lazy_init(&mut bytes, 56));
        assert!(is_initialized(&bytes));
        assert_eq!(free_space(&bytes), 56);
        assert_eq!(bytes[FIRST_BLOCK_OFFSET], FLAG_FREE);
        assert_eq!(codec::decode(&bytes, FIRST_BLOCK_OFFSET + 1), 56);
    }

    #[test]
    fn lazy_init_is_idempotent() {
        let mut bytes = vec![0u8; 64];
        lazy_init(&mut bytes, 56);
        debit_free_space(&mut bytes, 10).unwrap();
        assert!(!lazy_init(&mut bytes, 56));
        assert_eq!(free_space(&bytes), 46);
    }

    #[test]
    fn credit_and_debit_adjust_counter() {
        let mut bytes = vec![0u8; 64];
        lazy_init(&mut bytes, 56);
        debit_free_space(&mut bytes, 20).unwrap();
        credit_free_space(&mut bytes, 3).unwrap();
        assert_eq!(free_space(&bytes), 39);
    }

    #[test]
    fn over_debit_is_rejected_without_change() {
        let mut bytes = vec![0u8; 64];
        lazy_init(&mut bytes, 56);
        assert_eq!(
            debit_free_space(&mut bytes, 57),
            Err(ArenaError::Corrupted {
                offset: FREE_SPACE_OFFSET
            })
        );
        assert_eq!(free_space(&bytes), 56);
    }

    #[test]
    fn credit_past_codec_range_is_rejected() {
        let mut bytes = vec![0u8; 64];
        lazy_init(&mut bytes, MAX_ENCODABLE);
        assert!(credit_free_space(&mut bytes, 1).is_err());
        assert_eq!(free_space(&bytes), MAX_ENCODABLE);
    }
}
