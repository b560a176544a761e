//! Arena-specific error types.

use thiserror::Error;

/// Errors that can occur during arena operations.
///
/// None of these are fatal: a failed `allocate` hands nothing out and a
/// failed release leaves the arena untouched.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ArenaError {
    /// `allocate` was asked for fewer than one byte.
    #[error("invalid size requested: {requested} bytes")]
    InvalidSize {
        /// Number of bytes requested.
        requested: usize,
    },
    /// No free block can hold the request, even after coalescing.
    #[error("not enough space: requested {requested} bytes, {available} available")]
    OutOfSpace {
        /// Number of bytes requested.
        requested: usize,
        /// Free payload bytes recorded in the superblock.
        available: usize,
    },
    /// A release or lookup was attempted before anything was allocated.
    #[error("arena not initialized: nothing has been allocated yet")]
    InvalidState,
    /// The handle is null or lies outside the payload range of the arena.
    #[error("invalid handle: offset {offset} is outside the payload range")]
    InvalidPointer {
        /// Offset carried by the handle.
        offset: usize,
    },
    /// The header before the handle is not marked in use. Covers a second
    /// release of the same handle and offsets never returned by `allocate`.
    #[error("handle at offset {offset} is not in use (double release or foreign handle)")]
    DoubleFreeOrInvalid {
        /// Offset carried by the handle.
        offset: usize,
    },
    /// Block metadata contradicts the arena's invariants.
    #[error("arena metadata corrupted at offset {offset}")]
    Corrupted {
        /// Offset of the offending header or superblock field.
        offset: usize,
    },
}

/// Errors from validating an [`ArenaConfig`](crate::ArenaConfig).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The arena cannot hold the superblock plus a one-byte block.
    #[error("arena capacity {capacity} is below the minimum of {minimum} bytes")]
    CapacityTooSmall {
        /// Requested capacity.
        capacity: usize,
        /// Smallest accepted capacity.
        minimum: usize,
    },
    /// The usable capacity would not fit in the two-byte size field.
    #[error("arena capacity {capacity} exceeds the maximum of {maximum} bytes")]
    CapacityTooLarge {
        /// Requested capacity.
        capacity: usize,
        /// Largest accepted capacity.
        maximum: usize,
    },
}
