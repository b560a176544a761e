//! Arena configuration parameters.

use crate::codec::MAX_ENCODABLE;
use crate::error::ConfigError;
use crate::layout::ARENA_OVERHEAD;

/// Configuration for an [`Arena`](crate::Arena).
///
/// Validated at construction; the arena never resizes afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Total size of the arena in bytes, metadata included.
    ///
    /// Default: 4096, which leaves 4088 bytes of payload in a fresh arena.
    pub capacity: usize,
}

impl ArenaConfig {
    /// Default arena size in bytes.
    pub const DEFAULT_CAPACITY: usize = 4096;

    /// Smallest capacity that still holds a one-byte block.
    pub const MIN_CAPACITY: usize = ARENA_OVERHEAD + 1;

    /// Largest capacity whose free space the size codec can represent.
    pub const MAX_CAPACITY: usize = ARENA_OVERHEAD + MAX_ENCODABLE;

    /// Create a config for an arena of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    /// Check that the capacity is within `[MIN_CAPACITY, MAX_CAPACITY]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity < Self::MIN_CAPACITY {
            return Err(ConfigError::CapacityTooSmall {
                capacity: self.capacity,
                minimum: Self::MIN_CAPACITY,
            });
        }
        if self.capacity > Self::MAX_CAPACITY {
            return Err(ConfigError::CapacityTooLarge {
                capacity: self.capacity,
                maximum: Self::MAX_CAPACITY,
            });
        }
        Ok(())
    }

    /// Payload bytes available in a freshly initialized arena.
    pub fn usable_capacity(&self) -> usize {
        self.capacity.saturating_sub(ARENA_OVERHEAD)
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
