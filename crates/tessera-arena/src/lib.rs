//! First-fit allocation over a fixed byte arena.
//!
//! A single owned buffer holds both the data handed out to callers and all
//! of the allocator's bookkeeping. Sizes are stored in-band with a two-byte
//! base-64 codec, blocks are found first-fit, split when the leftover can
//! hold a header, and merged lazily when allocation runs short.
//!
//! # Architecture
//!
//! ```text
//! Arena (owned Box<[u8]>, lazily initialized)
//! ├── superblock  marker + free-space counter (bytes 0..4)
//! ├── block       header read/write, chain iterator
//! │   └── codec   two-byte size field
//! ├── locate      first-fit search, split/absorb policy
//! ├── coalesce    merge runs of adjacent free blocks
//! └── dump        raw byte rendering for debugging
//! ```
//!
//! # Example
//!
//! ```
//! use tessera_arena::Arena;
//!
//! let mut arena = Arena::new();
//! let handle = arena.allocate(16).unwrap();
//! arena.payload_mut(handle).unwrap()[0] = 42;
//! arena.release(handle);
//! assert!(arena.as_bytes()[handle.offset()..][..16].iter().all(|&b| b == 0));
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod arena;
pub mod block;
pub mod codec;
pub mod coalesce;
pub mod config;
pub mod dump;
pub mod error;
pub mod handle;
pub mod layout;
pub mod locate;
pub mod superblock;

// Public re-exports for the primary API surface.
pub use arena::{Arena, LayoutReport};
pub use block::BlockInfo;
pub use coalesce::CoalesceReport;
pub use config::ArenaConfig;
pub use error::{ArenaError, ConfigError};
pub use handle::BlockHandle;
pub use layout::BlockStatus;
