//! Stress workloads and benchmark utilities for the Tessera arena.
//!
//! Six workloads exercise the allocator the way a heavy client would, each
//! through the public [`Arena`] API only:
//!
//! - [`Workload::A`]: allocate one byte and release it, 150 times
//! - [`Workload::B`]: three rounds of 50 one-byte allocations, then 50 releases
//! - [`Workload::C`]: random one-byte allocate/release until 50 are live
//! - [`Workload::D`]: as C with random sizes 1..=64
//! - [`Workload::E`]: fill the arena with every size in turn, then empty it
//! - [`Workload::F`]: every misuse the allocator must refuse without damage
//!
//! [`grind`] runs all six back to back for a number of rounds and records
//! how long each took.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::fmt;
use std::time::{Duration, Instant};

use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tessera_arena::{Arena, ArenaError, BlockHandle};
use thiserror::Error;
use tracing::{debug, info};

/// Number of live allocations workloads B, C and D build up to.
pub const LIVE_TARGET: usize = 50;

/// Largest request workload D makes.
pub const MAX_RANDOM_SIZE: usize = 64;

/// One of the six grind workloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Workload {
    /// Allocate and immediately release one byte, 150 times.
    A,
    /// Three rounds of 50 one-byte allocations followed by 50 releases.
    B,
    /// Random one-byte allocations and releases until 50 are live.
    C,
    /// Random allocations of 1..=64 bytes and releases until 50 are live.
    D,
    /// Fill and drain the arena with each size from 1 to the usable capacity.
    E,
    /// Invalid requests that must all be refused.
    F,
}

impl Workload {
    /// All workloads in the order [`grind`] runs them.
    pub const ALL: [Workload; 6] = [
        Workload::A,
        Workload::B,
        Workload::C,
        Workload::D,
        Workload::E,
        Workload::F,
    ];

    /// Criterion sample count for this workload. E sweeps every size, so
    /// it gets fewer samples than the default of 100.
    pub fn bench_sample_size(self) -> usize {
        match self {
            Workload::E => 10,
            _ => 100,
        }
    }
}

impl fmt::Display for Workload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A workload observed the allocator misbehaving.
#[derive(Debug, Error)]
pub enum GrindError {
    /// An allocation the workload expected to succeed was refused.
    #[error("workload {workload}: allocation of {size} bytes failed")]
    Allocation {
        /// Workload that made the request.
        workload: Workload,
        /// Requested size.
        size: usize,
        /// Why the arena refused.
        #[source]
        source: ArenaError,
    },
    /// A release the workload expected to succeed was refused.
    #[error("workload {workload}: release of {handle} failed")]
    Release {
        /// Workload that made the request.
        workload: Workload,
        /// Handle being released.
        handle: BlockHandle,
        /// Why the arena refused.
        #[source]
        source: ArenaError,
    },
    /// A payload still held data after its block was released.
    #[error("workload {workload}: payload at offset {offset} not cleared on release")]
    NotCleared {
        /// Workload that noticed.
        workload: Workload,
        /// Payload offset.
        offset: usize,
    },
    /// A request that should have been refused got a different answer.
    #[error("workload {workload}: {scenario}: expected {expected}, got {actual}")]
    UnexpectedOutcome {
        /// Workload that noticed.
        workload: Workload,
        /// What was attempted.
        scenario: &'static str,
        /// The refusal that should have happened.
        expected: ArenaError,
        /// What happened instead.
        actual: String,
    },
    /// The block chain failed verification after a workload.
    #[error("workload {workload}: arena layout invalid")]
    Layout {
        /// Workload that ran last.
        workload: Workload,
        /// Verification failure.
        #[source]
        source: ArenaError,
    },
}

/// Timing of one workload in one round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sample {
    /// Zero-based round number.
    pub round: usize,
    /// Workload measured.
    pub workload: Workload,
    /// Wall-clock time the workload took.
    pub elapsed: Duration,
}

/// Timings collected by [`grind`].
#[derive(Clone, Debug, Default)]
pub struct GrindReport {
    /// One sample per workload per round, in execution order.
    pub samples: Vec<Sample>,
}

impl GrindReport {
    /// Mean time of `workload` across all rounds, zero if it never ran.
    pub fn mean(&self, workload: Workload) -> Duration {
        let times: Vec<Duration> = self
            .samples
            .iter()
            .filter(|s| s.workload == workload)
            .map(|s| s.elapsed)
            .collect();
        match u32::try_from(times.len()) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(n) => times.iter().sum::<Duration>() / n,
        }
    }
}

/// Run every workload `rounds` times against `arena`, verifying the layout
/// after each one.
///
/// `seed` drives workloads C and D; round `r` uses `seed + r`.
pub fn grind(arena: &mut Arena, rounds: usize, seed: u64) -> Result<GrindReport, GrindError> {
    let mut report = GrindReport::default();
    for round in 0..rounds {
        let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(round as u64));
        for workload in Workload::ALL {
            let start = Instant::now();
            run_workload(arena, workload, &mut rng)?;
            let elapsed = start.elapsed();
            arena
                .verify()
                .map_err(|source| GrindError::Layout { workload, source })?;
            debug!(round, %workload, ?elapsed, "workload finished");
            report.samples.push(Sample {
                round,
                workload,
                elapsed,
            });
        }
    }
    for workload in Workload::ALL {
        info!(%workload, mean = ?report.mean(workload), "grind mean");
    }
    Ok(report)
}

/// Run a single workload.
pub fn run_workload(
    arena: &mut Arena,
    workload: Workload,
    rng: &mut ChaCha8Rng,
) -> Result<(), GrindError> {
    match workload {
        Workload::A => alloc_release_pairs(arena, 1, 150),
        Workload::B => batched_one_byte(arena),
        Workload::C => random_interleave(arena, rng, |_, _| Some(1), Workload::C),
        Workload::D => random_interleave(arena, rng, random_size, Workload::D),
        Workload::E => fill_every_size(arena),
        Workload::F => refuse_misuse(arena),
    }
}

/// Workload A: allocate `size` bytes and release them, `times` times.
pub fn alloc_release_pairs(
    arena: &mut Arena,
    size: usize,
    times: usize,
) -> Result<(), GrindError> {
    for _ in 0..times {
        let handle = allocate_marked(arena, size, Workload::A)?;
        release_checked(arena, handle, Workload::A)?;
    }
    Ok(())
}

/// Workload B.
pub fn batched_one_byte(arena: &mut Arena) -> Result<(), GrindError> {
    for _ in 0..3 {
        let mut handles = Vec::with_capacity(LIVE_TARGET);
        for _ in 0..LIVE_TARGET {
            handles.push(allocate_marked(arena, 1, Workload::B)?);
        }
        for handle in handles {
            release_checked(arena, handle, Workload::B)?;
        }
    }
    Ok(())
}

/// Workloads C and D: flip a coin between allocating `next_size` bytes and
/// releasing the most recent allocation until [`LIVE_TARGET`] are live,
/// then release them all.
///
/// `next_size` returns `None` when no request can be made, which ends the
/// build-up phase early. So does a request refused as out of space.
pub fn random_interleave<F>(
    arena: &mut Arena,
    rng: &mut ChaCha8Rng,
    mut next_size: F,
    workload: Workload,
) -> Result<(), GrindError>
where
    F: FnMut(&Arena, &mut ChaCha8Rng) -> Option<usize>,
{
    let mut live: Vec<BlockHandle> = Vec::with_capacity(LIVE_TARGET);
    while live.len() < LIVE_TARGET {
        if rng.next_u32() % 2 == 0 {
            let Some(size) = next_size(arena, rng) else {
                break;
            };
            match allocate_marked(arena, size, workload) {
                Ok(handle) => live.push(handle),
                // Enough bytes free but no run long enough, even after a merge.
                Err(GrindError::Allocation {
                    source: ArenaError::OutOfSpace { .. },
                    ..
                }) => break,
                Err(err) => return Err(err),
            }
        } else if let Some(handle) = live.pop() {
            release_checked(arena, handle, workload)?;
        }
    }
    for handle in live {
        release_checked(arena, handle, workload)?;
    }
    Ok(())
}

/// Size picker for workload D: uniform in `1..=64`, kept below the free
/// space so a single request never exceeds what the arena reports.
pub fn random_size(arena: &Arena, rng: &mut ChaCha8Rng) -> Option<usize> {
    let free = if arena.is_initialized() {
        arena.free_space()
    } else {
        arena.config().usable_capacity()
    };
    let cap = MAX_RANDOM_SIZE.min(free.saturating_sub(1));
    if cap == 0 {
        return None;
    }
    Some(rng.next_u32() as usize % cap + 1)
}

/// Workload E: for each size from 1 to the usable capacity, allocate as
/// many blocks as the counter allows (at most `usable / (size + 2) - 3`),
/// release them all and coalesce.
pub fn fill_every_size(arena: &mut Arena) -> Result<(), GrindError> {
    arena.coalesce();
    let usable = arena.config().usable_capacity();
    for size in 1..=usable {
        let rounds = (usable / (size + 2)).saturating_sub(3);
        let mut handles = Vec::with_capacity(rounds);
        for _ in 0..rounds {
            if arena.is_initialized() && size > arena.free_space() {
                break;
            }
            handles.push(allocate_marked(arena, size, Workload::E)?);
        }
        for handle in handles {
            release_checked(arena, handle, Workload::E)?;
        }
        arena.coalesce();
    }
    Ok(())
}

/// Workload F: every request below must be refused and leave the arena
/// usable.
pub fn refuse_misuse(arena: &mut Arena) -> Result<(), GrindError> {
    let capacity = arena.capacity();
    let p = allocate_marked(arena, 200, Workload::F)?;

    let far = BlockHandle::from_offset(capacity + 4096);
    expect_release_refused(
        arena,
        far,
        "release of a foreign address",
        ArenaError::InvalidPointer {
            offset: far.offset(),
        },
    )?;

    let interior = BlockHandle::from_offset(p.offset() + 10);
    expect_release_refused(
        arena,
        interior,
        "release inside a payload",
        ArenaError::DoubleFreeOrInvalid {
            offset: interior.offset(),
        },
    )?;

    let beyond = BlockHandle::from_offset(p.offset() + capacity);
    expect_release_refused(
        arena,
        beyond,
        "release past the arena",
        ArenaError::InvalidPointer {
            offset: beyond.offset(),
        },
    )?;

    release_checked(arena, p, Workload::F)?;
    expect_release_refused(
        arena,
        p,
        "second release",
        ArenaError::DoubleFreeOrInvalid { offset: p.offset() },
    )?;

    expect_allocate_refused(
        arena,
        0,
        "zero-byte request",
        ArenaError::InvalidSize { requested: 0 },
    )?;
    expect_out_of_space(arena, usize::MAX, "request of usize::MAX bytes")?;

    expect_release_refused(
        arena,
        BlockHandle::NULL,
        "release of null",
        ArenaError::InvalidPointer { offset: 0 },
    )?;

    expect_out_of_space(arena, capacity + 1, "request larger than the arena")?;
    let usable = arena.config().usable_capacity();
    expect_out_of_space(arena, usable + 1, "request one past usable")?;
    Ok(())
}

// ── Helpers ─────────────────────────────────────────────────────

fn allocate_marked(
    arena: &mut Arena,
    size: usize,
    workload: Workload,
) -> Result<BlockHandle, GrindError> {
    let handle = arena
        .allocate(size)
        .map_err(|source| GrindError::Allocation {
            workload,
            size,
            source,
        })?;
    if let Ok(payload) = arena.payload_mut(handle) {
        payload[0] = b'1';
    }
    Ok(handle)
}

fn release_checked(
    arena: &mut Arena,
    handle: BlockHandle,
    workload: Workload,
) -> Result<(), GrindError> {
    let len = arena.payload(handle).map(<[u8]>::len).unwrap_or(0);
    arena
        .try_release(handle)
        .map_err(|source| GrindError::Release {
            workload,
            handle,
            source,
        })?;
    let start = handle.offset();
    if arena.as_bytes()[start..start + len].iter().any(|&b| b != 0) {
        return Err(GrindError::NotCleared {
            workload,
            offset: start,
        });
    }
    Ok(())
}

fn expect_release_refused(
    arena: &mut Arena,
    handle: BlockHandle,
    scenario: &'static str,
    expected: ArenaError,
) -> Result<(), GrindError> {
    match arena.try_release(handle) {
        Err(err) if err == expected => Ok(()),
        other => Err(GrindError::UnexpectedOutcome {
            workload: Workload::F,
            scenario,
            expected,
            actual: format!("{other:?}"),
        }),
    }
}

fn expect_allocate_refused(
    arena: &mut Arena,
    size: usize,
    scenario: &'static str,
    expected: ArenaError,
) -> Result<(), GrindError> {
    match arena.allocate(size) {
        Err(err) if err == expected => Ok(()),
        other => Err(GrindError::UnexpectedOutcome {
            workload: Workload::F,
            scenario,
            expected,
            actual: format!("{other:?}"),
        }),
    }
}

fn expect_out_of_space(
    arena: &mut Arena,
    size: usize,
    scenario: &'static str,
) -> Result<(), GrindError> {
    match arena.allocate(size) {
        Err(ArenaError::OutOfSpace { .. }) => Ok(()),
        other => Err(GrindError::UnexpectedOutcome {
            workload: Workload::F,
            scenario,
            expected: ArenaError::OutOfSpace {
                requested: size,
                available: arena.free_space(),
            },
            actual: format!("{other:?}"),
        }),
    }
}
