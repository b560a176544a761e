//! Integration tests for the allocator's observable properties.
//!
//! Everything here goes through the public API only: allocate, release,
//! coalesce and the read-only diagnostics.

use tessera_arena::layout::{FIRST_PAYLOAD_OFFSET, HEADER_SIZE};
use tessera_arena::{Arena, ArenaConfig, ArenaError, BlockHandle, BlockStatus};

// ── Helpers ─────────────────────────────────────────────────────

const USABLE: usize = 4088;

fn initialized_arena() -> Arena {
    let mut arena = Arena::new();
    // allocate(0) initializes the arena and hands nothing out.
    let _ = arena.allocate(0);
    arena
}

fn layout(arena: &Arena) -> Vec<(BlockStatus, usize)> {
    arena.blocks().map(|b| (b.status, b.size)).collect()
}

// ── Round trip ──────────────────────────────────────────────────

#[test]
fn release_then_coalesce_restores_counter() {
    for size in [1, 2, 3, 4, 17, 512, 4084, 4085, 4087, USABLE] {
        let mut arena = initialized_arena();
        let before = arena.free_space();
        let handle = arena.allocate(size).unwrap();
        arena.release(handle);
        arena.coalesce();
        assert_eq!(arena.free_space(), before, "size {size}");
        assert_eq!(layout(&arena), vec![(BlockStatus::Free, USABLE)]);
    }
}

#[test]
fn release_without_split_restores_counter_immediately() {
    // Whole-block allocations create no header, so nothing waits on the
    // coalescer.
    for size in [4085, 4086, 4087, USABLE] {
        let mut arena = initialized_arena();
        let handle = arena.allocate(size).unwrap();
        arena.release(handle);
        assert_eq!(arena.free_space(), USABLE, "size {size}");
    }
}

#[test]
fn release_after_split_holds_back_one_header() {
    let mut arena = initialized_arena();
    let handle = arena.allocate(100).unwrap();
    arena.release(handle);
    assert_eq!(arena.free_space(), USABLE - HEADER_SIZE);
    assert_eq!(arena.verify().unwrap().free_blocks, 2);
}

// ── Coalescing ──────────────────────────────────────────────────

#[test]
fn coalescing_twice_changes_nothing_the_second_time() {
    let mut arena = initialized_arena();
    let handles: Vec<_> = (1..=12).map(|s| arena.allocate(s * 3).unwrap()).collect();
    for handle in handles.iter().step_by(3) {
        arena.release(*handle);
    }
    arena.release(handles[1]);
    arena.coalesce();
    let bytes = arena.as_bytes().to_vec();
    let counter = arena.free_space();

    let second = arena.coalesce();
    assert_eq!(second.merged, 0);
    assert_eq!(arena.as_bytes(), &bytes[..]);
    assert_eq!(arena.free_space(), counter);
}

#[test]
fn many_small_blocks_coalesce_back_to_one() {
    for n in [1, 2, 50, 500, 1021] {
        let mut arena = Arena::new();
        let handles: Vec<_> = (0..n).map(|_| arena.allocate(1).unwrap()).collect();
        for handle in handles {
            arena.release(handle);
        }
        arena.coalesce();
        assert_eq!(layout(&arena), vec![(BlockStatus::Free, USABLE)], "n = {n}");
        assert_eq!(arena.free_space(), USABLE);
        arena.verify().unwrap();
    }
}

// ── Fragmentation ───────────────────────────────────────────────

#[test]
fn fragmented_free_space_is_merged_and_retried() {
    let mut arena = Arena::new();
    let a = arena.allocate(100).unwrap();
    let b = arena.allocate(100).unwrap();
    let rest = arena.free_space();
    arena.allocate(rest).unwrap();
    arena.release(a);
    arena.release(b);

    // The counter covers the request, but no single block does.
    assert_eq!(arena.free_space(), 200);
    assert_eq!(
        layout(&arena),
        vec![
            (BlockStatus::Free, 100),
            (BlockStatus::Free, 100),
            (BlockStatus::InUse, rest),
        ]
    );

    let handle = arena.allocate(150).unwrap();
    assert_eq!(handle, a);
    assert_eq!(arena.free_space(), 50);
    arena.verify().unwrap();
}

#[test]
fn free_space_split_by_a_live_block_is_out_of_space() {
    let mut arena = Arena::new();
    let a = arena.allocate(100).unwrap();
    let _sep = arena.allocate(1).unwrap();
    let b = arena.allocate(100).unwrap();
    let rest = arena.free_space();
    arena.allocate(rest).unwrap();
    arena.release(a);
    arena.release(b);

    assert_eq!(
        arena.allocate(150),
        Err(ArenaError::OutOfSpace {
            requested: 150,
            available: 200
        })
    );
    let report = arena.verify().unwrap();
    assert_eq!(report.free_blocks, 2);
    assert_eq!(report.free_bytes, 200);
}

// ── First fit ───────────────────────────────────────────────────

#[test]
fn first_fit_prefers_earlier_block_over_exact_fit() {
    let mut arena = Arena::new();
    let ten = arena.allocate(10).unwrap();
    let _sep1 = arena.allocate(1).unwrap();
    let five = arena.allocate(5).unwrap();
    let _sep2 = arena.allocate(1).unwrap();
    let twenty = arena.allocate(20).unwrap();
    let _sep3 = arena.allocate(1).unwrap();
    arena.release(ten);
    arena.release(five);
    arena.release(twenty);

    let handle = arena.allocate(5).unwrap();
    assert_eq!(handle, ten);
    // The 10-byte block was split: 5 in use, then a 2-byte free remainder.
    assert_eq!(
        layout(&arena)[..3],
        [
            (BlockStatus::InUse, 5),
            (BlockStatus::Free, 2),
            (BlockStatus::InUse, 1),
        ]
    );
}

#[test]
fn first_fit_absorbs_remainder_too_small_for_a_header() {
    let mut arena = Arena::new();
    let a = arena.allocate(8).unwrap();
    let _sep = arena.allocate(1).unwrap();
    arena.release(a);
    let b = arena.allocate(5).unwrap();
    assert_eq!(b, a);
    assert_eq!(arena.payload(b).unwrap().len(), 8);
}

// ── Boundaries ──────────────────────────────────────────────────

#[test]
fn zero_size_is_invalid() {
    let mut arena = Arena::new();
    assert_eq!(arena.allocate(0), Err(ArenaError::InvalidSize { requested: 0 }));
}

#[test]
fn one_byte_over_capacity_is_out_of_space() {
    let mut arena = Arena::new();
    assert_eq!(
        arena.allocate(USABLE + 1),
        Err(ArenaError::OutOfSpace {
            requested: USABLE + 1,
            available: USABLE
        })
    );
    assert!(arena.allocate(USABLE).is_ok());
}

#[test]
fn huge_requests_are_out_of_space() {
    let mut arena = Arena::new();
    assert!(matches!(
        arena.allocate(usize::MAX),
        Err(ArenaError::OutOfSpace { .. })
    ));
    assert!(matches!(
        arena.allocate(4097),
        Err(ArenaError::OutOfSpace { .. })
    ));
}

#[test]
fn null_release_is_invalid_pointer() {
    let mut arena = initialized_arena();
    assert_eq!(
        arena.try_release(BlockHandle::NULL),
        Err(ArenaError::InvalidPointer { offset: 0 })
    );
}

#[test]
fn second_release_is_double_free() {
    let mut arena = Arena::new();
    let handle = arena.allocate(12).unwrap();
    assert_eq!(arena.try_release(handle), Ok(()));
    assert_eq!(
        arena.try_release(handle),
        Err(ArenaError::DoubleFreeOrInvalid {
            offset: handle.offset()
        })
    );
}

#[test]
fn handle_past_the_end_is_invalid_pointer() {
    let mut arena = Arena::new();
    let handle = arena.allocate(200).unwrap();
    let past = BlockHandle::from_offset(handle.offset() + 4096);
    assert_eq!(
        arena.try_release(past),
        Err(ArenaError::InvalidPointer {
            offset: past.offset()
        })
    );
    assert!(arena.payload(handle).is_ok());
}

// ── Exhaustion ──────────────────────────────────────────────────

#[test]
fn one_byte_allocations_exhaust_after_capacity_over_four() {
    let mut arena = Arena::new();
    let mut count = 0;
    let err = loop {
        match arena.allocate(1) {
            Ok(_) => count += 1,
            Err(err) => break err,
        }
    };
    assert_eq!(count, USABLE / (1 + HEADER_SIZE));
    assert_eq!(
        err,
        ArenaError::OutOfSpace {
            requested: 1,
            available: 0
        }
    );
    // The last block soaked up the 3-byte tail it could not split off.
    let last = arena.blocks().last().unwrap();
    assert_eq!(last.size, 4);
    assert_eq!(last.status, BlockStatus::InUse);
    arena.verify().unwrap();
}

#[test]
fn exhaustion_count_is_deterministic() {
    let run = || {
        let mut arena = Arena::new();
        std::iter::from_fn(|| arena.allocate(1).ok()).count()
    };
    assert_eq!(run(), run());
}

#[test]
fn small_arena_exhausts_too() {
    let mut arena = Arena::with_config(ArenaConfig::new(48)).unwrap();
    let count = std::iter::from_fn(|| arena.allocate(1).ok()).count();
    assert_eq!(count, (48 - 8) / 4);
}

// ── Use after free ──────────────────────────────────────────────

#[test]
fn released_payload_reads_back_zero() {
    let mut arena = Arena::new();
    let handle = arena.allocate(64).unwrap();
    arena.payload_mut(handle).unwrap().fill(b'1');
    arena.release(handle);
    let start = handle.offset();
    assert!(arena.as_bytes()[start..start + 64].iter().all(|&b| b == 0));
}

#[test]
fn first_handle_starts_after_superblock_and_header() {
    let mut arena = Arena::new();
    assert_eq!(arena.allocate(1).unwrap().offset(), FIRST_PAYLOAD_OFFSET);
}
