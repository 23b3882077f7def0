//! Single-CPU allocator behavior: donation, exhaustion, sentinel fills,
//! shared frames, and the fatal misuse cases.

mod common;

use kernel_info::smp::MAX_CPUS;
use kernel_memory_addresses::{Frame, PhysAddr};
use kernel_pmm::{ALLOC_SENTINEL, FREE_SENTINEL, OutOfFrames};
use std::collections::HashSet;

#[test]
fn init_donates_every_frame_evenly() {
    let (pmm, _arena) = common::allocator(16);

    assert_eq!(pmm.free_frames(), 16);
    // round-robin donation: 16 frames over 8 banks
    assert_eq!(pmm.bank_depths(), [2; MAX_CPUS]);
}

#[test]
fn unaligned_region_edges_shrink_to_whole_frames() {
    common::install_cpus();
    let arena = common::Arena::new(4);

    let mut pmm = Box::new(kernel_pmm::FrameAllocator::new(common::IdentityMapper));
    // chop one byte off each end: first and last frames no longer fit whole
    pmm.init(arena.start + 1, PhysAddr::new(arena.end.as_u64() - 1));

    assert_eq!(pmm.free_frames(), 2);
    assert!(!pmm.is_managed(arena.start));
    assert!(pmm.is_managed(arena.start + Frame::SIZE));
}

#[test]
fn allocations_are_distinct_until_exhaustion() {
    let frames = 16;
    let (pmm, arena) = common::allocator(frames);

    let mut seen = HashSet::new();
    for _ in 0..frames {
        let pa = pmm.alloc().expect("frames remain");
        assert!(pa.is_frame_aligned());
        assert!(pmm.is_managed(pa));
        assert!(
            pa.as_u64() >= arena.start.as_u64() && pa.as_u64() < arena.end.as_u64(),
            "allocation escaped the managed region"
        );
        assert!(seen.insert(pa.as_u64()), "frame handed out twice");
    }

    assert_eq!(pmm.free_frames(), 0);
    assert_eq!(pmm.alloc(), Err(OutOfFrames));

    // exhaustion is recoverable: a free makes the next alloc succeed
    let pa = PhysAddr::new(*seen.iter().next().unwrap());
    pmm.free(pa);
    assert!(pmm.alloc().is_ok());
}

#[test]
fn frames_carry_the_sentinel_fills() {
    let (pmm, arena) = common::allocator(8);

    let pa = pmm.alloc().unwrap();
    assert!(
        arena.frame_bytes(pa).iter().all(|&b| b == ALLOC_SENTINEL),
        "freshly allocated frame must be filled with the allocation sentinel"
    );

    pmm.free(pa);
    assert!(
        arena.frame_bytes(pa).iter().all(|&b| b == FREE_SENTINEL),
        "released frame must be filled with the free sentinel"
    );
}

#[test]
fn alloc_zeroed_clears_the_frame() {
    let (pmm, arena) = common::allocator(8);

    let pa = pmm.alloc_zeroed().unwrap();
    assert!(arena.frame_bytes(pa).iter().all(|&b| b == 0));
}

#[test]
fn shared_frame_survives_until_the_last_owner() {
    let (pmm, arena) = common::allocator(8);
    let free_before = pmm.free_frames();

    // first owner
    let pa = pmm.alloc().unwrap();
    // second owner registers before building its mapping
    pmm.inc_ref(pa);

    // first owner lets go: frame stays allocated, contents untouched
    pmm.free(pa);
    assert_eq!(pmm.free_frames(), free_before - 1);
    assert!(arena.frame_bytes(pa).iter().all(|&b| b == ALLOC_SENTINEL));

    // last owner lets go: only now is the frame poisoned and recycled
    pmm.free(pa);
    assert_eq!(pmm.free_frames(), free_before);
    assert!(arena.frame_bytes(pa).iter().all(|&b| b == FREE_SENTINEL));
}

#[test]
fn frame_population_is_conserved() {
    let frames = 24;
    let (pmm, _arena) = common::allocator(frames);

    let mut held = Vec::new();
    for round in 0..3 {
        for _ in 0..(4 + round) {
            held.push(pmm.alloc().unwrap());
        }
        assert_eq!(pmm.free_frames() + held.len(), frames);
        held.drain(..2).for_each(|pa| pmm.free(pa));
        assert_eq!(pmm.free_frames() + held.len(), frames);
    }

    held.drain(..).for_each(|pa| pmm.free(pa));
    assert_eq!(pmm.free_frames(), frames);
}

#[test]
#[should_panic(expected = "unaligned frame address")]
fn free_of_unaligned_address_is_fatal() {
    let (pmm, _arena) = common::allocator(4);
    let pa = pmm.alloc().unwrap();
    pmm.free(pa + 1);
}

#[test]
#[should_panic(expected = "outside the managed region")]
fn free_of_foreign_address_is_fatal() {
    let (pmm, arena) = common::allocator(4);
    // frame-aligned, but below everything this allocator manages
    let foreign = PhysAddr::new(arena.start.as_u64() - Frame::SIZE);
    pmm.free(foreign);
}

#[test]
#[should_panic(expected = "double free")]
fn double_free_is_fatal() {
    let (pmm, _arena) = common::allocator(4);
    let pa = pmm.alloc().unwrap();
    pmm.free(pa);
    pmm.free(pa);
}

#[test]
#[should_panic(expected = "init called twice")]
fn reinitialization_is_fatal() {
    let (mut pmm, arena) = common::allocator(4);
    pmm.init(arena.start, arena.end);
}
