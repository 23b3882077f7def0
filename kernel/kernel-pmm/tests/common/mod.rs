//! Shared scaffolding for the hosted allocator tests: an aligned arena of
//! fake "physical" memory, an identity [`PhysMapper`] over it, and a
//! preemption provider that turns each test thread into one logical CPU.
#![allow(dead_code)]

use kernel_memory_addresses::{Frame, PhysAddr};
use kernel_pmm::{FrameAllocator, PhysMapper};
use kernel_sync::{CpuId, PreemptionOps};
use std::cell::Cell;

/// Identity translation: in these tests a "physical" address is simply the
/// host address of arena memory.
pub struct IdentityMapper;

impl PhysMapper for IdentityMapper {
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysAddr) -> &'a mut T {
        let va = pa.as_u64() as usize as *mut T;
        // SAFETY: test arenas are live for the whole test (leaked), and the
        // allocator upholds the exclusivity side of the contract.
        unsafe { &mut *va }
    }
}

#[repr(align(4096))]
#[derive(Copy, Clone)]
struct FrameBuf([u8; 4096]);

/// A leaked, frame-aligned block of host memory posing as physical RAM.
pub struct Arena {
    pub start: PhysAddr,
    pub end: PhysAddr,
    pub frames: usize,
}

impl Arena {
    pub fn new(frames: usize) -> Self {
        let buf = vec![FrameBuf([0; 4096]); frames].into_boxed_slice();
        // leak: the allocator keeps raw views into this for the whole test
        let base = Box::into_raw(buf).cast::<u8>() as u64;
        Self {
            start: PhysAddr::new(base),
            end: PhysAddr::new(base + (frames as u64) * Frame::SIZE),
            frames,
        }
    }

    /// Read back the current contents of the frame at `pa`.
    pub fn frame_bytes(&self, pa: PhysAddr) -> &[u8] {
        assert!(pa.as_u64() >= self.start.as_u64() && pa.as_u64() < self.end.as_u64());
        // SAFETY: within the leaked arena; tests only call this while no
        // allocator write to the same frame is in flight.
        unsafe { std::slice::from_raw_parts(pa.as_u64() as usize as *const u8, 4096) }
    }
}

/// An initialized allocator over a fresh arena of `frames` frames.
pub fn allocator(frames: usize) -> (Box<FrameAllocator<IdentityMapper>>, Arena) {
    install_cpus();
    let arena = Arena::new(frames);
    let mut pmm = Box::new(FrameAllocator::new(IdentityMapper));
    pmm.init(arena.start, arena.end);
    (pmm, arena)
}

thread_local! {
    static THREAD_CPU: Cell<usize> = const { Cell::new(0) };
}

struct ThreadCpu;

impl PreemptionOps for ThreadCpu {
    fn disable(&self) -> CpuId {
        CpuId::new(THREAD_CPU.get())
    }

    fn enable(&self) {}
}

static PROVIDER: ThreadCpu = ThreadCpu;

/// Install the thread-local CPU provider (idempotent per test binary).
pub fn install_cpus() {
    let _ = kernel_sync::preempt::install(&PROVIDER);
}

/// Make the calling thread act as logical CPU `id` from here on.
pub fn on_cpu(id: usize) {
    THREAD_CPU.set(id);
}
