//! The physical page-frame allocator.
//!
//! One [`FrameAllocator`] tracks every frame of the managed region through
//! three pieces of state: a reference count per frame, a per-frame free
//! link, and one lock-protected free-list bank per CPU. A frame is always
//! in exactly one of three states:
//!
//! - **unmanaged**: outside the region, never touched;
//! - **free**: refcount 0, sitting on exactly one bank's list;
//! - **allocated**: refcount >= 1, on no list.
//!
//! Frames are neither created nor destroyed after [`init`](FrameAllocator::init),
//! so the number of free frames across all banks plus the number of
//! allocated frames is constant.
//!
//! ## Lock discipline
//!
//! [`alloc`](FrameAllocator::alloc) pops the calling CPU's own bank first
//! and releases that lock before anything else happens. Only when the own
//! bank is empty does it scan the remaining banks, in ascending index
//! order, with a single `try_lock` attempt each. At most one bank lock is
//! ever held at any instant, so the reversed-pair deadlock (A holds its
//! bank wanting B's while B holds its bank wanting A's) cannot form. A
//! remote bank that is contended, or emptied between the scan reaching it
//! and the pop, is simply a miss; the scan never retries.
//!
//! ## Poisoning
//!
//! Every frame handed out is filled with [`ALLOC_SENTINEL`] and every frame
//! whose last owner released it is filled with [`FREE_SENTINEL`], so reads
//! of uninitialized-but-allocated memory and dangling reads after free both
//! surface as recognizable byte patterns during testing.

use kernel_info::memory::MAX_FRAMES;
use kernel_info::smp::MAX_CPUS;
use kernel_memory_addresses::{Frame, PhysAddr};
use kernel_sync::{PreemptGuard, SpinLock};
use log::{debug, trace};

use crate::bank::{Bank, FreeLinks};
use crate::phys_mapper::PhysMapper;
use crate::refcount::RefCountTable;

/// Byte written over the whole frame by a successful allocation, before the
/// caller sees it.
pub const ALLOC_SENTINEL: u8 = 0x05;

/// Byte written over the whole frame when its last owner releases it.
pub const FREE_SENTINEL: u8 = 0x01;

const FRAME_BYTES: usize = Frame::SIZE as usize;

/// Allocation failed because every bank was empty.
///
/// This is the ordinary out-of-memory signal; the caller decides whether to
/// fail the requesting operation, reclaim, or retry later. The allocator
/// itself never retries or blocks on it.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
#[error("out of physical frames")]
pub struct OutOfFrames;

/// Physical page-frame allocator: reference-counted frames on per-CPU
/// free-list banks, with cross-CPU stealing.
///
/// Generic over the [`PhysMapper`] used for the sentinel writes, so the
/// same allocator runs against the HHDM in the kernel and against plain
/// host memory in tests.
pub struct FrameAllocator<M> {
    mapper: M,
    /// First managed frame; frame indices are relative to this.
    base: Frame,
    /// Number of managed frames; `0` until [`init`](Self::init).
    frames: usize,
    initialized: bool,
    refcounts: RefCountTable,
    links: FreeLinks,
    banks: [SpinLock<Bank>; MAX_CPUS],
}

impl<M: PhysMapper> FrameAllocator<M> {
    /// An allocator managing nothing yet; see [`init`](Self::init).
    #[must_use]
    pub const fn new(mapper: M) -> Self {
        Self {
            mapper,
            base: Frame::containing(PhysAddr::zero()),
            frames: 0,
            initialized: false,
            refcounts: RefCountTable::new(),
            links: FreeLinks::new(),
            banks: [const { SpinLock::new(Bank::new()) }; MAX_CPUS],
        }
    }

    /// Take ownership of the physical region `[start, end)`.
    ///
    /// `start` is rounded up and `end` rounded down to frame boundaries;
    /// every whole frame in between is donated to the free lists through
    /// the ordinary release path, so it ends up poisoned and accounted
    /// exactly like a runtime free. Donations round-robin across the banks
    /// for an even initial spread; imbalance would otherwise only be
    /// corrected lazily by stealing.
    ///
    /// # Panics
    ///
    /// Called twice, with a backwards region, or with more frames than the
    /// bookkeeping tables are sized for. All are boot-time configuration
    /// bugs, not runtime conditions.
    pub fn init(&mut self, start: PhysAddr, end: PhysAddr) {
        assert!(!self.initialized, "pmm: init called twice");
        assert!(end.as_u64() >= start.as_u64(), "pmm: backwards region");

        let base = Frame::round_up(start);
        let limit = Frame::containing(end);
        let frames = if limit.base().as_u64() > base.base().as_u64() {
            ((limit.base().as_u64() - base.base().as_u64()) >> Frame::SHIFT) as usize
        } else {
            0
        };
        assert!(frames <= MAX_FRAMES, "pmm: region of {frames} frames exceeds MAX_FRAMES");

        self.base = base;
        self.frames = frames;
        self.initialized = true;

        for index in 0..frames {
            // a donation is "one owner appeared, then released": the frame
            // flows through the same decrement-to-zero path as any free
            self.refcounts.inc(index);
            self.release(index, index % MAX_CPUS);
        }

        debug!(
            "pmm: managing {frames} frames in [{base}, {limit}) across {MAX_CPUS} banks",
            base = base.base(),
            limit = limit.base(),
        );
    }

    /// Allocate one frame.
    ///
    /// Pops the calling CPU's bank, falling back to a single-attempt steal
    /// scan of the other banks. The returned frame has reference count 1
    /// and every byte set to [`ALLOC_SENTINEL`].
    ///
    /// # Errors
    ///
    /// [`OutOfFrames`] when every bank is empty. Another CPU racing the
    /// scan may consume the last frame first; that is the same result.
    pub fn alloc(&self) -> Result<PhysAddr, OutOfFrames> {
        let index = {
            let pinned = PreemptGuard::pin();
            let home = home_bank(&pinned);
            self.pop_home(home)
                .or_else(|| self.steal(home))
                .ok_or(OutOfFrames)?
        };

        // the frame is exclusively ours: popped off a list, on no other
        self.refcounts.claim(index);
        self.fill(index, ALLOC_SENTINEL);
        Ok(Frame::from_index(self.base, index).base())
    }

    /// Allocate one frame and zero it, for callers that hand the frame to
    /// code expecting cleared memory (fresh page tables, user pages).
    ///
    /// # Errors
    ///
    /// [`OutOfFrames`] as for [`alloc`](Self::alloc).
    pub fn alloc_zeroed(&self) -> Result<PhysAddr, OutOfFrames> {
        let pa = self.alloc()?;
        let index = self.index_of(pa);
        self.fill(index, 0);
        Ok(pa)
    }

    /// Release one ownership of the frame at `pa`.
    ///
    /// If other owners remain the frame stays allocated and its contents
    /// are left untouched. When the last owner releases it, the frame is
    /// filled with [`FREE_SENTINEL`] and pushed onto the **freeing** CPU's
    /// bank. Frames migrate between banks by design; there is no "home"
    /// bank to return to.
    ///
    /// # Panics
    ///
    /// `pa` not frame-aligned or outside the managed region (the caller
    /// passed an address this allocator never produced), or releasing a
    /// frame with no owners (double free). Both are fatal contract
    /// breaches: continuing would corrupt allocator state.
    pub fn free(&self, pa: PhysAddr) {
        let index = self.index_of(pa);
        let pinned = PreemptGuard::pin();
        let home = home_bank(&pinned);
        self.release(index, home);
    }

    /// Register an additional owner of the allocated frame at `pa`.
    ///
    /// Used by the VM layer to record a second mapping (copy-on-write)
    /// before it exists, so a concurrent `free` of the first mapping cannot
    /// reclaim the frame underneath it.
    ///
    /// The address is validated; the frame's *state* is trusted. Calling
    /// this on a frame that is currently free is a caller bug the allocator
    /// cannot economically detect, and leaves the free list corrupt.
    ///
    /// # Panics
    ///
    /// `pa` not frame-aligned or outside the managed region.
    pub fn inc_ref(&self, pa: PhysAddr) {
        let index = self.index_of(pa);
        self.refcounts.inc(index);
    }

    /// Whether `pa` lies inside the managed region.
    #[must_use]
    pub fn is_managed(&self, pa: PhysAddr) -> bool {
        let frame = Frame::containing(pa);
        matches!(frame.index_in(self.base), Some(index) if index < self.frames)
    }

    /// Total frames currently free across all banks.
    #[must_use]
    pub fn free_frames(&self) -> usize {
        self.banks.iter().map(|bank| bank.lock().depth()).sum()
    }

    /// Free-list depth of every bank, for diagnostics.
    #[must_use]
    pub fn bank_depths(&self) -> [usize; MAX_CPUS] {
        let mut depths = [0; MAX_CPUS];
        for (slot, bank) in depths.iter_mut().zip(&self.banks) {
            *slot = bank.lock().depth();
        }
        depths
    }

    /// Shared release path for `free` and init-time donation: drop one
    /// owner, and when none remain, poison and enqueue on `bank`.
    fn release(&self, index: usize, bank: usize) {
        let remaining = self.refcounts.dec(index);
        if remaining > 0 {
            return;
        }
        // last owner gone; we hold the frame exclusively until it is on a
        // list, and nobody may touch its contents after this fill
        self.fill(index, FREE_SENTINEL);
        self.banks[bank].lock().push(&self.links, index as u32);
    }

    fn pop_home(&self, home: usize) -> Option<usize> {
        self.banks[home]
            .lock()
            .pop(&self.links)
            .map(|index| index as usize)
    }

    /// Single-attempt steal scan, ascending bank order.
    ///
    /// `try_lock` keeps this non-blocking: a bank whose lock is contended
    /// is skipped like an empty one. Combined with the caller having
    /// already dropped its own bank's guard, no execution ever waits for a
    /// second bank lock, which rules out lock-order deadlock entirely.
    fn steal(&self, home: usize) -> Option<usize> {
        for (origin, bank) in self.banks.iter().enumerate() {
            if origin == home {
                continue;
            }
            let Some(mut guard) = bank.try_lock() else {
                continue;
            };
            if let Some(index) = guard.pop(&self.links) {
                drop(guard);
                trace!("pmm: bank {home} stole frame {index} from bank {origin}");
                return Some(index as usize);
            }
        }
        None
    }

    /// Dense index of the frame at `pa`, or a fatal panic for addresses
    /// this allocator never produced.
    fn index_of(&self, pa: PhysAddr) -> usize {
        let Some(frame) = Frame::try_from_base(pa) else {
            panic!("pmm: unaligned frame address {pa}");
        };
        frame
            .index_in(self.base)
            .filter(|&index| index < self.frames)
            .unwrap_or_else(|| panic!("pmm: address {pa} outside the managed region"))
    }

    /// Overwrite every byte of frame `index` with `value`.
    ///
    /// Caller must hold the frame exclusively: freshly popped, or refcount
    /// just dropped to zero and not yet enqueued.
    fn fill(&self, index: usize, value: u8) {
        let pa = Frame::from_index(self.base, index).base();
        // SAFETY: managed frames are mapped and writable by contract of
        // `init`, and exclusivity is the documented precondition above.
        let bytes: &mut [u8; FRAME_BYTES] = unsafe { self.mapper.phys_to_mut(pa) };
        bytes.fill(value);
    }
}

/// Bank slot for the pinned CPU.
fn home_bank(pinned: &PreemptGuard) -> usize {
    let cpu = pinned.cpu().as_usize();
    assert!(cpu < MAX_CPUS, "pmm: cpu id {cpu} exceeds MAX_CPUS");
    cpu
}
