//! Per-frame shared-owner counters.

use core::sync::atomic::{AtomicU32, Ordering};
use kernel_info::memory::MAX_FRAMES;

/// One non-negative owner count per manageable frame.
///
/// `0` means unowned (the frame sits on exactly one bank's free list),
/// `>= 1` means allocated, possibly shared between copy-on-write mappings.
///
/// The counters are atomics, but atomicity alone is not the protocol: a
/// frame's `0 -> 1` transition happens only while the allocating CPU holds
/// the frame exclusively (just popped, on no list), and the final `1 -> 0`
/// is what licenses putting it back on a list. The counter merely arbitrates
/// concurrent `inc`/`dec` between co-owners of a live frame.
pub(crate) struct RefCountTable {
    counts: [AtomicU32; MAX_FRAMES],
}

impl RefCountTable {
    pub(crate) const fn new() -> Self {
        Self {
            counts: [const { AtomicU32::new(0) }; MAX_FRAMES],
        }
    }

    /// Current owner count of `index`.
    pub(crate) fn get(&self, index: usize) -> u32 {
        self.slot(index).load(Ordering::Acquire)
    }

    /// Register one more owner.
    pub(crate) fn inc(&self, index: usize) {
        self.slot(index).fetch_add(1, Ordering::AcqRel);
    }

    /// Drop one owner and return the count that remains.
    ///
    /// Driving the count below zero means a frame was released more times
    /// than it was owned; that caller bug has already corrupted someone's
    /// view of the frame, so it is fatal.
    pub(crate) fn dec(&self, index: usize) -> u32 {
        let previous = self
            .slot(index)
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                count.checked_sub(1)
            })
            .unwrap_or_else(|_zero| panic!("pmm: refcount underflow on frame {index} (double free)"));
        previous - 1
    }

    /// Claim a frame that is exclusively held: exactly one owner from here.
    pub(crate) fn claim(&self, index: usize) {
        self.slot(index).store(1, Ordering::Release);
    }

    fn slot(&self, index: usize) -> &AtomicU32 {
        assert!(index < MAX_FRAMES, "pmm: frame index {index} out of range");
        &self.counts[index]
    }
}
