//! Per-CPU free lists over index-linked storage.
//!
//! The original trick in pagers of this lineage is an intrusive list: a
//! free frame's own bytes store the "next free frame" pointer, so the list
//! costs no memory beyond the frames themselves. Overwriting freed storage
//! with pointers is not something we can express safely, so the link lives
//! in a fixed side table instead: slot `i` of [`FreeLinks`] holds the next
//! frame index after frame `i`. The properties that mattered are kept,
//! O(1) push/pop and a fixed 4-byte per-frame overhead, without aliasing
//! frame contents.

use core::sync::atomic::{AtomicU32, Ordering};
use kernel_info::memory::MAX_FRAMES;

/// "No frame": terminates a list and fills unused link slots.
const NO_FRAME: u32 = u32::MAX;

const _: () = assert!(MAX_FRAMES < NO_FRAME as usize);

/// The per-frame "next free" relation, shared by all banks.
///
/// Slot `i` is meaningful only while frame `i` sits on some bank's list,
/// and is only touched by whoever holds that bank's lock. The slots are
/// atomics because frames migrate between banks over their lifetime, so no
/// single Rust owner exists; the bank locks provide the actual ordering.
pub(crate) struct FreeLinks {
    next: [AtomicU32; MAX_FRAMES],
}

impl FreeLinks {
    pub(crate) const fn new() -> Self {
        Self {
            next: [const { AtomicU32::new(NO_FRAME) }; MAX_FRAMES],
        }
    }

    fn get(&self, index: u32) -> u32 {
        self.next[index as usize].load(Ordering::Relaxed)
    }

    fn set(&self, index: u32, next: u32) {
        self.next[index as usize].store(next, Ordering::Relaxed);
    }
}

/// One CPU's private free list: a head into [`FreeLinks`] plus its depth.
///
/// A `Bank` is always wrapped in a `SpinLock`; the `&mut self` methods are
/// reached through its guard.
pub(crate) struct Bank {
    head: u32,
    depth: usize,
}

impl Bank {
    pub(crate) const fn new() -> Self {
        Self {
            head: NO_FRAME,
            depth: 0,
        }
    }

    /// Push `index` as the new list head.
    pub(crate) fn push(&mut self, links: &FreeLinks, index: u32) {
        links.set(index, self.head);
        self.head = index;
        self.depth += 1;
    }

    /// Pop the head, or report the bank empty.
    pub(crate) fn pop(&mut self, links: &FreeLinks) -> Option<u32> {
        if self.head == NO_FRAME {
            return None;
        }
        let index = self.head;
        self.head = links.get(index);
        links.set(index, NO_FRAME);
        self.depth -= 1;
        Some(index)
    }

    /// Number of frames currently on this bank's list.
    pub(crate) const fn depth(&self) -> usize {
        self.depth
    }
}
