//! # Physical Memory Layout

use kernel_memory_addresses::Frame;

/// A simple Higher Half Direct Map (HHDM) base.
/// Anything mapped at [`HHDM_BASE`] + `pa` lets the kernel access physical
/// memory via a fixed offset.
pub const HHDM_BASE: u64 = 0xffff_8880_0000_0000;

/// Lowest physical address the frame allocator may ever manage.
///
/// The actual managed region starts at the first frame boundary after the
/// kernel image, which is at or above this.
pub const PHYS_FRAME_BASE: u64 = 0x0010_0000; // 1 MiB

/// One past the highest physical address the frame allocator may manage.
pub const PHYS_FRAME_LIMIT: u64 = 0x0400_0000; // 64 MiB

/// Capacity of the allocator's per-frame bookkeeping tables.
///
/// Sized for the largest possible managed region; an actual region may be
/// smaller, never larger.
pub const MAX_FRAMES: usize = ((PHYS_FRAME_LIMIT - PHYS_FRAME_BASE) / Frame::SIZE) as usize;

const _: () = {
    assert!(PHYS_FRAME_BASE % Frame::SIZE == 0);
    assert!(PHYS_FRAME_LIMIT % Frame::SIZE == 0);
    assert!(PHYS_FRAME_LIMIT > PHYS_FRAME_BASE);
    // bank links store frame indices as u32
    assert!(MAX_FRAMES < u32::MAX as usize);
};
