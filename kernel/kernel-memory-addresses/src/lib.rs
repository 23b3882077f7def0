//! # Physical Memory Address Types
//!
//! Strongly typed wrappers for raw physical addresses and page-frame bases
//! used by the physical memory manager.
//!
//! ## Overview
//!
//! Two types cover everything the frame allocator needs:
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`PhysAddr`] | A raw 64-bit physical address, arbitrary alignment. |
//! | [`Frame`] | The 4 KiB-aligned base of a physical page frame. |
//!
//! Frames inside a managed region are identified by a **dense index**:
//! frame `i` of a region starting at base frame `b` sits at
//! `b.base() + i * Frame::SIZE`. [`Frame::index_in`] and
//! [`Frame::from_index`] convert between the two views; the allocator's
//! bookkeeping tables (reference counts, free links) are keyed by that
//! index.
//!
//! ## Typical Usage
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let base = Frame::round_up(PhysAddr::new(0x10_0123));
//! assert_eq!(base.base().as_u64(), 0x10_1000);
//!
//! let third = Frame::from_index(base, 3);
//! assert_eq!(third.index_in(base), Some(3));
//! assert_eq!(third.base().as_u64(), 0x10_1000 + 3 * Frame::SIZE);
//! ```
//!
//! The types are `#[repr(transparent)]`, `Copy`, ordered and hashable, and
//! all conversions are `const fn`.

#![cfg_attr(not(any(test, doctest)), no_std)]

use core::fmt;
use core::ops::{Add, AddAssign};

/// Physical memory address.
///
/// A thin wrapper around `u64` that carries physical intent and prevents
/// accidental mixing with virtual addresses or plain integers. No alignment
/// is implied; use [`Frame`] for page-aligned bases.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysAddr(u64);

impl PhysAddr {
    /// The all-zero address.
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }

    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(v)
    }

    /// The address of `ptr` in an identity-mapped (or hosted) view of memory.
    #[inline]
    #[must_use]
    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self(ptr as u64)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Whether this address sits exactly on a frame boundary.
    #[inline]
    #[must_use]
    pub const fn is_frame_aligned(self) -> bool {
        self.0 & (Frame::SIZE - 1) == 0
    }

    /// Byte offset of this address within its containing frame.
    #[inline]
    #[must_use]
    pub const fn frame_offset(self) -> u64 {
        self.0 & (Frame::SIZE - 1)
    }
}

impl fmt::Debug for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PA(0x{:016X})", self.0)
    }
}

impl fmt::Display for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.0)
    }
}

impl From<u64> for PhysAddr {
    #[inline]
    fn from(v: u64) -> Self {
        Self(v)
    }
}

impl From<Frame> for PhysAddr {
    #[inline]
    fn from(frame: Frame) -> Self {
        frame.base()
    }
}

impl Add<u64> for PhysAddr {
    type Output = Self;
    #[inline]
    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl AddAssign<u64> for PhysAddr {
    #[inline]
    fn add_assign(&mut self, rhs: u64) {
        self.0 += rhs;
    }
}

/// Page-frame base: a 4 KiB-aligned physical address.
///
/// ### Invariants
/// - The low [`Frame::SHIFT`] bits of the base are always zero.
///
/// A `Frame` is the allocator's unit of currency; everything it hands out
/// or takes back is exactly one frame.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Frame(u64);

impl Frame {
    /// Frame size in bytes.
    pub const SIZE: u64 = 4096;
    /// log2([`SIZE`](Self::SIZE)); the number of offset bits.
    pub const SHIFT: u32 = 12;

    /// The frame containing `pa` (aligns down).
    #[inline]
    #[must_use]
    pub const fn containing(pa: PhysAddr) -> Self {
        Self(pa.0 & !(Self::SIZE - 1))
    }

    /// The first frame at or above `pa` (aligns up).
    ///
    /// Used when the start of a managed region is not frame-aligned, e.g.
    /// the first byte after the kernel image.
    #[inline]
    #[must_use]
    pub const fn round_up(pa: PhysAddr) -> Self {
        Self((pa.0 + Self::SIZE - 1) & !(Self::SIZE - 1))
    }

    /// Interpret `pa` as a frame base, or `None` if it is not aligned.
    #[inline]
    #[must_use]
    pub const fn try_from_base(pa: PhysAddr) -> Option<Self> {
        if pa.is_frame_aligned() {
            Some(Self(pa.0))
        } else {
            None
        }
    }

    /// The frame's base address.
    #[inline]
    #[must_use]
    pub const fn base(self) -> PhysAddr {
        PhysAddr(self.0)
    }

    /// Dense index of this frame relative to `base`, or `None` if this
    /// frame lies below `base`.
    #[inline]
    #[must_use]
    pub const fn index_in(self, base: Self) -> Option<usize> {
        if self.0 < base.0 {
            None
        } else {
            Some(((self.0 - base.0) >> Self::SHIFT) as usize)
        }
    }

    /// The frame at dense index `index` relative to `base`.
    #[inline]
    #[must_use]
    pub const fn from_index(base: Self, index: usize) -> Self {
        Self(base.0 + ((index as u64) << Self::SHIFT))
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame(0x{:016X})", self.0)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.0)
    }
}
