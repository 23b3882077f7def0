//! # Physical Memory Manager
//!
//! Tracks every physical page frame the kernel owns and hands frames out to
//! the rest of the system: virtual-memory mappings, process stacks, pipe
//! and device buffers. Frames are the only currency: fixed 4 KiB units,
//! with no variable-size allocation, no virtual address-space management,
//! and no state surviving a reboot.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              FrameAllocator (facade)                │
//! │    init / alloc / free / inc_ref, poisoning,        │
//! │    CPU pinning, steal policy                        │
//! └──────────┬──────────────────────────┬───────────────┘
//!            │                          │
//! ┌──────────▼───────────┐  ┌───────────▼───────────────┐
//! │    RefCountTable     │  │   Banks (one per CPU)     │
//! │  one owner count per │  │  SpinLock<Bank> over the  │
//! │  frame; shares COW   │  │  shared FreeLinks table   │
//! │  frames safely       │  │                           │
//! └──────────────────────┘  └───────────────────────────┘
//! ```
//!
//! Each CPU allocates from its own bank without touching any global lock;
//! only when its bank runs dry does it try, once, to steal from the others.
//! Reference counting lets the VM layer share a frame between copy-on-write
//! mappings: `free` only recycles the frame when the last owner lets go.
//!
//! ## Concurrency
//!
//! All operations complete in bounded time holding at most one bank lock;
//! nothing here ever sleeps or retries. The only cross-CPU ordering promise
//! is per frame: the state sequence of a single frame (free -> allocated ->
//! free -> ...) is totally ordered by whichever bank lock or refcount
//! update arbitrates each step.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use kernel_memory_addresses::PhysAddr;
//! use kernel_pmm::{FrameAllocator, HhdmPhysMapper};
//!
//! let mut pmm = FrameAllocator::new(HhdmPhysMapper);
//! pmm.init(PhysAddr::new(0x0010_0000), PhysAddr::new(0x0040_0000));
//!
//! let frame = pmm.alloc().expect("boot should not exhaust memory");
//! // ... map it somewhere ...
//! pmm.free(frame);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod bank;
mod frame_alloc;
mod phys_mapper;
mod refcount;

pub use frame_alloc::{ALLOC_SENTINEL, FREE_SENTINEL, FrameAllocator, OutOfFrames};
pub use phys_mapper::{HhdmPhysMapper, PhysMapper};
