//! # Kernel Configuration
//!
//! The authoritative source for system-wide constants shared by the kernel's
//! subsystems: the physical memory window the frame allocator may manage,
//! the higher-half direct-map base used to reach physical memory from kernel
//! code, and the CPU count the per-CPU structures are sized for.
//!
//! Centralizing these here keeps the bootloader, the memory manager, and the
//! SMP bring-up code agreeing on one set of numbers and lets the invariants
//! between them be checked at compile time.

#![cfg_attr(not(any(test, doctest)), no_std)]

pub mod memory;
pub mod smp;
