//! # Kernel synchronization primitives
//!
//! Spin-based mutual exclusion, one-time initialization, and scoped
//! preemption control. Everything here is `no_std` and lock hold times are
//! expected to be short, bounded critical sections; there is no scheduler
//! integration and nothing ever blocks on anything but a spin.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod once;
pub mod preempt;
mod spin;

pub use once::SyncOnceCell;
pub use preempt::{CpuId, PreemptGuard, PreemptionOps};
pub use spin::{SpinGuard, SpinLock};
