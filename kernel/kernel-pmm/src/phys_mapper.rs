//! Physical-to-virtual translation for allocator-internal writes.
//!
//! Rust code can only dereference virtual addresses, but the allocator has
//! to write sentinel fills into the physical frames it manages. How a
//! physical address becomes a usable pointer differs between environments
//! (HHDM in the kernel proper, identity views in early boot, plain host
//! memory in tests), so the conversion is a trait the allocator is generic
//! over.

use kernel_info::memory::HHDM_BASE;
use kernel_memory_addresses::PhysAddr;

/// Convert a physical address to a usable mutable reference in the current
/// address space.
pub trait PhysMapper {
    /// # Safety
    ///
    /// - `pa` must be mapped in the current address space, writable, and
    ///   backed by at least `size_of::<T>()` bytes aligned for `T`.
    /// - The caller must hold the referenced memory exclusively for the
    ///   lifetime it uses the reference.
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysAddr) -> &'a mut T;
}

/// [`PhysMapper`] for kernels with a higher-half direct map: every physical
/// address is visible at [`HHDM_BASE`]` + pa`.
pub struct HhdmPhysMapper;

impl PhysMapper for HhdmPhysMapper {
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysAddr) -> &'a mut T {
        let va = (HHDM_BASE + pa.as_u64()) as *mut T;
        // SAFETY: the caller promises the HHDM covers `pa` and the access
        // contract of the trait holds.
        unsafe { &mut *va }
    }
}
