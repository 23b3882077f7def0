//! # SMP Configuration

/// Number of logical CPUs the kernel's per-CPU structures are sized for.
///
/// CPUs beyond this count are not brought up. The frame allocator keeps one
/// free-list bank per slot, so this also bounds its lock sharding.
pub const MAX_CPUS: usize = 8;

const _: () = {
    assert!(MAX_CPUS >= 1);
    assert!(MAX_CPUS <= 256);
};
