//! Scoped preemption control and CPU identity.
//!
//! Any code that indexes a per-CPU structure has to answer "which CPU am I
//! on?" in a way that stays true for the whole operation. If the thread of
//! execution could migrate between reading its CPU id and touching that
//! CPU's data, it would operate on the wrong slot, or race an interrupt
//! handler re-entering the same structure on the original CPU.
//!
//! [`PreemptGuard::pin`] closes that window: it disables preemption, reads
//! the CPU id, and re-enables preemption only when the guard is dropped.
//! Release is RAII, so every exit path (including panics and early returns)
//! restores the previous state.
//!
//! The actual mechanism is platform-owned. Bring-up code installs a
//! [`PreemptionOps`] implementation once via [`install`], backed by the
//! per-CPU machinery (e.g. a GS-based per-CPU block on x86-64). Until one
//! is installed every pin reports CPU 0 with preemption control as a no-op,
//! which is exactly right for the single-core bootstrap phase. Hosted tests
//! install a provider backed by thread-locals to model multiple CPUs.

use core::fmt;
use core::marker::PhantomData;

use crate::SyncOnceCell;

/// Logical CPU index, `0..MAX_CPUS`.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct CpuId(usize);

impl CpuId {
    #[must_use]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for CpuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cpu{}", self.0)
    }
}

/// Hooks into the platform's preemption machinery.
///
/// `disable` must return the id of the CPU the caller is executing on and
/// prevent migration off that CPU until the matching `enable`. Calls are
/// balanced by [`PreemptGuard`] and may nest.
pub trait PreemptionOps: Sync {
    /// Disable preemption and report the current CPU.
    fn disable(&self) -> CpuId;
    /// Undo one `disable`.
    fn enable(&self);
}

static OPS: SyncOnceCell<&'static dyn PreemptionOps> = SyncOnceCell::new();

/// The platform provider was already installed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct InstallError;

impl fmt::Display for InstallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("preemption ops already installed")
    }
}

impl core::error::Error for InstallError {}

/// Install the platform's preemption hooks. First caller wins.
///
/// Must happen before secondary CPUs start pinning; guards taken earlier
/// assume the single-core bootstrap default.
///
/// # Errors
///
/// Fails if a provider was already installed.
pub fn install(ops: &'static dyn PreemptionOps) -> Result<(), InstallError> {
    OPS.set(ops).map_err(|_ops| InstallError)
}

/// RAII pin to the current CPU.
///
/// While a `PreemptGuard` is alive the thread of execution stays on the CPU
/// reported by [`cpu`](Self::cpu). The guard is `!Send`: moving it to
/// another thread would carry a stale CPU identity with it.
pub struct PreemptGuard {
    cpu: CpuId,
    /// The provider whose `disable` we owe an `enable`; `None` during
    /// single-core bootstrap.
    ops: Option<&'static dyn PreemptionOps>,
    _not_send: PhantomData<*mut ()>,
}

impl PreemptGuard {
    /// Disable preemption and capture the current CPU identity.
    #[must_use]
    pub fn pin() -> Self {
        let ops = OPS.get().copied();
        let cpu = ops.map_or(CpuId::new(0), |ops| ops.disable());
        Self {
            cpu,
            ops,
            _not_send: PhantomData,
        }
    }

    /// The CPU this guard is pinned to.
    #[must_use]
    pub const fn cpu(&self) -> CpuId {
        self.cpu
    }
}

impl Drop for PreemptGuard {
    fn drop(&mut self) {
        if let Some(ops) = self.ops {
            ops.enable();
        }
    }
}
