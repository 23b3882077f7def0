//! Hosted model of CPU pinning: a provider backed by thread-locals, so each
//! test thread acts as one logical CPU.

use kernel_sync::{CpuId, PreemptGuard, PreemptionOps};
use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

thread_local! {
    static THREAD_CPU: Cell<usize> = const { Cell::new(0) };
    static PIN_DEPTH: Cell<usize> = const { Cell::new(0) };
}

static ENABLE_CALLS: AtomicUsize = AtomicUsize::new(0);

struct ThreadCpu;

impl PreemptionOps for ThreadCpu {
    fn disable(&self) -> CpuId {
        PIN_DEPTH.set(PIN_DEPTH.get() + 1);
        CpuId::new(THREAD_CPU.get())
    }

    fn enable(&self) {
        PIN_DEPTH.set(PIN_DEPTH.get() - 1);
        ENABLE_CALLS.fetch_add(1, Ordering::Relaxed);
    }
}

static PROVIDER: ThreadCpu = ThreadCpu;

#[test]
fn pin_reports_the_installed_identity_and_balances() {
    kernel_sync::preempt::install(&PROVIDER).expect("first install must win");

    // a second install must be refused
    assert!(kernel_sync::preempt::install(&PROVIDER).is_err());

    let mut handles = Vec::new();
    for cpu in 0..4_usize {
        handles.push(thread::spawn(move || {
            THREAD_CPU.set(cpu);

            let outer = PreemptGuard::pin();
            assert_eq!(outer.cpu(), CpuId::new(cpu));

            // nesting is allowed; identity stays put
            {
                let inner = PreemptGuard::pin();
                assert_eq!(inner.cpu(), outer.cpu());
                assert_eq!(PIN_DEPTH.get(), 2);
            }
            assert_eq!(PIN_DEPTH.get(), 1);

            drop(outer);
            assert_eq!(PIN_DEPTH.get(), 0);
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    // every disable got its enable: 4 threads x 2 pins
    assert_eq!(ENABLE_CALLS.load(Ordering::Relaxed), 8);
}
