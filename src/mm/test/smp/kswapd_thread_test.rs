//! kswapd rodando em thread própria.

use alloc::sync::Arc;

use std::sync::{Condvar, Mutex};
use std::thread;
use std::time::Duration;

use crate::kassert;
use crate::klib::test_framework::{TestCase, TestResult};
use crate::mm::pmm::{LruList, Watermark};
use crate::mm::reclaim::KswapdWaiter;
use crate::mm::test::mock::Env;

pub const KSWAPD_THREAD_TESTS: &[TestCase] =
    &[TestCase::new("smp_kswapd_wakeup_and_stop", test_wakeup_and_stop)];

/// Semáforo binário sobre Condvar.
struct CondvarWaiter {
    pending: Mutex<bool>,
    cond: Condvar,
}

impl KswapdWaiter for CondvarWaiter {
    fn sleep(&self) {
        let mut pending = self.pending.lock().unwrap();
        while !*pending {
            pending = self.cond.wait(pending).unwrap();
        }
        *pending = false;
    }

    fn wake(&self) {
        *self.pending.lock().unwrap() = true;
        self.cond.notify_one();
    }
}

fn test_wakeup_and_stop() -> TestResult {
    // min 16: low 20, high 24; 120 em cache deixam 8 livres
    let env = Env::new(128, 16);
    let mapping = env.mapping(1, &env.swap_ops);
    let _pages = env.fill(&mapping, 120, LruList::Inactive);

    env.node.attach_kswapd(Arc::new(CondvarWaiter {
        pending: Mutex::new(false),
        cond: Condvar::new(),
    }));

    let reclaimer = env.reclaimer.clone();
    let daemon = thread::spawn(move || reclaimer.kswapd(0));

    env.reclaimer.wakeup_kswapd(&env.zone, 0);

    let mut waited = 0;
    while !env.zone.zone_watermark_ok(0, Watermark::High) && waited < 500 {
        thread::sleep(Duration::from_millis(10));
        waited += 1;
    }
    kassert!(env.zone.zone_watermark_ok(0, Watermark::High), "(SMP) kswapd não balanceou");

    kassert!(env.reclaimer.stop_kswapd(0).is_ok(), "(SMP) stop falhou");
    let exit = daemon.join();
    kassert!(matches!(exit, Ok(Ok(()))), "(SMP) kswapd não encerrou limpo");
    kassert!(env.node.check_membership().is_ok(), "(SMP) membership após kswapd");
    TestResult::Passed
}

crate::host_suite!(test_wakeup_and_stop);
