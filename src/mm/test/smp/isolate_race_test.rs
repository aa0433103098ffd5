//! Dois reclaimers disputando a mesma lista inativa.

use alloc::collections::BTreeSet;
use alloc::vec::Vec;

use std::thread;
use std::time::Duration;

use crate::kassert;
use crate::klib::test_framework::{TestCase, TestResult};
use crate::mm::pfm::{page_remove_rmap, PageFlags};
use crate::mm::pmm::LruList;
use crate::mm::reclaim::isolate::isolate_batch;
use crate::mm::reclaim::{AllocFlags, ScanControl};
use crate::mm::test::mock::Env;

pub const ISOLATE_RACE_TESTS: &[TestCase] = &[
    TestCase::new("smp_isolate_disjoint_batches", test_disjoint_batches),
    TestCase::new("smp_concurrent_shrink", test_concurrent_shrink),
    TestCase::new("smp_release_during_claim", test_release_during_claim),
];

fn test_disjoint_batches() -> TestResult {
    let env = Env::new(128, 4);
    let mapping = env.mapping(1, &env.swap_ops);
    let _pages = env.fill(&mapping, 100, LruList::Inactive);

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let zone = env.zone.clone();
            thread::spawn(move || isolate_batch(&zone, LruList::Inactive, 60))
        })
        .collect();
    let batches: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let taken: usize = batches.iter().map(|b| b.nr_taken()).sum();
    let pfns: BTreeSet<usize> = batches
        .iter()
        .flat_map(|b| b.pages.iter().map(|p| p.pfn()))
        .collect();
    kassert!(taken == 100, "(SMP) total isolado", taken);
    kassert!(pfns.len() == 100, "(SMP) página isolada duas vezes");
    kassert!(env.zone.nr_inactive() == 0, "(SMP) lista deveria estar vazia");

    for batch in batches {
        env.zone.putback(batch.pages);
    }
    kassert!(env.zone.nr_inactive() == 100, "(SMP) putback incompleto");
    kassert!(env.node.check_membership().is_ok(), "(SMP) membership após corrida");
    TestResult::Passed
}

fn test_concurrent_shrink() -> TestResult {
    let env = Env::new(128, 4);
    let mapping = env.mapping(1, &env.swap_ops);
    let _pages = env.fill(&mapping, 100, LruList::Inactive);

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let reclaimer = env.reclaimer.clone();
            let zone = env.zone.clone();
            thread::spawn(move || {
                let mut sc = ScanControl::new(AllocFlags::KERNEL, 0);
                reclaimer.shrink_inactive_list(&zone, &mut sc, 32)
            })
        })
        .collect();
    let freed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    kassert!(freed == 64, "(SMP) liberadas", freed);
    kassert!(env.zone.free_pages() == 28 + 64, "(SMP) página liberada duas vezes");
    kassert!(mapping.nr_pages() == 36, "(SMP) índice do mapping");
    kassert!(env.node.check_membership().is_ok(), "(SMP) membership após corrida");
    TestResult::Passed
}

fn test_release_during_claim() -> TestResult {
    let env = Env::new(16, 2);
    let page = env.anon_page(LruList::Inactive);
    // Troca a referência da PTE por uma do chamador
    page.get();
    page_remove_rmap(&page, &env.states);
    kassert!(page.count() == 1, "(SMP) contagem inicial", page.count());

    // Claim em andamento sob o lru_lock: LRU limpo até get_unless_zero
    let guard = env.zone.lru.lock();
    page.clear(PageFlags::LRU);
    let releaser = {
        let zone = env.zone.clone();
        let page = page.clone();
        thread::spawn(move || zone.put_page(&page))
    };
    thread::sleep(Duration::from_millis(20));
    page.set(PageFlags::LRU);
    drop(guard);

    let freed = releaser.join().unwrap();
    kassert!(freed, "(SMP) última referência não liberou");
    kassert!(!page.on_lru(), "(SMP) página liberada com LRU");
    kassert!(env.zone.nr_inactive() == 0, "(SMP) frame livre ainda na inativa");
    kassert!(env.zone.free_pages() == 16, "(SMP) pool livre", env.zone.free_pages());
    kassert!(env.node.check_membership().is_ok(), "(SMP) membership após corrida");
    TestResult::Passed
}

crate::host_suite!(test_disjoint_batches, test_concurrent_shrink, test_release_during_claim);
