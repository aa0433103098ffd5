//! Testes das listas LRU da zona

use alloc::vec;

use super::mock::Env;
use crate::klib::test_framework::{TestCase, TestResult};
use crate::kassert;
use crate::mm::error::MmError;
use crate::mm::pfm::PageFlags;
use crate::mm::pmm::{IsolateResult, LruList, Node, Watermarks, Zone, ZoneType};
use crate::mm::reclaim::isolate::isolate_batch;

pub const LRU_TESTS: &[TestCase] = &[
    TestCase::new("lru_add_sets_flags", test_lru_add_sets_flags),
    TestCase::new("lru_add_rejects_foreign_zone", test_lru_add_rejects_foreign_zone),
    TestCase::new("lru_second_touch_promotes", test_second_touch_promotes),
    TestCase::new("lru_isolate_and_restore", test_isolate_and_restore),
    TestCase::new("lru_batch_skips_page_being_freed", test_batch_skips_page_being_freed),
    TestCase::new("lru_rotate_to_reclaim_end", test_rotate_to_reclaim_end),
    TestCase::new("lru_del_page", test_del_page),
    TestCase::new("lru_last_put_frees", test_last_put_frees),
    TestCase::new("lru_membership_detects_bad_flags", test_membership_detects_bad_flags),
    TestCase::new("lru_node_rejects_unordered_zones", test_node_rejects_unordered_zones),
];

fn test_lru_add_sets_flags() -> TestResult {
    let env = Env::new(16, 2);
    let mapping = env.mapping(1, &env.swap_ops);
    let page = env.file_page(&mapping, 0, LruList::Inactive);

    kassert!(page.on_lru() && !page.is_active(), "(LRU) flags erradas após add");
    kassert!(env.zone.lru_counts() == (0, 1), "(LRU) contador inativo errado");
    kassert!(page.count() == 1, "(LRU) LRU não deve segurar referência, count=", page.count());
    kassert!(
        env.zone.lru_cache_add(&page) == Err(MmError::AlreadyOnLru),
        "(LRU) add duplicado aceito"
    );
    kassert!(env.node.check_membership().is_ok(), "(LRU) membership inválido");
    TestResult::Passed
}

fn test_lru_add_rejects_foreign_zone() -> TestResult {
    let dma = Zone::new(ZoneType::DMA, 0, 0, 8, Watermarks::from_min(1));
    let normal = Zone::new(ZoneType::Normal, 0, 8, 8, Watermarks::from_min(1));
    let page = dma.alloc_page().unwrap();

    kassert!(
        normal.lru_cache_add(&page) == Err(MmError::InvalidParameter),
        "(LRU) página de outra zona aceita"
    );
    kassert!(!page.on_lru(), "(LRU) flag LRU setado após rejeição");
    TestResult::Passed
}

fn test_second_touch_promotes() -> TestResult {
    let env = Env::new(16, 2);
    let mapping = env.mapping(1, &env.swap_ops);
    let page = env.file_page(&mapping, 0, LruList::Inactive);

    env.zone.mark_page_accessed(&page);
    kassert!(page.test(PageFlags::REFERENCED), "(LRU) primeiro toque não marcou");
    kassert!(!page.is_active(), "(LRU) primeiro toque promoveu");

    env.zone.mark_page_accessed(&page);
    kassert!(page.is_active(), "(LRU) segundo toque não promoveu");
    kassert!(!page.test(PageFlags::REFERENCED), "(LRU) REFERENCED não foi limpo");
    kassert!(env.zone.lru_counts() == (1, 0), "(LRU) contadores após promoção");
    kassert!(
        env.zone.lru_snapshot(LruList::Active) == vec![page.pfn()],
        "(LRU) página fora da lista ativa"
    );
    TestResult::Passed
}

fn test_isolate_and_restore() -> TestResult {
    let env = Env::new(16, 2);
    let mapping = env.mapping(1, &env.swap_ops);
    let page = env.file_page(&mapping, 0, LruList::Inactive);

    kassert!(env.zone.isolate(&page) == IsolateResult::Isolated, "(LRU) isolate falhou");
    kassert!(!page.on_lru(), "(LRU) isolada com flag LRU");
    kassert!(page.count() == 2, "(LRU) isolamento sem referência, count=", page.count());
    kassert!(env.zone.nr_inactive() == 0, "(LRU) contador não caiu");
    kassert!(
        env.zone.isolate(&page) == IsolateResult::NotOnList,
        "(LRU) página isolada duas vezes"
    );
    kassert!(env.node.check_membership().is_ok(), "(LRU) isolada deve ser válida");

    env.zone.restore(page.clone(), LruList::Active);
    kassert!(page.on_lru() && page.is_active(), "(LRU) restore não ligou na ativa");
    kassert!(page.count() == 1, "(LRU) referência de isolamento não solta");
    kassert!(env.zone.lru_counts() == (1, 0), "(LRU) contadores após restore");
    kassert!(env.node.check_membership().is_ok(), "(LRU) membership após restore");
    TestResult::Passed
}

fn test_batch_skips_page_being_freed() -> TestResult {
    let env = Env::new(16, 2);
    let mapping = env.mapping(1, &env.swap_ops);
    let a = env.file_page(&mapping, 0, LruList::Inactive);
    let b = env.file_page(&mapping, 1, LruList::Inactive);
    let c = env.file_page(&mapping, 2, LruList::Inactive);

    // B está sendo liberada por outro caminho
    b.set_count(0);
    kassert!(
        env.zone.isolate(&b) == IsolateResult::BeingFreedElsewhere,
        "(LRU) claim de página com count zero"
    );
    kassert!(b.on_lru(), "(LRU) flag LRU não foi devolvido");

    let batch = isolate_batch(&env.zone, LruList::Inactive, 3);
    kassert!(batch.nr_taken() == 2, "(LRU) lote errado, taken=", batch.nr_taken());
    kassert!(batch.nr_scanned == 3, "(LRU) tentativas não contadas");
    kassert!(batch.pages[0].pfn() == a.pfn(), "(LRU) lote fora da ordem de reclaim");
    kassert!(batch.pages[1].pfn() == c.pfn(), "(LRU) lote fora da ordem de reclaim");
    kassert!(
        env.zone.lru_snapshot(LruList::Inactive) == vec![b.pfn()],
        "(LRU) página pulada saiu da lista"
    );
    kassert!(env.zone.pages_scanned() == 3, "(LRU) pages_scanned errado");

    env.zone.putback(batch.pages);
    b.set_count(1);
    kassert!(env.zone.nr_inactive() == 3, "(LRU) putback incompleto");
    kassert!(env.node.check_membership().is_ok(), "(LRU) membership após putback");
    TestResult::Passed
}

fn test_rotate_to_reclaim_end() -> TestResult {
    let env = Env::new(16, 2);
    let mapping = env.mapping(1, &env.swap_ops);
    let a = env.file_page(&mapping, 0, LruList::Inactive);
    let b = env.file_page(&mapping, 1, LruList::Inactive);
    let c = env.file_page(&mapping, 2, LruList::Inactive);

    kassert!(
        env.zone.lru_snapshot(LruList::Inactive) == vec![c.pfn(), b.pfn(), a.pfn()],
        "(LRU) ordem de inserção errada"
    );
    kassert!(env.zone.rotate_reclaimable_page(&c), "(LRU) rotação recusada");
    kassert!(
        env.zone.lru_snapshot(LruList::Inactive) == vec![b.pfn(), a.pfn(), c.pfn()],
        "(LRU) rotação não foi para a ponta de reclaim"
    );

    b.set(PageFlags::DIRTY);
    kassert!(!env.zone.rotate_reclaimable_page(&b), "(LRU) rotacionou página suja");
    b.clear(PageFlags::DIRTY);

    kassert!(a.trylock(), "(LRU) lock de teste");
    kassert!(!env.zone.rotate_reclaimable_page(&a), "(LRU) rotacionou página travada");
    a.unlock();

    kassert!(env.node.check_membership().is_ok(), "(LRU) membership após rotação");
    TestResult::Passed
}

fn test_del_page() -> TestResult {
    let env = Env::new(16, 2);
    let mapping = env.mapping(1, &env.swap_ops);
    let page = env.file_page(&mapping, 0, LruList::Active);

    kassert!(env.zone.del_page_from_lru(&page).is_ok(), "(LRU) del falhou");
    kassert!(!page.on_lru() && !page.is_active(), "(LRU) flags após del");
    kassert!(env.zone.lru_counts() == (0, 0), "(LRU) contador após del");
    kassert!(
        env.zone.del_page_from_lru(&page) == Err(MmError::NotOnLru),
        "(LRU) del duplicado aceito"
    );
    TestResult::Passed
}

fn test_last_put_frees() -> TestResult {
    let env = Env::new(16, 2);
    let page = env.zone.alloc_page().unwrap();
    kassert!(env.zone.free_pages() == 15, "(LRU) alloc não descontou");
    kassert!(env.zone.lru_cache_add(&page).is_ok(), "(LRU) add falhou");

    kassert!(env.zone.put_page(&page), "(LRU) última referência não liberou");
    kassert!(!page.on_lru(), "(LRU) página livre ainda na LRU");
    kassert!(env.zone.free_pages() == 16, "(LRU) frame não voltou ao pool");
    kassert!(env.zone.nr_inactive() == 0, "(LRU) contador após liberação");
    kassert!(env.node.check_membership().is_ok(), "(LRU) membership após liberação");
    TestResult::Passed
}

fn test_membership_detects_bad_flags() -> TestResult {
    let env = Env::new(16, 2);
    let mapping = env.mapping(1, &env.swap_ops);
    let page = env.file_page(&mapping, 0, LruList::Inactive);

    page.set(PageFlags::ACTIVE);
    kassert!(env.node.check_membership().is_err(), "(LRU) flag ACTIVE divergente passou");
    page.clear(PageFlags::ACTIVE);
    kassert!(env.node.check_membership().is_ok(), "(LRU) membership após corrigir");

    // Página sem lista, sem referência e fora do pool: perdida
    let lost = env.zone.alloc_page().unwrap();
    lost.set_count(0);
    kassert!(
        env.node.check_membership() == Err(MmError::NotOnLru),
        "(LRU) página perdida não detectada"
    );
    TestResult::Passed
}

fn test_node_rejects_unordered_zones() -> TestResult {
    use alloc::sync::Arc;

    let dma = Arc::new(Zone::new(ZoneType::DMA, 0, 0, 4, Watermarks::from_min(1)));
    let normal = Arc::new(Zone::new(ZoneType::Normal, 0, 4, 4, Watermarks::from_min(1)));
    kassert!(
        Node::new(0, vec![normal.clone(), dma.clone()]).is_err(),
        "(Zones) nodo aceitou zonas fora de ordem"
    );
    kassert!(Node::new(1, vec![dma, normal]).is_err(), "(Zones) nodo aceitou zona de outro nodo");
    TestResult::Passed
}

crate::host_suite!(
    test_lru_add_sets_flags,
    test_lru_add_rejects_foreign_zone,
    test_second_touch_promotes,
    test_isolate_and_restore,
    test_batch_skips_page_being_freed,
    test_rotate_to_reclaim_end,
    test_del_page,
    test_last_put_frees,
    test_membership_detects_bad_flags,
    test_node_rejects_unordered_zones,
);
