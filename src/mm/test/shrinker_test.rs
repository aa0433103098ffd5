//! Testes do registro de shrinkers

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::kassert;
use crate::klib::test_framework::{TestCase, TestResult};
use crate::mm::config::DEFAULT_SEEKS;
use crate::mm::error::MmError;
use crate::mm::reclaim::{AllocFlags, ShrinkReply, Shrinker, ShrinkerRegistry};
use crate::mm::stats::VmEvents;

pub const SHRINKER_TESTS: &[TestCase] = &[
    TestCase::new("shrinker_register_unregister", test_register_unregister),
    TestCase::new("shrinker_proportional_pressure", test_proportional_pressure),
    TestCase::new("shrinker_zero_scanned_uses_batch", test_zero_scanned_uses_batch),
    TestCase::new("shrinker_stop_parks_work", test_stop_parks_work),
    TestCase::new("shrinker_huge_scan_saturates", test_huge_scan_saturates),
];

/// Cache de objetos que libera exatamente o que for pedido.
struct ObjectCache {
    objects: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
}

impl Shrinker for ObjectCache {
    fn shrink(&self, nr_to_scan: usize, _gfp: AllocFlags) -> ShrinkReply {
        if nr_to_scan > 0 {
            self.calls.fetch_add(1, Ordering::Relaxed);
            let _ = self
                .objects
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                    Some(n.saturating_sub(nr_to_scan))
                });
        }
        ShrinkReply::Count(self.objects.load(Ordering::Relaxed))
    }
}

/// Cache que informa tamanho mas nunca aceita trabalho.
struct StubbornCache {
    size: usize,
}

impl Shrinker for StubbornCache {
    fn shrink(&self, nr_to_scan: usize, _gfp: AllocFlags) -> ShrinkReply {
        if nr_to_scan == 0 {
            ShrinkReply::Count(self.size)
        } else {
            ShrinkReply::Stop
        }
    }
}

fn object_cache(objects: usize) -> (ObjectCache, Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let objects = Arc::new(AtomicUsize::new(objects));
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = ObjectCache {
        objects: objects.clone(),
        calls: calls.clone(),
    };
    (cache, objects, calls)
}

fn test_register_unregister() -> TestResult {
    let registry = ShrinkerRegistry::new();
    let (cache, _, _) = object_cache(10);

    let handle = registry.register(Box::new(cache), DEFAULT_SEEKS);
    kassert!(registry.len() == 1, "(SHRINK) registro não guardou");
    kassert!(registry.pending(handle) == Ok(0), "(SHRINK) pendência inicial");
    kassert!(registry.unregister(handle).is_ok(), "(SHRINK) remoção falhou");
    kassert!(registry.is_empty(), "(SHRINK) registro não esvaziou");
    kassert!(
        registry.unregister(handle) == Err(MmError::UnknownShrinker),
        "(SHRINK) remoção dupla aceita"
    );
    kassert!(registry.pending(handle) == Err(MmError::UnknownShrinker), "(SHRINK) handle morto");
    TestResult::Passed
}

fn test_proportional_pressure() -> TestResult {
    let registry = ShrinkerRegistry::new();
    let events = VmEvents::new();
    let (cache, objects, calls) = object_cache(10_000);
    let handle = registry.register(Box::new(cache), 2);

    // delta = 4 * 1000 * 2 / 1000 = 8: abaixo de um sub-lote, só acumula
    let freed = registry.shrink_slab(1000, AllocFlags::KERNEL, 999, &events);
    kassert!(freed == 0, "(SHRINK) liberou abaixo do sub-lote");
    kassert!(calls.load(Ordering::Relaxed) == 0, "(SHRINK) callback chamado cedo");
    kassert!(registry.pending(handle) == Ok(8), "(SHRINK) pendência não acumulou");

    // delta = 256, pendente 264: dois sub-lotes, sobra 8
    let freed = registry.shrink_slab(32_000, AllocFlags::KERNEL, 999, &events);
    kassert!(freed == 256, "(SHRINK) liberados=", freed);
    kassert!(calls.load(Ordering::Relaxed) == 2, "(SHRINK) sub-lotes");
    kassert!(objects.load(Ordering::Relaxed) == 10_000 - 256, "(SHRINK) objetos restantes");
    kassert!(registry.pending(handle) == Ok(8), "(SHRINK) sobra não devolvida");
    kassert!(events.snapshot().slabs_scanned == 256, "(SHRINK) slabs_scanned");
    TestResult::Passed
}

fn test_zero_scanned_uses_batch() -> TestResult {
    // scanned = 0 conta como um lote de reclaim (32): delta = 4 * 32 * 2 / 1
    let registry = ShrinkerRegistry::new();
    let events = VmEvents::new();
    let (cache, objects, _) = object_cache(1000);
    registry.register(Box::new(cache), 2);

    let freed = registry.shrink_slab(0, AllocFlags::KERNEL, 0, &events);
    kassert!(freed == 256, "(SHRINK) liberados=", freed);
    kassert!(objects.load(Ordering::Relaxed) == 744, "(SHRINK) objetos restantes");
    TestResult::Passed
}

fn test_stop_parks_work() -> TestResult {
    let registry = ShrinkerRegistry::new();
    let events = VmEvents::new();
    let handle = registry.register(Box::new(StubbornCache { size: 100 }), DEFAULT_SEEKS);

    for _ in 0..4 {
        let freed = registry.shrink_slab(100_000, AllocFlags::KERNEL, 0, &events);
        kassert!(freed == 0, "(SHRINK) cache teimoso liberou");
        let pending = registry.pending(handle).unwrap_or(usize::MAX);
        kassert!(pending == 200, "(SHRINK) pendência fora do teto 2x, pending=", pending);
    }
    kassert!(events.snapshot().slabs_scanned == 0, "(SHRINK) Stop contado como varrido");
    TestResult::Passed
}

fn test_huge_scan_saturates() -> TestResult {
    // delta satura; o teto 2x (2000) limita a pendência
    let registry = ShrinkerRegistry::new();
    let events = VmEvents::new();
    let (cache, objects, _) = object_cache(1000);
    let handle = registry.register(Box::new(cache), DEFAULT_SEEKS);

    let freed = registry.shrink_slab(usize::MAX / 2, AllocFlags::KERNEL, 0, &events);
    kassert!(freed == 1000, "(SHRINK) liberados=", freed);
    kassert!(objects.load(Ordering::Relaxed) == 0, "(SHRINK) objetos restantes");
    // 15 sub-lotes de 128 saem dos 2000; sobram 80
    kassert!(registry.pending(handle) == Ok(80), "(SHRINK) pendência após saturar");

    let freed = registry.shrink_slab(usize::MAX, AllocFlags::KERNEL, usize::MAX, &events);
    kassert!(freed == 0, "(SHRINK) cache vazio liberou");
    TestResult::Passed
}

crate::host_suite!(
    test_register_unregister,
    test_proportional_pressure,
    test_zero_scanned_uses_batch,
    test_stop_parks_work,
    test_huge_scan_saturates,
);
