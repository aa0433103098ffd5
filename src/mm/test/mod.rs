//! # Testes do Subsistema de Memória
//!
//! Organização modular dos testes:
//! - `lru_test.rs` - Listas LRU, isolamento e membership
//! - `evict_test.rs` - Motor de eviction e write-back
//! - `aging_test.rs` - Aging ativo/inativo e swap tendency
//! - `zone_test.rs` - Dívida de scan e driver por zona
//! - `shrinker_test.rs` - Registro de shrinkers
//! - `reclaim_test.rs` - Reclaim direto e kswapd
//! - `mock.rs` - Colaboradores falsos
//!
//! No host cada caso vira um `#[test]`; no boot (feature `self_test`)
//! `run_reclaim_tests` roda as suítes e reporta pela serial.

pub mod lru_test;
pub mod shrinker_test;

// Testes SMP (threads do host)
#[cfg(test)]
pub mod smp;

use crate::klib::test_framework::{run_test_suite, TestCase};

const SUITES: &[(&str, &[TestCase])] = &[
    ("LRU", lru_test::LRU_TESTS),
    ("Eviction", evict_test::EVICT_TESTS),
    ("Aging", aging_test::AGING_TESTS),
    ("Zone", zone_test::ZONE_TESTS),
    ("Shrinker", shrinker_test::SHRINKER_TESTS),
    ("Reclaim", reclaim_test::RECLAIM_TESTS),
];

/// Executa todas as suítes de reclaim. Retorna `(passed, failed)`.
pub fn run_reclaim_tests() -> (usize, usize) {
    crate::kinfo!("╔════════════════════════════════════════╗");
    crate::kinfo!("║     🧪 TESTES DE RECLAIM               ║");
    crate::kinfo!("╚════════════════════════════════════════╝");

    let mut passed = 0;
    let mut failed = 0;
    for (name, tests) in SUITES {
        let (p, f, _) = run_test_suite(name, tests);
        passed += p;
        failed += f;
    }

    if failed == 0 {
        crate::kinfo!("(TEST) ✓ Todas as suítes de reclaim passaram");
    } else {
        crate::kerror!("(TEST) suítes com falha, casos=", failed);
    }
    (passed, failed)
}

#[cfg(test)]
mod host {
    #[test]
    fn run_reclaim_tests_reports_no_failures() {
        let (passed, failed) = super::run_reclaim_tests();
        assert_eq!(failed, 0);
        assert!(passed > 0);
    }
}
