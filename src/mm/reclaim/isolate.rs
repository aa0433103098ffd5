//! Isolamento em lote.
//!
//! Move até N páginas da ponta de reclaim de uma lista compartilhada para um
//! lote privado, segurando o `lru_lock` só durante a retirada. O processamento
//! do lote roda sem lock; concorrentes podem isolar da mesma lista.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::Ordering;

use crate::mm::pfm::Page;
use crate::mm::pmm::{LruList, Zone};

/// Lote isolado de uma lista.
pub struct IsolatedBatch {
    pub pages: Vec<Arc<Page>>,
    /// Tentativas (inclui as que falharam)
    pub nr_scanned: usize,
}

impl IsolatedBatch {
    #[inline]
    pub fn nr_taken(&self) -> usize {
        self.pages.len()
    }
}

/// Isola até `max_count` páginas de `list`.
///
/// Uma página que não pôde ser reivindicada não aborta o lote: fica na
/// posição original e a próxima é tentada. `pages_scanned` da zona sobe
/// pelo número de tentativas.
pub fn isolate_batch(zone: &Zone, list: LruList, max_count: usize) -> IsolatedBatch {
    let mut pages = Vec::with_capacity(max_count);
    let nr_scanned = {
        let mut lru = zone.lru.lock();
        let (_, scanned) = lru.isolate_tail(list, max_count, &mut pages);
        zone.pages_scanned.fetch_add(scanned, Ordering::Relaxed);
        scanned
    };

    if !pages.is_empty() {
        crate::ktrace!("(LRU) isolate_batch: isoladas=", pages.len());
    }
    IsolatedBatch { pages, nr_scanned }
}
