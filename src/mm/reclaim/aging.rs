//! # Page Aging
//!
//! Two-list LRU: decide quais páginas de um lote da lista ativa descem para
//! a inativa (candidatas a reclaim) e quais continuam ativas.
//!
//! O único gate é para páginas mapeadas: elas só descem quando a
//! `swap_tendency` passa de 100, há swap (ou a página não é anônima) e a
//! checagem consumidora de referência diz que ninguém a tocou. Páginas sem
//! PTE sempre descem.

use alloc::vec::Vec;

use super::isolate::isolate_batch;
use super::{Reclaimer, ScanControl};
use crate::klib::div_or_one;
use crate::mm::pfm::{page_referenced, PageFlags};
use crate::mm::pmm::{LruList, Zone};
use crate::mm::stats::VmEvents;

/// Pressão de reclaim derivada da prioridade: 100 em 0, tendendo a 0.
#[inline]
pub fn distress(priority: i32) -> usize {
    100usize >> priority.clamp(0, usize::BITS as i32 - 1) as u32
}

/// `mapped_ratio/2 + distress + swappiness`.
#[inline]
pub fn swap_tendency(mapped_ratio: usize, priority: i32, swappiness: u32) -> usize {
    mapped_ratio / 2 + distress(priority) + swappiness as usize
}

/// Páginas mapeadas podem ser desativadas nesta passada?
#[inline]
pub fn reclaim_mapped(mapped_ratio: usize, priority: i32, swappiness: u32) -> bool {
    swap_tendency(mapped_ratio, priority, swappiness) >= 100
}

impl Reclaimer {
    /// Varre até `sc.nr_to_scan` páginas da lista ativa e rebalanceia.
    pub fn refill_inactive_zone(&self, zone: &Zone, sc: &mut ScanControl) {
        let batch = isolate_batch(zone, LruList::Active, sc.nr_to_scan);
        let pgscanned = batch.nr_scanned;

        let mapped_ratio = div_or_one(sc.nr_mapped * 100, self.states.total_pages());
        let reclaim_mapped = reclaim_mapped(mapped_ratio, sc.priority, self.tunables.swappiness());
        let no_swap = self.swap.total_pages() == 0;

        let mut l_active = Vec::new();
        let mut l_inactive = Vec::with_capacity(batch.pages.len());

        for page in batch.pages {
            if page.is_mapped()
                && (!reclaim_mapped
                    || (no_swap && page.is_anon())
                    || page_referenced(&*self.rmap, &page, false))
            {
                l_active.push(page);
                continue;
            }
            page.clear(PageFlags::ACTIVE);
            l_inactive.push(page);
        }

        let pgdeactivate = l_inactive.len();
        let nr_kept = l_active.len();
        zone.putback(l_inactive);
        zone.putback(l_active);

        VmEvents::add(&self.events.pgrefill, pgscanned);
        VmEvents::add(&self.events.pgdeactivate, pgdeactivate);
        VmEvents::add(&self.events.pgactivate, nr_kept);

        if pgdeactivate > 0 || nr_kept > 0 {
            crate::ktrace!("(VMSCAN) refill: desativadas=", pgdeactivate);
        }
    }
}
