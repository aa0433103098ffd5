//! Driver de reclaim por zona.
//!
//! Uma passada sobre uma zona em uma prioridade: converte a dívida de scan
//! acumulada em pedidos de scan e alterna aging (lista ativa) com eviction
//! (lista inativa), em lotes de `swap_cluster_max`.

use core::sync::atomic::{AtomicUsize, Ordering};

use super::isolate::isolate_batch;
use super::{Reclaimer, ScanControl};
use crate::mm::pmm::{LruList, Zone};
use crate::mm::stats::VmEvents;

/// Acumula `(nr_pages >> priority) + 1` na dívida.
///
/// Se a dívida alcança `batch`, ela inteira vira pedido de scan e zera;
/// senão fica para a próxima passada e o pedido é 0. Nunca se perde nem
/// se conta duas vezes.
fn take_scan_debt(debt: &AtomicUsize, nr_pages: usize, priority: i32, batch: usize) -> usize {
    let shift = priority.clamp(0, usize::BITS as i32 - 1) as u32;
    let add = (nr_pages >> shift) + 1;
    let prev = debt
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |d| {
            let acc = d + add;
            Some(if acc >= batch { 0 } else { acc })
        })
        .unwrap_or(0);
    let acc = prev + add;
    if acc >= batch {
        acc
    } else {
        0
    }
}

impl Reclaimer {
    /// Uma passada de reclaim sobre `zone` na prioridade `sc.priority`.
    pub fn shrink_zone(&self, zone: &Zone, sc: &mut ScanControl) {
        zone.begin_reclaim();

        let (nr_active_pages, nr_inactive_pages) = zone.lru_counts();
        let mut nr_active = take_scan_debt(
            &zone.nr_scan_active,
            nr_active_pages,
            sc.priority,
            sc.swap_cluster_max,
        );
        let mut nr_inactive = take_scan_debt(
            &zone.nr_scan_inactive,
            nr_inactive_pages,
            sc.priority,
            sc.swap_cluster_max,
        );

        sc.nr_to_reclaim = sc.swap_cluster_max as isize;

        while nr_active > 0 || nr_inactive > 0 {
            if nr_active > 0 {
                sc.nr_to_scan = nr_active.min(sc.swap_cluster_max);
                nr_active -= sc.nr_to_scan;
                self.refill_inactive_zone(zone, sc);
            }

            if nr_inactive > 0 {
                let max_scan = nr_inactive.min(sc.swap_cluster_max);
                nr_inactive -= max_scan;
                self.shrink_inactive_list(zone, sc, max_scan);
                if sc.nr_to_reclaim <= 0 {
                    break;
                }
            }
        }

        // Alvo atingido antes do fim: o pedido restante volta para a dívida
        if nr_active > 0 {
            zone.nr_scan_active.fetch_add(nr_active, Ordering::Relaxed);
        }
        if nr_inactive > 0 {
            zone.nr_scan_inactive.fetch_add(nr_inactive, Ordering::Relaxed);
        }

        self.io.throttle_vm_writeout();
        zone.end_reclaim();
    }

    /// Isola e avalia até `max_scan` páginas da lista inativa.
    ///
    /// Tudo o que não foi liberado volta às listas antes do retorno.
    /// Retorna o número de páginas liberadas.
    pub fn shrink_inactive_list(&self, zone: &Zone, sc: &mut ScanControl, max_scan: usize) -> usize {
        let mut max_scan = max_scan;
        let mut total_freed = 0;

        while max_scan > 0 {
            let batch = isolate_batch(zone, LruList::Inactive, max_scan.min(sc.swap_cluster_max));
            if batch.nr_taken() == 0 {
                break;
            }
            max_scan = max_scan.saturating_sub(batch.nr_scanned);

            let pgscan = if sc.is_kswapd {
                &self.events.pgscan_kswapd
            } else {
                &self.events.pgscan_direct
            };
            VmEvents::add(pgscan, batch.nr_scanned);

            let (nr_freed, keep) = self.shrink_page_list(zone, batch.pages, sc);
            if sc.is_kswapd {
                VmEvents::add(&self.events.kswapd_steal, nr_freed);
            }
            VmEvents::add(&self.events.pgsteal, nr_freed);
            sc.nr_to_reclaim -= nr_freed as isize;
            total_freed += nr_freed;

            zone.putback(keep);
        }

        total_freed
    }
}
