//! # kswapd - Kernel Swap Daemon
//!
//! Um daemon por nodo. Dorme até uma zona cair abaixo de `pages_low` e
//! então balanceia o nodo inteiro até todas as zonas passarem de
//! `pages_high`.
//!
//! ## Balanceamento
//!
//! Para cada prioridade (de `DEF_PRIORITY` até 0), encontra a zona de maior
//! índice abaixo de `pages_high` e varre todas as zonas de 0 até ela, na
//! ordem de fallback. As zonas menores são varridas mesmo satisfeitas, para
//! o aging acompanhar a pressão de alocação.
//!
//! Uma zona que foi varrida 4× o tamanho das suas LRUs sem devolver nada é
//! marcada `all_unreclaimable` e só volta a ser varrida em `DEF_PRIORITY`.

use core::sync::atomic::Ordering;

use super::{AllocFlags, Reclaimer, ScanControl};
use crate::mm::config::{CONGESTION_WAIT, DEF_PRIORITY, SWAP_CLUSTER_MAX, UNRECLAIMABLE_FACTOR};
use crate::mm::error::MmResult;
use crate::mm::pmm::{Node, Watermark, Zone};
use crate::mm::stats::VmEvents;

/// Mecanismo de sono do kswapd (fornecido pelo scheduler hospedeiro).
///
/// Semântica de semáforo binário: um `wake` sem ninguém dormindo faz o
/// próximo `sleep` retornar na hora.
pub trait KswapdWaiter: Send + Sync {
    fn sleep(&self);
    fn wake(&self);
}

impl Reclaimer {
    /// Balanceia o nodo.
    ///
    /// `nr_pages == 0`: até todas as zonas passarem de `pages_high` para
    /// alocações de `order`. `nr_pages > 0`: até liberar `nr_pages`,
    /// ignorando watermarks (suspend-to-disk).
    ///
    /// Retorna o total liberado.
    pub fn balance_pgdat(&self, node: &Node, nr_pages: usize, order: u32) -> usize {
        let zones = node.zones();
        if zones.is_empty() {
            return 0;
        }

        let max_retries = self.tunables.kswapd_max_retries();
        let mut retries = 0;
        let mut total_reclaimed;

        loop {
            let mut total_scanned = 0;
            total_reclaimed = 0;
            let mut all_zones_ok = true;
            let mut stopped = false;

            let mut sc = ScanControl::new(AllocFlags::KERNEL, self.states.nr_mapped());
            sc.is_kswapd = true;
            VmEvents::add(&self.events.pageoutrun, 1);

            for zone in zones {
                zone.set_temp_priority(DEF_PRIORITY);
            }

            for priority in (0..=DEF_PRIORITY).rev() {
                if node.kswapd_stop.load(Ordering::Acquire) {
                    stopped = true;
                    break;
                }
                all_zones_ok = true;

                let end_zone = if nr_pages == 0 {
                    let needy = zones.iter().rposition(|zone| {
                        scannable(zone, priority) && !zone.zone_watermark_ok(order, Watermark::High)
                    });
                    match needy {
                        Some(i) => i,
                        None => break,
                    }
                } else {
                    zones.len() - 1
                };

                let lru_pages = node.nr_lru_pages(end_zone);

                for zone in &zones[..=end_zone] {
                    if !scannable(zone, priority) {
                        continue;
                    }
                    if nr_pages == 0 && !zone.zone_watermark_ok(order, Watermark::High) {
                        all_zones_ok = false;
                    }

                    zone.note_priority(priority);
                    sc.nr_scanned = 0;
                    sc.nr_reclaimed = 0;
                    sc.priority = priority;
                    sc.swap_cluster_max = if nr_pages > 0 { nr_pages } else { SWAP_CLUSTER_MAX };

                    self.shrink_zone(zone, &mut sc);
                    let nr_slab = self.shrinkers.shrink_slab(
                        sc.nr_scanned,
                        AllocFlags::KERNEL,
                        lru_pages,
                        &self.events,
                    );
                    total_reclaimed += sc.nr_reclaimed;
                    total_scanned += sc.nr_scanned;

                    if zone.all_unreclaimable() {
                        continue;
                    }
                    let (nr_active, nr_inactive) = zone.lru_counts();
                    if nr_slab == 0
                        && zone.pages_scanned() >= (nr_active + nr_inactive) * UNRECLAIMABLE_FACTOR
                    {
                        zone.set_all_unreclaimable();
                    }

                    if total_scanned > SWAP_CLUSTER_MAX * 2
                        && total_scanned > total_reclaimed + total_reclaimed / 2
                    {
                        sc.may_writepage = true;
                    }
                }

                if nr_pages > 0 && nr_pages > total_reclaimed {
                    continue;
                }
                if all_zones_ok {
                    break;
                }
                if total_scanned > 0 && priority < DEF_PRIORITY - 2 {
                    self.io.congestion_wait(CONGESTION_WAIT);
                }
                if total_reclaimed >= SWAP_CLUSTER_MAX {
                    break;
                }
            }

            for zone in zones {
                zone.commit_priority();
            }

            if all_zones_ok || stopped {
                break;
            }
            retries += 1;
            if retries >= max_retries {
                crate::kwarn!("(KSWAPD) desistindo após retries=", retries);
                for zone in zones {
                    zone.print_stats();
                }
                break;
            }
        }

        total_reclaimed
    }

    /// Chamado pelo alocador: acorda o kswapd do nodo se `zone` caiu
    /// abaixo de `pages_low` para alocações de `order`.
    pub fn wakeup_kswapd(&self, zone: &Zone, order: u32) {
        if zone.present_pages() == 0 {
            return;
        }
        if zone.zone_watermark_ok(order, Watermark::Low) {
            return;
        }
        let node = match self.node(zone.node_id()) {
            Ok(node) => node,
            Err(_) => return,
        };
        node.kswapd_max_order.fetch_max(order, Ordering::AcqRel);
        if let Some(waiter) = node.kswapd_waiter() {
            waiter.wake();
        }
    }

    /// Laço do kswapd do nodo `node_id`. Só retorna após `stop_kswapd`.
    ///
    /// Não dorme se um pedido de ordem maior chegou enquanto trabalhava.
    pub fn kswapd(&self, node_id: usize) -> MmResult<()> {
        let node = self.node(node_id)?;
        let mut order = 0;

        crate::kinfo!("(KSWAPD) iniciado no nodo ", node_id);

        loop {
            if node.kswapd_stop.load(Ordering::Acquire) {
                break;
            }

            let new_order = node.kswapd_max_order.swap(0, Ordering::AcqRel);
            if order < new_order {
                order = new_order;
            } else {
                if let Some(waiter) = node.kswapd_waiter() {
                    waiter.sleep();
                }
                if node.kswapd_stop.load(Ordering::Acquire) {
                    break;
                }
                order = node.kswapd_max_order();
            }

            self.balance_pgdat(node, 0, order);
        }

        crate::kinfo!("(KSWAPD) encerrado no nodo ", node_id);
        Ok(())
    }

    /// Pede ao kswapd do nodo que termine. O lote em andamento é devolvido
    /// às listas antes do laço sair.
    pub fn stop_kswapd(&self, node_id: usize) -> MmResult<()> {
        let node = self.node(node_id)?;
        node.kswapd_stop.store(true, Ordering::Release);
        if let Some(waiter) = node.kswapd_waiter() {
            waiter.wake();
        }
        Ok(())
    }

    /// Libera `nr_pages` em todos os nodos, ignorando watermarks
    /// (suspend-to-disk). Retorna o total liberado.
    pub fn shrink_all_memory(&self, nr_pages: usize) -> usize {
        let mut to_free = nr_pages;
        let mut ret = 0;

        for node in &self.nodes {
            if to_free == 0 {
                break;
            }
            let freed = self.balance_pgdat(node, to_free, 0);
            ret += freed;
            to_free = to_free.saturating_sub(freed);
        }

        crate::kinfo!("(KSWAPD) shrink_all_memory liberadas=", ret);
        ret
    }
}

/// A zona participa desta prioridade?
#[inline]
fn scannable(zone: &Zone, priority: i32) -> bool {
    zone.present_pages() > 0 && !(zone.all_unreclaimable() && priority != DEF_PRIORITY)
}
