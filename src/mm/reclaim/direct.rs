//! Reclaim direto.
//!
//! Chamado pelo alocador quando a alocação falha: varre as zonas
//! candidatas escalando a prioridade até liberar um lote ou esgotar.

use alloc::sync::Arc;

use super::{AllocFlags, Reclaimer, ScanControl};
use crate::mm::config::{CONGESTION_WAIT, DEF_PRIORITY};
use crate::mm::pmm::Zone;
use crate::mm::stats::VmEvents;

impl Reclaimer {
    /// Passada sobre as zonas candidatas na prioridade `sc.priority`.
    ///
    /// Zonas `all_unreclaimable` só são varridas em `DEF_PRIORITY`; nas
    /// demais o kswapd cuida delas.
    fn shrink_caches(&self, zones: &[Arc<Zone>], sc: &mut ScanControl) {
        for zone in zones {
            if zone.present_pages() == 0 {
                continue;
            }
            zone.note_priority(sc.priority);
            if zone.all_unreclaimable() && sc.priority != DEF_PRIORITY {
                continue;
            }
            self.shrink_zone(zone, sc);
        }
    }

    /// Tenta liberar um lote (`SWAP_CLUSTER_MAX`) de páginas das `zones`
    /// (em ordem de preferência do alocador).
    ///
    /// Retorna `true` se liberou o suficiente: o chamador refaz a alocação.
    /// Em `false`, a política de OOM é do chamador.
    pub fn try_to_free_pages(&self, zones: &[Arc<Zone>], gfp: AllocFlags) -> bool {
        let mut sc = ScanControl::new(gfp, self.states.nr_mapped());
        sc.may_writepage = !self.tunables.laptop_mode();

        VmEvents::add(&self.events.allocstall, 1);

        let mut lru_pages = 0;
        for zone in zones {
            zone.set_temp_priority(DEF_PRIORITY);
            let (nr_active, nr_inactive) = zone.lru_counts();
            lru_pages += nr_active + nr_inactive;
        }

        let mut total_scanned = 0;
        let mut total_reclaimed = 0;
        let mut success = false;

        for priority in (0..=DEF_PRIORITY).rev() {
            sc.nr_mapped = self.states.nr_mapped();
            sc.nr_scanned = 0;
            sc.nr_reclaimed = 0;
            sc.priority = priority;

            self.shrink_caches(zones, &mut sc);
            self.shrinkers
                .shrink_slab(sc.nr_scanned, gfp, lru_pages, &self.events);

            total_scanned += sc.nr_scanned;
            total_reclaimed += sc.nr_reclaimed;
            if total_reclaimed >= sc.swap_cluster_max {
                success = true;
                break;
            }

            // Varreu bastante sem liberar: libera o write-back e acorda o flusher
            if total_scanned > sc.swap_cluster_max + sc.swap_cluster_max / 2 {
                let nr = if self.tunables.laptop_mode() { 0 } else { total_scanned };
                self.io.wakeup_flusher(nr);
                sc.may_writepage = true;
            }

            if sc.nr_scanned > 0 && priority < DEF_PRIORITY - 2 {
                self.io.congestion_wait(CONGESTION_WAIT);
            }
        }

        for zone in zones {
            zone.commit_priority();
        }

        if success {
            crate::kdebug!("(VMSCAN) direct reclaim ok, liberadas=", total_reclaimed);
        } else {
            crate::kwarn!("(VMSCAN) direct reclaim falhou, varridas=", total_scanned);
        }
        success
    }
}
