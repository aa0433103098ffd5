//! # Page Reclaim Subsystem
//!
//! Decide, sob pressão de memória, quais páginas sair do page cache e do
//! working set, dirige o write-back e as devolve ao pool da zona.
//!
//! ## 🏗️ Arquitetura dos Módulos
//!
//! | Módulo     | Responsabilidade |
//! |------------|------------------|
//! | `isolate`  | Tira lotes da ponta de reclaim de uma lista sob o `lru_lock`. |
//! | `evict`    | Máquina de decisão por página (keep/activate/write-back/free). |
//! | `aging`    | Move páginas ativa → inativa conforme a swap tendency. |
//! | `zone`     | Uma passada sobre uma zona em uma prioridade (dívida de scan). |
//! | `shrinker` | Caches auxiliares registrados (slab) e sua pressão proporcional. |
//! | `direct`   | Reclaim síncrono do alocador, escalando prioridade. |
//! | `kswapd`   | Daemon de balanceamento por nodo, converge para `pages_high`. |
//!
//! ## Locks (ordem)
//!
//! `shrinker registry (read)` → `lru_lock` da zona → `tree_lock` do mapping.
//! A decisão por página nunca segura o `lru_lock`.

pub mod aging;
pub mod direct;
pub mod evict;
pub mod io;
pub mod isolate;
pub mod kswapd;
pub mod shrinker;
pub mod zone;

pub use aging::swap_tendency;
pub use evict::EvictOutcome;
pub use io::IoControl;
pub use kswapd::KswapdWaiter;
pub use shrinker::{ShrinkReply, Shrinker, ShrinkerHandle, ShrinkerRegistry};

use alloc::sync::Arc;
use alloc::vec::Vec;

use bitflags::bitflags;

use crate::mm::config::{Tunables, DEF_PRIORITY, SWAP_CLUSTER_MAX};
use crate::mm::error::{MmError, MmResult};
use crate::mm::page_cache::{AddressSpace, AddressSpaceOps};
use crate::mm::pfm::{Page, PageFlags, ReverseMap};
use crate::mm::pmm::{Node, Zone};
use crate::mm::stats::{PageStates, VmEvents};
use crate::mm::swap::SwapBackend;

bitflags! {
    /// Contexto da alocação que disparou o reclaim.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct AllocFlags: u32 {
        /// Pode dormir
        const WAIT    = 1 << 0;
        /// Pode iniciar I/O
        const IO      = 1 << 1;
        /// Pode entrar no filesystem
        const FS      = 1 << 2;
        /// Não insistir
        const NORETRY = 1 << 3;

        const NOIO   = Self::WAIT.bits();
        const NOFS   = Self::WAIT.bits() | Self::IO.bits();
        const KERNEL = Self::WAIT.bits() | Self::IO.bits() | Self::FS.bits();
    }
}

/// Parâmetros e totais de uma invocação de reclaim.
///
/// Pertence exclusivamente ao laço que a criou.
#[derive(Clone, Debug)]
pub struct ScanControl {
    /// Pedido de scan da passada atual
    pub nr_to_scan: usize,
    /// Páginas varridas (mapeadas e swap cache contam em dobro)
    pub nr_scanned: usize,
    /// Páginas liberadas
    pub nr_reclaimed: usize,
    /// Quanto ainda falta liberar nesta zona
    pub nr_to_reclaim: isize,
    /// Snapshot de `nr_mapped` para a swap tendency
    pub nr_mapped: usize,
    /// 0 = mais agressivo
    pub priority: i32,
    pub may_writepage: bool,
    pub gfp: AllocFlags,
    pub swap_cluster_max: usize,
    pub is_kswapd: bool,
}

impl ScanControl {
    pub fn new(gfp: AllocFlags, nr_mapped: usize) -> Self {
        Self {
            nr_to_scan: 0,
            nr_scanned: 0,
            nr_reclaimed: 0,
            nr_to_reclaim: SWAP_CLUSTER_MAX as isize,
            nr_mapped,
            priority: DEF_PRIORITY,
            may_writepage: false,
            gfp,
            swap_cluster_max: SWAP_CLUSTER_MAX,
            is_kswapd: false,
        }
    }
}

/// Colaboradores externos do núcleo de reclaim.
pub struct Collaborators {
    pub rmap: Arc<dyn ReverseMap>,
    pub swap: Arc<dyn SwapBackend>,
    /// Transporte de write-back do swap cache
    pub swap_ops: Arc<dyn AddressSpaceOps>,
    pub io: Arc<dyn IoControl>,
}

/// O núcleo de reclaim: nodos, shrinkers, tunables, contadores e
/// colaboradores. Nada aqui é estado global ambiente.
pub struct Reclaimer {
    nodes: Vec<Arc<Node>>,
    shrinkers: ShrinkerRegistry,
    tunables: Tunables,
    states: Arc<PageStates>,
    events: VmEvents,
    rmap: Arc<dyn ReverseMap>,
    swap: Arc<dyn SwapBackend>,
    io: Arc<dyn IoControl>,
    swapper: Arc<AddressSpace>,
}

impl Reclaimer {
    pub fn new(nodes: Vec<Arc<Node>>, states: Arc<PageStates>, collab: Collaborators) -> Self {
        let total: usize = nodes.iter().map(|n| n.present_pages()).sum();
        states
            .total_pages
            .store(total, core::sync::atomic::Ordering::Relaxed);

        crate::kinfo!("(VMSCAN) reclaim iniciado, páginas=", total);

        Self {
            nodes,
            shrinkers: ShrinkerRegistry::new(),
            tunables: Tunables::new(),
            states,
            events: VmEvents::new(),
            rmap: collab.rmap,
            swap: collab.swap,
            io: collab.io,
            swapper: AddressSpace::new_swapper(collab.swap_ops),
        }
    }

    pub fn nodes(&self) -> &[Arc<Node>] {
        &self.nodes
    }

    pub fn node(&self, id: usize) -> MmResult<&Arc<Node>> {
        self.nodes
            .iter()
            .find(|n| n.id() == id)
            .ok_or(MmError::OutOfBounds)
    }

    /// Zona dona da página.
    pub fn zone_of(&self, page: &Page) -> MmResult<&Arc<Zone>> {
        self.nodes
            .iter()
            .find_map(|n| n.zone_for_pfn(page.pfn()))
            .ok_or(MmError::OutOfBounds)
    }

    pub fn shrinkers(&self) -> &ShrinkerRegistry {
        &self.shrinkers
    }

    pub fn tunables(&self) -> &Tunables {
        &self.tunables
    }

    pub fn states(&self) -> &PageStates {
        &self.states
    }

    pub fn events(&self) -> &VmEvents {
        &self.events
    }

    /// O mapping do swap cache.
    pub fn swapper(&self) -> &Arc<AddressSpace> {
        &self.swapper
    }

    // -------------------------------------------------------------------------
    // Transições de página vindas de fora do reclaim
    // -------------------------------------------------------------------------

    /// Marca a página suja. Retorna `true` se ela estava limpa.
    pub fn set_page_dirty(&self, page: &Page) -> bool {
        if page.test_and_set(PageFlags::DIRTY) {
            return false;
        }
        PageStates::inc(&self.states.nr_dirty);
        true
    }

    /// Conclusão assíncrona de write-back.
    ///
    /// Se o reclaim pediu (`RECLAIM`), a página vai para a ponta de reclaim
    /// da lista inativa para ser liberada logo na próxima passada.
    pub fn end_page_writeback(&self, page: &Arc<Page>) {
        let rotated = page.test_and_clear(PageFlags::RECLAIM)
            && self
                .zone_of(page)
                .map(|zone| zone.rotate_reclaimable_page(page))
                .unwrap_or(false);

        if !page.test_and_clear(PageFlags::WRITEBACK) {
            crate::kwarn!("(VMSCAN) end_page_writeback sem write-back, pfn=", page.pfn());
            return;
        }
        PageStates::dec(&self.states.nr_writeback);
        if rotated {
            VmEvents::add(&self.events.pgrotated, 1);
        }
    }

    /// Truncation: tira a página do mapping e da LRU.
    ///
    /// Bloqueia no lock da página: este caminho já se comprometeu com ela.
    /// Se a página estiver isolada, quem a isolou solta a última referência.
    pub fn truncate_page(&self, page: &Arc<Page>) -> MmResult<()> {
        let zone = self.zone_of(page)?;
        if !page.get_unless_zero() {
            return Err(MmError::InvalidParameter);
        }

        page.lock();
        if let Some(mapping) = page.mapping() {
            if page.test_and_clear(PageFlags::DIRTY) {
                PageStates::dec(&self.states.nr_dirty);
            }
            mapping.remove_page(page);
        }
        page.unlock();

        // NotOnLru: a página está isolada e o putback do isolador solta a
        // última referência
        match zone.del_page_from_lru(page) {
            Ok(()) | Err(MmError::NotOnLru) => {}
            Err(err) => {
                zone.put_page(page);
                return Err(err);
            }
        }
        zone.put_page(page);
        Ok(())
    }
}
