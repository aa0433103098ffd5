//! # Eviction Engine
//!
//! Decide o destino de cada página isolada da lista inativa.
//!
//! A decisão é uma sequência linear de checagens com retorno antecipado;
//! a ordem importa. Nenhum passo bloqueia: toda contenção vira `Keep`.
//! Falhas por página nunca sobem como erro, viram variantes de
//! `EvictOutcome`.

use alloc::sync::Arc;
use alloc::vec::Vec;

use super::{AllocFlags, Reclaimer, ScanControl};
use crate::mm::error::WritebackError;
use crate::mm::page_cache::{AddressSpace, WritebackResult};
use crate::mm::pfm::{page_mapping_inuse, page_referenced, Page, PageFlags, UnmapResult};
use crate::mm::pmm::Zone;
use crate::mm::stats::{PageStates, VmEvents};
use crate::mm::swap::{add_to_swap, delete_from_swap_cache_locked, SwapSlot};

/// Destino de uma página avaliada pelo motor de eviction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvictOutcome {
    /// Volta para a lista inativa; tenta de novo depois.
    Keep,
    /// Em uso real ou impossível de liberar: promove para a ativa.
    Activate,
    /// Write-back submetido e em voo. A página volta à inativa com
    /// `WRITEBACK | RECLAIM`; a conclusão a rotaciona.
    WriteBackPending,
    /// Write-back concluiu na hora (ou não havia o que escrever); a
    /// avaliação continua como página limpa. Só `pageout` produz.
    WriteBackDoneSync,
    /// Liberada e devolvida ao pool da zona.
    Freed,
}

impl Reclaimer {
    /// Avalia um lote isolado. Retorna `(liberadas, a devolver)`.
    ///
    /// As páginas a devolver já têm `ACTIVE` ajustado para a lista alvo.
    pub(crate) fn shrink_page_list(
        &self,
        zone: &Zone,
        pages: Vec<Arc<Page>>,
        sc: &mut ScanControl,
    ) -> (usize, Vec<Arc<Page>>) {
        let mut keep = Vec::with_capacity(pages.len());
        let mut nr_freed = 0;
        let mut nr_activated = 0;

        for page in pages {
            match self.evict_page(zone, &page, sc) {
                EvictOutcome::Freed => nr_freed += 1,
                EvictOutcome::Activate => {
                    page.set(PageFlags::ACTIVE);
                    nr_activated += 1;
                    keep.push(page);
                }
                EvictOutcome::Keep
                | EvictOutcome::WriteBackPending
                | EvictOutcome::WriteBackDoneSync => keep.push(page),
            }
        }

        sc.nr_reclaimed += nr_freed;
        VmEvents::add(&self.events.pgactivate, nr_activated);
        (nr_freed, keep)
    }

    /// Decide o destino de uma página isolada (o chamador segura a
    /// referência de isolamento).
    ///
    /// Em `Freed` a referência de isolamento foi consumida; nos demais
    /// casos a página continua isolada, destravada, e deve ser devolvida.
    pub fn evict_page(&self, zone: &Zone, page: &Arc<Page>, sc: &mut ScanControl) -> EvictOutcome {
        // 1. Nunca esperar pelo lock da página
        if !page.trylock() {
            return EvictOutcome::Keep;
        }

        let outcome = self.evict_locked(zone, page, sc);
        if outcome != EvictOutcome::Freed {
            page.unlock();
        }

        #[cfg(feature = "mm_trace")]
        match outcome {
            EvictOutcome::Keep => crate::ktrace!("(VMSCAN) mantida pfn=", page.pfn()),
            EvictOutcome::Activate => crate::ktrace!("(VMSCAN) ativada pfn=", page.pfn()),
            EvictOutcome::WriteBackPending => crate::ktrace!("(VMSCAN) write-back em voo pfn=", page.pfn()),
            _ => {}
        }
        outcome
    }

    fn evict_locked(&self, zone: &Zone, page: &Arc<Page>, sc: &mut ScanControl) -> EvictOutcome {
        sc.nr_scanned += 1;
        // Pressão dobrada nos caches auxiliares por páginas mapeadas
        if page.is_mapped() || page.is_swapcache() {
            sc.nr_scanned += 1;
        }

        // 2. I/O da passada anterior ainda em voo
        if page.is_writeback() {
            return EvictOutcome::Keep;
        }

        // 3. Checagem consumidora: chamada exatamente uma vez aqui
        let referenced = page_referenced(&*self.rmap, page, true);
        if referenced && page_mapping_inuse(page) {
            return EvictOutcome::Activate;
        }

        // 4. Anônima sem swap: reserva ou desiste
        if page.is_anon() && !page.is_swapcache() {
            if !add_to_swap(&*self.swap, &self.swapper, page) {
                return EvictOutcome::Activate;
            }
            self.set_page_dirty(page);
        }

        // 5. Remove as PTEs
        let mapping = page.mapping();
        if page.is_mapped() && mapping.is_some() {
            match self.rmap.try_to_unmap(page) {
                UnmapResult::Failed => return EvictOutcome::Activate,
                UnmapResult::WouldBlock => return EvictOutcome::Keep,
                UnmapResult::Success => {}
            }
        }

        // 6. Suja: escreve ou desiste
        if page.is_dirty() {
            if referenced {
                return EvictOutcome::Keep;
            }
            let may_enter_fs = sc.gfp.contains(AllocFlags::FS)
                || (page.is_swapcache() && sc.gfp.contains(AllocFlags::IO));
            if !may_enter_fs {
                return EvictOutcome::Keep;
            }
            if self.tunables.laptop_mode() && !sc.may_writepage {
                return EvictOutcome::Keep;
            }

            match self.pageout(page, mapping.as_ref(), sc) {
                EvictOutcome::WriteBackDoneSync => {
                    if page.is_dirty() || page.is_writeback() {
                        return EvictOutcome::Keep;
                    }
                }
                other => return other,
            }
        }

        // 7. Dados privados do cache
        let mapping = page.mapping();
        if page.test(PageFlags::PRIVATE) {
            if page.is_writeback() || !self.io.release_private(page) {
                return EvictOutcome::Activate;
            }
            page.clear(PageFlags::PRIVATE);
            if mapping.is_none() && page.count() == 1 {
                self.free_isolated(zone, page);
                return EvictOutcome::Freed;
            }
        }

        // 8. Truncada em paralelo: o caminho de truncation cuida dela
        let mapping = match mapping {
            Some(mapping) => mapping,
            None => return EvictOutcome::Keep,
        };

        // 9. Checagem final sob o tree_lock
        match self.remove_mapping(&mapping, page) {
            Some(slot) => {
                if let Some(slot) = slot {
                    self.swap.release(slot);
                }
                self.free_isolated(zone, page);
                crate::ktrace!("(VMSCAN) liberada pfn=", page.pfn());
                EvictOutcome::Freed
            }
            None => EvictOutcome::Keep,
        }
    }

    /// Remove a página do índice se só restam a referência do cache e a
    /// do isolamento. `Some(slot)`: removida (com slot de swap a liberar).
    fn remove_mapping(&self, mapping: &AddressSpace, page: &Page) -> Option<Option<SwapSlot>> {
        let mut tree = mapping.tree();
        if page.count() != 2 || page.is_dirty() {
            return None;
        }
        if page.is_swapcache() {
            return delete_from_swap_cache_locked(&mut tree, page).map(Some);
        }
        if AddressSpace::remove_locked(&mut tree, page) {
            Some(None)
        } else {
            None
        }
    }

    /// Solta a referência de isolamento; a última devolve o frame à zona.
    fn free_isolated(&self, zone: &Zone, page: &Arc<Page>) {
        page.unlock();
        zone.put_page(page);
    }

    /// Submete o write-back de uma página suja e travada.
    ///
    /// Retorna `WriteBackDoneSync` com a página limpa e ainda travada; os
    /// demais resultados encerram a avaliação.
    pub(crate) fn pageout(
        &self,
        page: &Page,
        mapping: Option<&Arc<AddressSpace>>,
        sc: &ScanControl,
    ) -> EvictOutcome {
        // Só o cache (se houver mapping) e o isolamento seguram a página.
        // Dados privados não contam referência.
        let expected = 1 + mapping.is_some() as u32;
        if page.count() != expected {
            return EvictOutcome::Keep;
        }

        let mapping = match mapping {
            Some(mapping) => mapping,
            None => {
                // Órfã com buffers: solta os buffers e trata como limpa
                if page.test(PageFlags::PRIVATE) && self.io.release_private(page) {
                    page.clear(PageFlags::PRIVATE);
                    self.clear_page_dirty_for_io(page);
                    return EvictOutcome::WriteBackDoneSync;
                }
                return EvictOutcome::Keep;
            }
        };

        let ops = match mapping.ops() {
            Some(ops) => ops,
            None => return EvictOutcome::Activate,
        };

        if !self.clear_page_dirty_for_io(page) {
            return EvictOutcome::WriteBackDoneSync;
        }

        page.set(PageFlags::RECLAIM);
        let allow_blocking = sc.gfp.contains(AllocFlags::WAIT);
        match ops.writepage(page, allow_blocking) {
            WritebackResult::InFlight => {
                page.set(PageFlags::WRITEBACK);
                PageStates::inc(&self.states.nr_writeback);
                EvictOutcome::WriteBackPending
            }
            WritebackResult::Success => {
                page.clear(PageFlags::RECLAIM);
                EvictOutcome::WriteBackDoneSync
            }
            WritebackResult::StillDirty => {
                page.clear(PageFlags::RECLAIM);
                self.set_page_dirty(page);
                EvictOutcome::Keep
            }
            WritebackResult::Error(err) => {
                page.clear(PageFlags::RECLAIM);
                self.handle_write_error(mapping, page, err);
                EvictOutcome::Keep
            }
        }
    }

    /// Limpa `DIRTY` antes de submeter I/O. Retorna se estava suja.
    fn clear_page_dirty_for_io(&self, page: &Page) -> bool {
        if page.test_and_clear(PageFlags::DIRTY) {
            PageStates::dec(&self.states.nr_dirty);
            return true;
        }
        false
    }

    /// Registra o erro no mapping dono (visto pelo próximo `fsync`) e
    /// marca a página suja de novo para não perder os dados.
    fn handle_write_error(&self, mapping: &Arc<AddressSpace>, page: &Page, err: WritebackError) {
        match page.mapping() {
            Some(current) if Arc::ptr_eq(&current, mapping) => {
                mapping.set_error(err);
                crate::kwarn!("(VMSCAN) erro de write-back, mapping=", mapping.id());
            }
            _ => {}
        }
        self.set_page_dirty(page);
    }
}
