//! # Listas LRU da Zona
//!
//! Registro das páginas recuperáveis: duas sequências ordenadas (ativa e
//! inativa) sob o `lru_lock` da zona.
//!
//! Convenção de ordem: `front` = tocada mais recentemente, `back` = mais
//! antiga (ponta de reclaim). Toda mutação de lista segura o lock; a decisão
//! por página roda fora dele, sobre páginas isoladas.
//!
//! Invariante: uma página está em exatamente uma de {ativa, inativa,
//! isolada, livre}. `LRU` está setado sse a página está ligada em uma lista.

use alloc::collections::VecDeque;
use alloc::sync::Arc;
use alloc::vec::Vec;

use super::zones::Zone;
use crate::mm::config::PAGEVEC_SIZE;
use crate::mm::error::{MmError, MmResult};
use crate::mm::pfm::{Page, PageFlags};

/// Qual das duas listas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LruList {
    Active,
    Inactive,
}

/// Resultado de uma tentativa de isolamento.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IsolateResult {
    /// Página removida da lista; o chamador ganhou uma referência.
    Isolated,
    /// Página não estava em nenhuma lista (já isolada por outro).
    NotOnList,
    /// Contagem zero: a página está sendo liberada em outro caminho.
    BeingFreedElsewhere,
}

/// Listas e contadores protegidos pelo `lru_lock`.
pub struct ZoneLru {
    active: VecDeque<Arc<Page>>,
    inactive: VecDeque<Arc<Page>>,
    nr_active: usize,
    nr_inactive: usize,
}

impl ZoneLru {
    pub(crate) const fn new() -> Self {
        Self {
            active: VecDeque::new(),
            inactive: VecDeque::new(),
            nr_active: 0,
            nr_inactive: 0,
        }
    }

    fn list_mut(&mut self, which: LruList) -> &mut VecDeque<Arc<Page>> {
        match which {
            LruList::Active => &mut self.active,
            LruList::Inactive => &mut self.inactive,
        }
    }

    fn inc(&mut self, which: LruList) {
        match which {
            LruList::Active => self.nr_active += 1,
            LruList::Inactive => self.nr_inactive += 1,
        }
    }

    fn dec(&mut self, which: LruList) {
        match which {
            LruList::Active => self.nr_active -= 1,
            LruList::Inactive => self.nr_inactive -= 1,
        }
    }

    fn list_of(page: &Page) -> LruList {
        if page.is_active() {
            LruList::Active
        } else {
            LruList::Inactive
        }
    }

    /// Liga na ponta recente da lista indicada pelo flag `ACTIVE`.
    pub(crate) fn link_front(&mut self, page: Arc<Page>) {
        let which = Self::list_of(&page);
        page.set(PageFlags::LRU);
        self.list_mut(which).push_front(page);
        self.inc(which);
    }

    /// Liga na ponta de reclaim (rotação).
    fn link_back(&mut self, page: Arc<Page>) {
        let which = Self::list_of(&page);
        page.set(PageFlags::LRU);
        self.list_mut(which).push_back(page);
        self.inc(which);
    }

    /// Remove da lista em que está. Limpa `LRU`.
    pub(crate) fn unlink(&mut self, page: &Page) -> bool {
        let which = Self::list_of(page);
        let list = self.list_mut(which);
        match list.iter().position(|p| p.pfn() == page.pfn()) {
            Some(pos) => {
                list.remove(pos);
                self.dec(which);
                page.clear(PageFlags::LRU);
                true
            }
            None => false,
        }
    }

    pub(crate) fn contains(&self, page: &Page, active: bool) -> bool {
        let list = if active { &self.active } else { &self.inactive };
        list.iter().any(|p| p.pfn() == page.pfn())
    }

    /// Reivindica uma página já retirada da lista.
    ///
    /// O claim é o test-and-clear atômico de `LRU`. Se a contagem já chegou
    /// a zero, devolve o flag e reporta `BeingFreedElsewhere`.
    fn claim(page: &Page) -> IsolateResult {
        if !page.test_and_clear(PageFlags::LRU) {
            return IsolateResult::NotOnList;
        }
        if !page.get_unless_zero() {
            page.set(PageFlags::LRU);
            return IsolateResult::BeingFreedElsewhere;
        }
        IsolateResult::Isolated
    }

    /// Isola até `max` páginas da ponta de reclaim de `which`.
    ///
    /// Cada tentativa conta como varrida. Páginas que não puderam ser
    /// reivindicadas voltam para a mesma posição na ponta de reclaim.
    /// Retorna `(nr_taken, nr_scanned)`.
    pub(crate) fn isolate_tail(
        &mut self,
        which: LruList,
        max: usize,
        dst: &mut Vec<Arc<Page>>,
    ) -> (usize, usize) {
        let mut skipped: Vec<Arc<Page>> = Vec::new();
        let mut taken = 0;
        let mut scanned = 0;

        while scanned < max {
            let page = match self.list_mut(which).pop_back() {
                Some(page) => page,
                None => break,
            };
            scanned += 1;
            match Self::claim(&page) {
                IsolateResult::Isolated => {
                    self.dec(which);
                    dst.push(page);
                    taken += 1;
                }
                _ => skipped.push(page),
            }
        }

        let list = self.list_mut(which);
        for page in skipped.into_iter().rev() {
            list.push_back(page);
        }
        (taken, scanned)
    }
}

// =============================================================================
// API DO REGISTRO (por zona)
// =============================================================================

impl Zone {
    /// Contadores `(nr_active, nr_inactive)`.
    pub fn lru_counts(&self) -> (usize, usize) {
        let lru = self.lru.lock();
        (lru.nr_active, lru.nr_inactive)
    }

    pub fn nr_active(&self) -> usize {
        self.lru.lock().nr_active
    }

    pub fn nr_inactive(&self) -> usize {
        self.lru.lock().nr_inactive
    }

    /// Adiciona uma página nova à lista inativa.
    pub fn lru_cache_add(&self, page: &Arc<Page>) -> MmResult<()> {
        self.lru_add(page, false)
    }

    /// Adiciona uma página nova direto à lista ativa.
    pub fn lru_cache_add_active(&self, page: &Arc<Page>) -> MmResult<()> {
        self.lru_add(page, true)
    }

    fn lru_add(&self, page: &Arc<Page>, active: bool) -> MmResult<()> {
        if page.zone_idx() != self.idx() {
            return Err(MmError::InvalidParameter);
        }
        let mut lru = self.lru.lock();
        if page.on_lru() {
            return Err(MmError::AlreadyOnLru);
        }
        if active {
            page.set(PageFlags::ACTIVE);
        } else {
            page.clear(PageFlags::ACTIVE);
        }
        lru.link_front(page.clone());
        Ok(())
    }

    /// Remove da LRU (caminho de truncation/liberação).
    pub fn del_page_from_lru(&self, page: &Page) -> MmResult<()> {
        let mut lru = self.lru.lock();
        if !page.on_lru() || !lru.unlink(page) {
            return Err(MmError::NotOnLru);
        }
        page.clear(PageFlags::ACTIVE);
        Ok(())
    }

    /// Promove uma página inativa para a ponta recente da lista ativa.
    pub fn activate_page(&self, page: &Arc<Page>) -> bool {
        let mut lru = self.lru.lock();
        if !page.on_lru() || page.is_active() {
            return false;
        }
        if !lru.unlink(page) {
            return false;
        }
        page.set(PageFlags::ACTIVE);
        lru.link_front(page.clone());
        true
    }

    /// Acesso via read/write: inativa+referenciada → ativa; senão marca
    /// referenciada. Dois toques promovem.
    pub fn mark_page_accessed(&self, page: &Arc<Page>) {
        if !page.is_active() && page.test(PageFlags::REFERENCED) && page.on_lru() {
            if self.activate_page(page) {
                page.clear(PageFlags::REFERENCED);
            }
        } else if !page.test(PageFlags::REFERENCED) {
            page.mark_referenced();
        }
    }

    /// Move para a ponta de reclaim da lista inativa uma página cujo
    /// write-back acabou de terminar. Retorna `true` se rotacionou.
    pub fn rotate_reclaimable_page(&self, page: &Arc<Page>) -> bool {
        if page.is_locked() || page.is_dirty() || page.is_active() || !page.on_lru() {
            return false;
        }
        let mut lru = self.lru.lock();
        if !page.on_lru() || page.is_active() {
            return false;
        }
        if !lru.unlink(page) {
            return false;
        }
        lru.link_back(page.clone());
        true
    }

    /// Reivindica uma página específica para processamento exclusivo.
    ///
    /// Em caso de sucesso a página sai da sua lista, o contador cai e o
    /// chamador passa a segurar uma referência.
    pub fn isolate(&self, page: &Arc<Page>) -> IsolateResult {
        let mut lru = self.lru.lock();
        let which = ZoneLru::list_of(page);
        let pos = match lru.list_mut(which).iter().position(|p| p.pfn() == page.pfn()) {
            Some(pos) => pos,
            None => return IsolateResult::NotOnList,
        };
        match ZoneLru::claim(page) {
            IsolateResult::Isolated => {
                lru.list_mut(which).remove(pos);
                lru.dec(which);
                IsolateResult::Isolated
            }
            other => other,
        }
    }

    /// Devolve uma página isolada para a lista dada.
    pub fn restore(&self, page: Arc<Page>, target: LruList) {
        match target {
            LruList::Active => page.set(PageFlags::ACTIVE),
            LruList::Inactive => page.clear(PageFlags::ACTIVE),
        }
        self.putback(alloc::vec![page]);
    }

    /// Devolve um lote de páginas isoladas às listas (pelo flag `ACTIVE`).
    ///
    /// Adquire o `lru_lock` uma vez a cada `PAGEVEC_SIZE` páginas e solta
    /// as referências de isolamento fora dele. Retorna `(ativas, inativas)`.
    pub fn putback(&self, pages: Vec<Arc<Page>>) -> (usize, usize) {
        let mut nr_active = 0;
        let mut nr_inactive = 0;

        for chunk in pages.chunks(PAGEVEC_SIZE) {
            {
                let mut lru = self.lru.lock();
                for page in chunk {
                    if page.is_active() {
                        nr_active += 1;
                    } else {
                        nr_inactive += 1;
                    }
                    lru.link_front(page.clone());
                }
            }
            for page in chunk {
                self.put_page(page);
            }
        }
        (nr_active, nr_inactive)
    }

    /// Verifica que os contadores batem com as listas e os flags.
    pub fn check_lru(&self) -> MmResult<()> {
        let lru = self.lru.lock();
        if lru.nr_active != lru.active.len() || lru.nr_inactive != lru.inactive.len() {
            crate::kerror!("(LRU) contador diverge da lista, zona=", self.idx());
            return Err(MmError::InvalidParameter);
        }
        let active_ok = lru.active.iter().all(|p| p.on_lru() && p.is_active());
        let inactive_ok = lru.inactive.iter().all(|p| p.on_lru() && !p.is_active());
        if !active_ok || !inactive_ok {
            crate::kerror!("(LRU) flags divergem da lista, zona=", self.idx());
            return Err(MmError::InvalidParameter);
        }
        Ok(())
    }

    /// PFNs da lista, da ponta recente para a de reclaim.
    pub fn lru_snapshot(&self, which: LruList) -> Vec<usize> {
        let mut lru = self.lru.lock();
        lru.list_mut(which).iter().map(|p| p.pfn()).collect()
    }
}
