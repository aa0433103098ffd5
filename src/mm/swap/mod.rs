//! # Swap Subsystem
//!
//! Backing store para páginas anônimas evicted.
//!
//! O layout do swap e o transporte de I/O ficam fora daqui: o reclaim só
//! reserva slots (`SwapBackend`) e coloca a página no swap cache, cujo
//! `AddressSpace` (swapper space) escreve via o transporte registrado.

use alloc::sync::Arc;

use crate::mm::page_cache::AddressSpace;
use crate::mm::pfm::{Page, PageFlags};

/// Slot de swap (índice no backing store)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SwapSlot(pub u64);

impl SwapSlot {
    pub const INVALID: Self = Self(u64::MAX);

    pub fn is_valid(&self) -> bool {
        self.0 != u64::MAX
    }
}

/// Colaborador de reserva de espaço de swap.
pub trait SwapBackend: Send + Sync {
    /// Reserva um slot para `page`. `None`: swap cheio ou inexistente.
    fn reserve(&self, page: &Page) -> Option<SwapSlot>;

    /// Devolve um slot ao backing store.
    fn release(&self, slot: SwapSlot);

    /// Tamanho total do swap em páginas (0 = sem swap no sistema).
    fn total_pages(&self) -> usize;
}

/// Reserva swap para uma página anônima e a insere no swap cache.
///
/// A página precisa estar travada pelo chamador, que também a marca suja
/// (a cópia em swap ainda não existe). Em caso de colisão no swapper space
/// o slot é devolvido.
pub fn add_to_swap(backend: &dyn SwapBackend, swapper: &Arc<AddressSpace>, page: &Arc<Page>) -> bool {
    let slot = match backend.reserve(page) {
        Some(slot) if slot.is_valid() => slot,
        _ => return false,
    };

    if swapper.add_page(page, slot.0).is_err() {
        crate::kwarn!("(SWAP) add_to_swap: slot em uso", slot.0);
        backend.release(slot);
        return false;
    }

    page.set_swap_slot(slot);
    page.set(PageFlags::SWAPCACHE);
    true
}

/// Remove do swap cache com o tree_lock do swapper já adquirido.
///
/// Retorna o slot que deve ser liberado depois de soltar o lock.
pub(crate) fn delete_from_swap_cache_locked(
    tree: &mut alloc::collections::BTreeMap<u64, Arc<Page>>,
    page: &Page,
) -> Option<SwapSlot> {
    let slot = page.swap_slot()?;
    if !AddressSpace::remove_locked(tree, page) {
        return None;
    }
    page.clear(PageFlags::SWAPCACHE);
    page.set_swap_slot(SwapSlot::INVALID);
    Some(slot)
}
