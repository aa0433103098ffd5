//! # Reverse Mappings (RMAP)
//!
//! Interface com quem conhece as PTEs que apontam para um frame físico.
//! O reclaim não anda em page tables: pergunta ao `ReverseMap` se a página
//! foi tocada e pede para desmapeá-la.

use super::frame::{Page, PageFlags};
use crate::mm::stats::PageStates;

/// Resultado de `try_to_unmap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmapResult {
    /// Todas as PTEs foram removidas.
    Success,
    /// Mapeamento de tipo inesperado: não sabemos desmapear.
    Failed,
    /// Precisaria bloquear (lock de page table ocupado). Tente depois.
    WouldBlock,
}

/// Colaborador de reverse-mapping.
pub trait ReverseMap: Send + Sync {
    /// Conta PTEs com bit accessed setado e LIMPA esses bits.
    ///
    /// `mapping_wide` permite percorrer todos os VMAs do mapping (o chamador
    /// segura o lock da página).
    fn referenced_ptes(&self, page: &Page, mapping_wide: bool) -> usize;

    /// Remove todas as PTEs que apontam para `page`.
    fn try_to_unmap(&self, page: &Page) -> UnmapResult;
}

/// Verifica E CONSOME o estado "referenciada" da página.
///
/// NÃO é idempotente: limpa o bit `REFERENCED` e os bits accessed das PTEs.
/// Duas chamadas seguidas numa página referenciada retornam `(true, false)`.
/// Deve ser chamada exatamente uma vez por decisão.
pub fn page_referenced(rmap: &dyn ReverseMap, page: &Page, mapping_wide: bool) -> bool {
    let mut referenced = page.test_and_clear(PageFlags::REFERENCED);

    if page.is_mapped() && rmap.referenced_ptes(page, mapping_wide) > 0 {
        referenced = true;
    }

    referenced
}

/// Página ainda em uso por algum address space?
///
/// Mapeada, no swap cache, ou com um mapping que tem VMAs vivas.
pub fn page_mapping_inuse(page: &Page) -> bool {
    if page.is_mapped() || page.is_swapcache() {
        return true;
    }
    match page.mapping() {
        Some(mapping) => mapping.is_mmapped(),
        None => false,
    }
}

/// Nova PTE apontando para `page`: ganha referência e mapcount.
pub fn page_add_rmap(page: &Page, states: &PageStates) {
    page.get();
    if page.inc_mapcount() {
        PageStates::inc(&states.nr_mapped);
    }
}

/// PTE removida: solta referência e mapcount.
///
/// Chamada pelas implementações de `ReverseMap::try_to_unmap`.
pub fn page_remove_rmap(page: &Page, states: &PageStates) {
    if page.dec_mapcount() {
        PageStates::dec(&states.nr_mapped);
    }
    page.put();
}
