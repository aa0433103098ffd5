//! # Page Frame Info
//!
//! Metadados de um frame físico gerenciado pelo reclaim.
//!
//! Todos os campos são atômicos: flags e contadores são lidos/alterados
//! fora do `lru_lock` pelo motor de eviction. Só o vínculo com o mapping
//! usa um spinlock próprio.

use alloc::sync::{Arc, Weak};
use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use bitflags::bitflags;
use spin::Mutex;

use crate::mm::page_cache::AddressSpace;
use crate::mm::swap::SwapSlot;

/// Número do frame físico (índice global no mem_map).
pub type Pfn = usize;

// =============================================================================
// PAGE FLAGS
// =============================================================================

bitflags! {
    /// Flags de uma página.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct PageFlags: u32 {
        /// Reivindicada para uso exclusivo (try-lock, nunca bloqueia no reclaim).
        const LOCKED     = 1 << 0;
        /// Tocada desde a última varredura (bit consumido por `page_referenced`).
        const REFERENCED = 1 << 1;
        /// Conteúdo diverge do backing store.
        const DIRTY      = 1 << 2;
        /// Está ligada em uma das listas LRU da zona.
        const LRU        = 1 << 3;
        /// Pertence à lista ativa (com LRU) ou deve voltar a ela (isolada).
        const ACTIVE     = 1 << 4;
        /// Write-back em andamento.
        const WRITEBACK  = 1 << 5;
        /// O reclaim pediu rotação quando o write-back terminar.
        const RECLAIM    = 1 << 6;
        /// Está no swap cache (`private` guarda o slot).
        const SWAPCACHE  = 1 << 7;
        /// Tem dados privados do cache (ex: buffer heads).
        const PRIVATE    = 1 << 8;
        /// Memória anônima (sem arquivo por trás).
        const ANON       = 1 << 9;
    }
}

// =============================================================================
// PAGE
// =============================================================================

/// Uma página (unidade atômica de reclaim).
///
/// `count` é a contagem de referências reais (cache, isolamento, usuários).
/// `mapcount` conta mapeamentos em page tables: referência fraca, não posse.
#[repr(C, align(64))]
pub struct Page {
    pfn: Pfn,
    zone_idx: usize,
    flags: AtomicU32,
    count: AtomicU32,
    mapcount: AtomicU32,
    index: AtomicU64,
    private: AtomicU64,
    mapping: Mutex<Weak<AddressSpace>>,
}

impl Page {
    pub fn new(pfn: Pfn, zone_idx: usize) -> Self {
        Self {
            pfn,
            zone_idx,
            flags: AtomicU32::new(0),
            count: AtomicU32::new(0),
            mapcount: AtomicU32::new(0),
            index: AtomicU64::new(0),
            private: AtomicU64::new(SwapSlot::INVALID.0),
            mapping: Mutex::new(Weak::new()),
        }
    }

    #[inline]
    pub fn pfn(&self) -> Pfn {
        self.pfn
    }

    #[inline]
    pub fn zone_idx(&self) -> usize {
        self.zone_idx
    }

    // -------------------------------------------------------------------------
    // Flags
    // -------------------------------------------------------------------------

    #[inline]
    pub fn flags(&self) -> PageFlags {
        PageFlags::from_bits_truncate(self.flags.load(Ordering::Acquire))
    }

    #[inline]
    pub fn test(&self, flag: PageFlags) -> bool {
        self.flags().contains(flag)
    }

    #[inline]
    pub fn set(&self, flag: PageFlags) {
        self.flags.fetch_or(flag.bits(), Ordering::AcqRel);
    }

    #[inline]
    pub fn clear(&self, flag: PageFlags) {
        self.flags.fetch_and(!flag.bits(), Ordering::AcqRel);
    }

    /// Seta `flag` e retorna se ele já estava setado.
    #[inline]
    pub fn test_and_set(&self, flag: PageFlags) -> bool {
        self.flags.fetch_or(flag.bits(), Ordering::AcqRel) & flag.bits() != 0
    }

    /// Limpa `flag` e retorna se ele estava setado.
    #[inline]
    pub fn test_and_clear(&self, flag: PageFlags) -> bool {
        self.flags.fetch_and(!flag.bits(), Ordering::AcqRel) & flag.bits() != 0
    }

    /// Zera todas as flags (página voltando ao alocador).
    pub(crate) fn reset_flags(&self) {
        self.flags.store(0, Ordering::Release);
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.test(PageFlags::DIRTY)
    }

    #[inline]
    pub fn is_writeback(&self) -> bool {
        self.test(PageFlags::WRITEBACK)
    }

    #[inline]
    pub fn is_anon(&self) -> bool {
        self.test(PageFlags::ANON)
    }

    #[inline]
    pub fn is_swapcache(&self) -> bool {
        self.test(PageFlags::SWAPCACHE)
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.test(PageFlags::ACTIVE)
    }

    #[inline]
    pub fn on_lru(&self) -> bool {
        self.test(PageFlags::LRU)
    }

    /// Marca como referenciada (acesso via syscall/read, não via page table).
    pub fn mark_referenced(&self) {
        self.set(PageFlags::REFERENCED);
    }

    // -------------------------------------------------------------------------
    // Lock da página
    // -------------------------------------------------------------------------

    /// Tenta reivindicar a página sem bloquear.
    #[inline]
    pub fn trylock(&self) -> bool {
        !self.test_and_set(PageFlags::LOCKED)
    }

    /// Espera até conseguir o lock. Só para caminhos já comprometidos com
    /// esta página (ex: registro de erro de write-back).
    pub fn lock(&self) {
        while !self.trylock() {
            core::hint::spin_loop();
        }
    }

    #[inline]
    pub fn unlock(&self) {
        self.clear(PageFlags::LOCKED);
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.test(PageFlags::LOCKED)
    }

    // -------------------------------------------------------------------------
    // Contagem de referências
    // -------------------------------------------------------------------------

    #[inline]
    pub fn count(&self) -> u32 {
        self.count.load(Ordering::Acquire)
    }

    pub(crate) fn set_count(&self, count: u32) {
        self.count.store(count, Ordering::Release);
    }

    /// Adquire uma referência. A página precisa já estar viva.
    #[inline]
    pub fn get(&self) -> u32 {
        self.count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Adquire uma referência apenas se a contagem não for zero.
    ///
    /// Retorna `false` se a página está sendo liberada em outro lugar.
    pub fn get_unless_zero(&self) -> bool {
        self.count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| {
                if c == 0 {
                    None
                } else {
                    Some(c + 1)
                }
            })
            .is_ok()
    }

    /// Solta uma referência. Retorna `true` se chegou a zero.
    #[inline]
    pub fn put(&self) -> bool {
        let prev = self
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| {
                Some(c.saturating_sub(1))
            })
            .unwrap_or(0);
        prev == 1
    }

    // -------------------------------------------------------------------------
    // Mapeamentos em page tables
    // -------------------------------------------------------------------------

    #[inline]
    pub fn mapcount(&self) -> u32 {
        self.mapcount.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_mapped(&self) -> bool {
        self.mapcount() > 0
    }

    /// Incrementa mapcount. Retorna `true` no primeiro mapeamento.
    pub(crate) fn inc_mapcount(&self) -> bool {
        self.mapcount.fetch_add(1, Ordering::AcqRel) == 0
    }

    /// Decrementa mapcount. Retorna `true` quando o último mapeamento sai.
    pub(crate) fn dec_mapcount(&self) -> bool {
        let prev = self
            .mapcount
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| {
                Some(c.saturating_sub(1))
            })
            .unwrap_or(0);
        prev == 1
    }

    // -------------------------------------------------------------------------
    // Mapping dono e dados privados
    // -------------------------------------------------------------------------

    /// Mapping dono, se ainda existir.
    pub fn mapping(&self) -> Option<Arc<AddressSpace>> {
        self.mapping.lock().upgrade()
    }

    pub(crate) fn set_mapping(&self, mapping: Option<&Arc<AddressSpace>>) {
        *self.mapping.lock() = match mapping {
            Some(m) => Arc::downgrade(m),
            None => Weak::new(),
        };
    }

    /// Offset da página dentro do mapping.
    #[inline]
    pub fn index(&self) -> u64 {
        self.index.load(Ordering::Acquire)
    }

    pub(crate) fn set_index(&self, index: u64) {
        self.index.store(index, Ordering::Release);
    }

    /// Slot de swap atribuído (válido apenas com `SWAPCACHE`).
    pub fn swap_slot(&self) -> Option<SwapSlot> {
        let slot = SwapSlot(self.private.load(Ordering::Acquire));
        if slot.is_valid() {
            Some(slot)
        } else {
            None
        }
    }

    pub(crate) fn set_swap_slot(&self, slot: SwapSlot) {
        self.private.store(slot.0, Ordering::Release);
    }
}

impl core::fmt::Debug for Page {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Page")
            .field("pfn", &self.pfn)
            .field("zone", &self.zone_idx)
            .field("flags", &self.flags())
            .field("count", &self.count())
            .field("mapcount", &self.mapcount())
            .finish()
    }
}
