//! # Memory Statistics
//!
//! Contadores do reclaim. Todos relaxados: são entradas heurísticas
//! (swap tendency) e telemetria, nunca base de corretude.

use core::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

// =============================================================================
// ESTADO DAS PÁGINAS
// =============================================================================

/// Contadores aproximados de estado das páginas, globais ao sistema.
pub struct PageStates {
    /// Páginas mapeadas em ao menos uma page table
    pub nr_mapped: AtomicUsize,
    /// Total de páginas gerenciadas (todas as zonas)
    pub total_pages: AtomicUsize,
    pub nr_dirty: AtomicUsize,
    pub nr_writeback: AtomicUsize,
}

impl PageStates {
    pub const fn new() -> Self {
        Self {
            nr_mapped: AtomicUsize::new(0),
            total_pages: AtomicUsize::new(0),
            nr_dirty: AtomicUsize::new(0),
            nr_writeback: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub fn nr_mapped(&self) -> usize {
        self.nr_mapped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn total_pages(&self) -> usize {
        self.total_pages.load(Ordering::Relaxed)
    }

    /// Porcentagem da memória mapeada em algum address space.
    pub fn mapped_ratio(&self) -> usize {
        let total = self.total_pages();
        if total == 0 {
            return 0;
        }
        self.nr_mapped() * 100 / total
    }

    #[inline]
    pub(crate) fn inc(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Decremento saturado: os contadores são aproximados e nunca dão wrap.
    #[inline]
    pub(crate) fn dec(counter: &AtomicUsize) {
        let _ = counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
            Some(v.saturating_sub(1))
        });
    }
}

impl Default for PageStates {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// EVENTOS DO RECLAIM
// =============================================================================

/// Contadores de eventos do reclaim (equivalente ao vmstat).
pub struct VmEvents {
    pub pgscan_kswapd: AtomicU64,
    pub pgscan_direct: AtomicU64,
    pub pgsteal: AtomicU64,
    pub kswapd_steal: AtomicU64,
    pub pgrefill: AtomicU64,
    pub pgdeactivate: AtomicU64,
    pub pgactivate: AtomicU64,
    pub pgrotated: AtomicU64,
    pub pageoutrun: AtomicU64,
    pub allocstall: AtomicU64,
    pub slabs_scanned: AtomicU64,
}

impl VmEvents {
    pub const fn new() -> Self {
        Self {
            pgscan_kswapd: AtomicU64::new(0),
            pgscan_direct: AtomicU64::new(0),
            pgsteal: AtomicU64::new(0),
            kswapd_steal: AtomicU64::new(0),
            pgrefill: AtomicU64::new(0),
            pgdeactivate: AtomicU64::new(0),
            pgactivate: AtomicU64::new(0),
            pgrotated: AtomicU64::new(0),
            pageoutrun: AtomicU64::new(0),
            allocstall: AtomicU64::new(0),
            slabs_scanned: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn add(counter: &AtomicU64, n: usize) {
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> VmEventSnapshot {
        VmEventSnapshot {
            pgscan_kswapd: self.pgscan_kswapd.load(Ordering::Relaxed),
            pgscan_direct: self.pgscan_direct.load(Ordering::Relaxed),
            pgsteal: self.pgsteal.load(Ordering::Relaxed),
            kswapd_steal: self.kswapd_steal.load(Ordering::Relaxed),
            pgrefill: self.pgrefill.load(Ordering::Relaxed),
            pgdeactivate: self.pgdeactivate.load(Ordering::Relaxed),
            pgactivate: self.pgactivate.load(Ordering::Relaxed),
            pgrotated: self.pgrotated.load(Ordering::Relaxed),
            pageoutrun: self.pageoutrun.load(Ordering::Relaxed),
            allocstall: self.allocstall.load(Ordering::Relaxed),
            slabs_scanned: self.slabs_scanned.load(Ordering::Relaxed),
        }
    }
}

impl Default for VmEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VmEventSnapshot {
    pub pgscan_kswapd: u64,
    pub pgscan_direct: u64,
    pub pgsteal: u64,
    pub kswapd_steal: u64,
    pub pgrefill: u64,
    pub pgdeactivate: u64,
    pub pgactivate: u64,
    pub pgrotated: u64,
    pub pageoutrun: u64,
    pub allocstall: u64,
    pub slabs_scanned: u64,
}

impl VmEventSnapshot {
    /// Total varrido pelos dois caminhos de reclaim.
    pub fn pgscan(&self) -> u64 {
        self.pgscan_kswapd + self.pgscan_direct
    }
}
