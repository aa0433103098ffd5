//! # Zonas de Memória Física
//!
//! Divide a memória física em zonas com bookkeeping de reclaim independente.
//!
//! ## 🎯 Propósito
//!
//! Diferentes dispositivos e usos requerem memória de regiões específicas:
//! - **DMA Zone** (0-16MB): Dispositivos ISA legados
//! - **DMA32 Zone** (16MB-4GB): Dispositivos com 32-bit addressing
//! - **Normal Zone** (4GB+): Memória geral
//!
//! ## 🏗️ Arquitetura
//!
//! Cada zona é dona de:
//! - seus frames (`mem_map`) e do pool de frames livres
//! - das duas listas LRU (ver `lru.rs`), sob um único `lru_lock`
//! - dos contadores de reclaim: dívida de scan, `pages_scanned`,
//!   `all_unreclaimable`, `prev_priority`/`temp_priority`
//!
//! O fallback de alocação vai da maior zona para a menor
//! (Normal → DMA32 → DMA); o kswapd percorre na ordem inversa.
//!
//! ## NUMA
//!
//! Em sistemas NUMA, cada nodo (`Node`) tem suas próprias zonas e seu kswapd.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, AtomicUsize, Ordering};

use spin::{Mutex, RwLock};

use super::lru::ZoneLru;
use crate::mm::config::DEF_PRIORITY;
use crate::mm::error::{MmError, MmResult};
use crate::mm::pfm::{Page, PageFlags, Pfn};
use crate::mm::reclaim::KswapdWaiter;

// =============================================================================
// DEFINIÇÃO DE ZONAS
// =============================================================================

/// Tipo de zona de memória
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ZoneType {
    /// DMA Zone: 0 - 16 MB
    DMA = 0,
    /// DMA32 Zone: 16 MB - 4 GB
    DMA32 = 1,
    /// Normal Zone: 4 GB+
    Normal = 2,
    /// Movable Zone: memória que pode ser migrada/compactada
    Movable = 3,
}

impl ZoneType {
    /// Nome da zona
    pub fn name(&self) -> &'static str {
        match self {
            Self::DMA => "DMA",
            Self::DMA32 => "DMA32",
            Self::Normal => "Normal",
            Self::Movable => "Movable",
        }
    }

    /// Todas as zonas em ordem
    pub fn all() -> &'static [Self] {
        &[Self::DMA, Self::DMA32, Self::Normal, Self::Movable]
    }
}

/// Tipo de watermark consultado.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Watermark {
    Min,
    Low,
    High,
}

/// Limiares de páginas livres de uma zona.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Watermarks {
    pub min: usize,
    pub low: usize,
    pub high: usize,
}

impl Watermarks {
    /// Deriva low/high a partir de `min` (low = 5/4 min, high = 3/2 min).
    pub const fn from_min(min: usize) -> Self {
        Self {
            min,
            low: min + min / 4,
            high: min + min / 2,
        }
    }
}

// =============================================================================
// ZONA
// =============================================================================

/// Representa uma zona de memória física
pub struct Zone {
    zone_type: ZoneType,
    node_id: usize,
    start_pfn: Pfn,
    /// Metadados dos frames da zona
    mem_map: Vec<Arc<Page>>,
    /// Frames livres
    free_list: Mutex<Vec<Arc<Page>>>,
    free_pages: AtomicUsize,
    watermarks: Watermarks,

    /// lru_lock + listas
    pub(crate) lru: Mutex<ZoneLru>,

    // --- Bookkeeping do reclaim (lido sem lock) ---
    /// Dívida fracionária de scan da lista ativa
    pub(crate) nr_scan_active: AtomicUsize,
    /// Dívida fracionária de scan da lista inativa
    pub(crate) nr_scan_inactive: AtomicUsize,
    /// Páginas varridas desde a última liberação na zona
    pub(crate) pages_scanned: AtomicUsize,
    all_unreclaimable: AtomicBool,
    prev_priority: AtomicI32,
    temp_priority: AtomicI32,
    reclaim_in_progress: AtomicUsize,
}

impl Zone {
    /// Cria zona com `nr_pages` frames a partir de `start_pfn`, todos livres.
    pub fn new(
        zone_type: ZoneType,
        node_id: usize,
        start_pfn: Pfn,
        nr_pages: usize,
        watermarks: Watermarks,
    ) -> Self {
        let idx = zone_type as usize;
        let mem_map: Vec<Arc<Page>> = (0..nr_pages)
            .map(|i| Arc::new(Page::new(start_pfn + i, idx)))
            .collect();
        let free_list = mem_map.iter().rev().cloned().collect();

        crate::kdebug!("(Zones) zona iniciada, frames=", nr_pages);

        Self {
            zone_type,
            node_id,
            start_pfn,
            mem_map,
            free_list: Mutex::new(free_list),
            free_pages: AtomicUsize::new(nr_pages),
            watermarks,
            lru: Mutex::new(ZoneLru::new()),
            nr_scan_active: AtomicUsize::new(0),
            nr_scan_inactive: AtomicUsize::new(0),
            pages_scanned: AtomicUsize::new(0),
            all_unreclaimable: AtomicBool::new(false),
            prev_priority: AtomicI32::new(DEF_PRIORITY),
            temp_priority: AtomicI32::new(DEF_PRIORITY),
            reclaim_in_progress: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub fn zone_type(&self) -> ZoneType {
        self.zone_type
    }

    #[inline]
    pub fn idx(&self) -> usize {
        self.zone_type as usize
    }

    #[inline]
    pub fn node_id(&self) -> usize {
        self.node_id
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.zone_type.name()
    }

    /// Frames que a zona gerencia
    #[inline]
    pub fn present_pages(&self) -> usize {
        self.mem_map.len()
    }

    pub fn mem_map(&self) -> &[Arc<Page>] {
        &self.mem_map
    }

    /// Página de um PFN desta zona.
    pub fn page(&self, pfn: Pfn) -> MmResult<&Arc<Page>> {
        pfn.checked_sub(self.start_pfn)
            .and_then(|i| self.mem_map.get(i))
            .ok_or(MmError::OutOfBounds)
    }

    // -------------------------------------------------------------------------
    // Pool de frames livres
    // -------------------------------------------------------------------------

    #[inline]
    pub fn free_pages(&self) -> usize {
        self.free_pages.load(Ordering::Relaxed)
    }

    /// Aloca um frame. A página sai com `count == 1`, sem flags.
    pub fn alloc_page(&self) -> MmResult<Arc<Page>> {
        let page = self.free_list.lock().pop().ok_or(MmError::OutOfMemory)?;
        self.free_pages.fetch_sub(1, Ordering::Relaxed);
        page.set_count(1);
        Ok(page)
    }

    /// Devolve ao pool um frame cuja contagem chegou a zero.
    ///
    /// Liberar memória prova que a zona ainda é recuperável: zera
    /// `pages_scanned` e desarma o circuit breaker.
    pub(crate) fn free_page(&self, page: &Arc<Page>) {
        page.reset_flags();
        page.set_mapping(None);
        page.set_count(0);
        self.free_list.lock().push(page.clone());
        self.free_pages.fetch_add(1, Ordering::Relaxed);

        self.pages_scanned.store(0, Ordering::Relaxed);
        self.all_unreclaimable.store(false, Ordering::Relaxed);
    }

    /// Solta uma referência; na última, tira a página da LRU e a libera.
    pub fn put_page(&self, page: &Arc<Page>) -> bool {
        if !page.put() {
            return false;
        }
        {
            // LRU só é confiável sob o lock: um claim concorrente pode
            // limpá-lo e devolvê-lo dentro da seção crítica
            let mut lru = self.lru.lock();
            if page.on_lru() {
                lru.unlink(page);
            }
        }
        self.free_page(page);
        true
    }

    pub(crate) fn is_free(&self, page: &Page) -> bool {
        self.free_list.lock().iter().any(|p| p.pfn() == page.pfn())
    }

    // -------------------------------------------------------------------------
    // Watermarks
    // -------------------------------------------------------------------------

    pub fn watermarks(&self) -> Watermarks {
        self.watermarks
    }

    pub fn watermark(&self, mark: Watermark) -> usize {
        match mark {
            Watermark::Min => self.watermarks.min,
            Watermark::Low => self.watermarks.low,
            Watermark::High => self.watermarks.high,
        }
    }

    /// A zona consegue servir uma alocação de `order` sem cair abaixo de `mark`?
    ///
    /// Sem buddy allocator, a ordem só desconta `2^order - 1` páginas do
    /// total livre.
    pub fn zone_watermark_ok(&self, order: u32, mark: Watermark) -> bool {
        let needed = (1usize << order.min(usize::BITS - 1)) - 1;
        let free = self.free_pages().saturating_sub(needed);
        free > self.watermark(mark)
    }

    // -------------------------------------------------------------------------
    // Estado do reclaim
    // -------------------------------------------------------------------------

    #[inline]
    pub fn all_unreclaimable(&self) -> bool {
        self.all_unreclaimable.load(Ordering::Relaxed)
    }

    pub(crate) fn set_all_unreclaimable(&self) {
        if !self.all_unreclaimable.swap(true, Ordering::Relaxed) {
            crate::kwarn!("(VMSCAN) zona marcada all_unreclaimable, idx=", self.idx());
        }
    }

    #[inline]
    pub fn pages_scanned(&self) -> usize {
        self.pages_scanned.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn prev_priority(&self) -> i32 {
        self.prev_priority.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn temp_priority(&self) -> i32 {
        self.temp_priority.load(Ordering::Relaxed)
    }

    pub(crate) fn set_temp_priority(&self, priority: i32) {
        self.temp_priority.store(priority, Ordering::Relaxed);
    }

    /// Registra a prioridade desta passada: `temp = p`, `prev = min(prev, p)`.
    pub(crate) fn note_priority(&self, priority: i32) {
        self.temp_priority.store(priority, Ordering::Relaxed);
        self.prev_priority.fetch_min(priority, Ordering::Relaxed);
    }

    /// Fim do ciclo: `prev_priority` herda a última prioridade usada.
    pub(crate) fn commit_priority(&self) {
        self.prev_priority
            .store(self.temp_priority(), Ordering::Relaxed);
    }

    /// Reclaims rodando nesta zona agora.
    #[inline]
    pub fn reclaim_in_progress(&self) -> usize {
        self.reclaim_in_progress.load(Ordering::Relaxed)
    }

    pub(crate) fn begin_reclaim(&self) {
        self.reclaim_in_progress.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn end_reclaim(&self) {
        self.reclaim_in_progress.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn scan_debt(&self) -> (usize, usize) {
        (
            self.nr_scan_active.load(Ordering::Relaxed),
            self.nr_scan_inactive.load(Ordering::Relaxed),
        )
    }

    // -------------------------------------------------------------------------
    // Diagnóstico
    // -------------------------------------------------------------------------

    /// Imprime estatísticas
    pub fn print_stats(&self) {
        let (nr_active, nr_inactive) = self.lru_counts();
        crate::kinfo!("(Zones) ===== zona =====");
        crate::kinfo!(self.name());
        crate::klog!("  present=", self.present_pages(), " free=", self.free_pages());
        crate::knl!();
        crate::klog!("  active=", nr_active, " inactive=", nr_inactive);
        crate::knl!();
        crate::klog!("  scanned=", self.pages_scanned(), " prev_prio=", self.prev_priority());
        crate::knl!();
        if self.all_unreclaimable() {
            crate::kwarn!("  all_unreclaimable");
        }
    }
}

impl core::fmt::Debug for Zone {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Zone")
            .field("type", &self.zone_type)
            .field("node", &self.node_id)
            .field("free", &self.free_pages())
            .field("all_unreclaimable", &self.all_unreclaimable())
            .finish()
    }
}

// =============================================================================
// NODO
// =============================================================================

/// Domínio de memória (pgdat): zonas em ordem DMA → maior, mais o estado
/// de wakeup do seu kswapd.
pub struct Node {
    id: usize,
    zones: Vec<Arc<Zone>>,
    pub(crate) kswapd_max_order: AtomicU32,
    pub(crate) kswapd_stop: AtomicBool,
    kswapd_wait: RwLock<Option<Arc<dyn KswapdWaiter>>>,
}

impl Node {
    /// Cria nodo. As zonas precisam estar em ordem crescente de índice.
    pub fn new(id: usize, zones: Vec<Arc<Zone>>) -> MmResult<Self> {
        let ordered = zones.windows(2).all(|w| w[0].idx() < w[1].idx());
        if !ordered || zones.iter().any(|z| z.node_id() != id) {
            crate::kerror!("(Zones) zonas fora de ordem no nodo ", id);
            return Err(MmError::InvalidParameter);
        }
        Ok(Self {
            id,
            zones,
            kswapd_max_order: AtomicU32::new(0),
            kswapd_stop: AtomicBool::new(false),
            kswapd_wait: RwLock::new(None),
        })
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn zones(&self) -> &[Arc<Zone>] {
        &self.zones
    }

    pub fn zone(&self, i: usize) -> MmResult<&Arc<Zone>> {
        self.zones.get(i).ok_or(MmError::OutOfBounds)
    }

    /// Zona dona do PFN.
    pub fn zone_for_pfn(&self, pfn: Pfn) -> Option<&Arc<Zone>> {
        self.zones.iter().find(|z| z.page(pfn).is_ok())
    }

    pub fn present_pages(&self) -> usize {
        self.zones.iter().map(|z| z.present_pages()).sum()
    }

    /// Soma de active+inactive das zonas `0..=end`.
    pub fn nr_lru_pages(&self, end: usize) -> usize {
        self.zones
            .iter()
            .take(end.saturating_add(1))
            .map(|z| {
                let (a, i) = z.lru_counts();
                a + i
            })
            .sum()
    }

    // -------------------------------------------------------------------------
    // kswapd
    // -------------------------------------------------------------------------

    /// Instala o mecanismo de sono/despertar do kswapd deste nodo.
    pub fn attach_kswapd(&self, waiter: Arc<dyn KswapdWaiter>) {
        self.kswapd_stop.store(false, Ordering::Release);
        *self.kswapd_wait.write() = Some(waiter);
    }

    pub(crate) fn kswapd_waiter(&self) -> Option<Arc<dyn KswapdWaiter>> {
        self.kswapd_wait.read().clone()
    }

    pub fn kswapd_max_order(&self) -> u32 {
        self.kswapd_max_order.load(Ordering::Acquire)
    }

    // -------------------------------------------------------------------------
    // Diagnóstico
    // -------------------------------------------------------------------------

    /// Verifica exclusividade de listas sobre todo o mem_map do nodo.
    ///
    /// Com o sistema quiescente, cada página está em exatamente uma de
    /// {ativa, inativa, livre}, ou fora de todas com referências vivas
    /// (em uso / isolada). Flags `LRU`/`ACTIVE` precisam bater com a lista.
    pub fn check_membership(&self) -> MmResult<()> {
        for zone in &self.zones {
            zone.check_lru()?;
            let lru = zone.lru.lock();
            for page in zone.mem_map() {
                let active = lru.contains(page, true);
                let inactive = lru.contains(page, false);
                let free = zone.is_free(page);
                let places = active as u32 + inactive as u32 + free as u32;
                if places > 1 {
                    crate::kerror!("(LRU) página em mais de uma lista, pfn=", page.pfn());
                    return Err(MmError::AlreadyOnLru);
                }
                if places == 0 && page.count() == 0 {
                    crate::kerror!("(LRU) página perdida (sem lista, sem ref), pfn=", page.pfn());
                    return Err(MmError::NotOnLru);
                }
                let listed = active || inactive;
                let flags_ok = listed == page.test(PageFlags::LRU)
                    && (!listed || active == page.is_active());
                if !flags_ok {
                    crate::kerror!("(LRU) flags divergem da lista, pfn=", page.pfn());
                    return Err(MmError::InvalidParameter);
                }
            }
        }
        Ok(())
    }
}
