//! # Configuração do Reclaim
//!
//! Constantes de política e tunables de runtime do núcleo de reclaim.
//!
//! As constantes são fixas em compile-time; os tunables são atômicos
//! lidos sem lock pelo caminho quente (um snapshot eventual é suficiente).

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use core::time::Duration;

use super::error::{MmError, MmResult};

// =============================================================================
// PRIORIDADE E LOTES
// =============================================================================

/// Prioridade inicial (menos agressiva). Cada passo abaixo dobra a fatia
/// das listas varrida por passada: `nr >> priority`.
pub const DEF_PRIORITY: i32 = 12;

/// Tamanho do lote de isolamento/reclaim.
pub const SWAP_CLUSTER_MAX: usize = 32;

/// Quantas páginas são devolvidas às listas por aquisição do `lru_lock`.
pub const PAGEVEC_SIZE: usize = 16;

/// Sub-lote de objetos passado a cada chamada de um shrinker.
pub const SHRINK_BATCH: usize = 128;

/// Custo de recriação padrão de um objeto de cache auxiliar.
pub const DEFAULT_SEEKS: u32 = 2;

/// Zona é marcada `all_unreclaimable` após varrer este múltiplo das suas LRUs
/// sem liberar nada.
pub const UNRECLAIMABLE_FACTOR: usize = 4;

// =============================================================================
// TEMPOS
// =============================================================================

/// Pausa limitada esperando write-back (HZ/10).
pub const CONGESTION_WAIT: Duration = Duration::from_millis(100);

// =============================================================================
// TUNABLES
// =============================================================================

/// Preferência do admin por recuperar memória mapeada (0..=100).
pub const DEFAULT_SWAPPINESS: u32 = 60;

/// Limite de repetições do laço "loop again" do kswapd antes de voltar a dormir.
pub const KSWAPD_MAX_RETRIES: u32 = 16;

/// Tunables de runtime do reclaim.
pub struct Tunables {
    swappiness: AtomicU32,
    laptop_mode: AtomicBool,
    kswapd_max_retries: AtomicU32,
}

impl Tunables {
    pub const fn new() -> Self {
        Self {
            swappiness: AtomicU32::new(DEFAULT_SWAPPINESS),
            laptop_mode: AtomicBool::new(false),
            kswapd_max_retries: AtomicU32::new(KSWAPD_MAX_RETRIES),
        }
    }

    #[inline]
    pub fn swappiness(&self) -> u32 {
        self.swappiness.load(Ordering::Relaxed)
    }

    /// Define swappiness. Valores fora de 0..=100 são rejeitados.
    pub fn set_swappiness(&self, value: u32) -> MmResult<()> {
        if value > 100 {
            crate::kwarn!("(VMSCAN) swappiness inválido=", value);
            return Err(MmError::InvalidParameter);
        }
        self.swappiness.store(value, Ordering::Relaxed);
        Ok(())
    }

    /// Modo de baixo consumo: evita write-back até o reclaim escalar.
    #[inline]
    pub fn laptop_mode(&self) -> bool {
        self.laptop_mode.load(Ordering::Relaxed)
    }

    pub fn set_laptop_mode(&self, enabled: bool) {
        self.laptop_mode.store(enabled, Ordering::Relaxed);
    }

    #[inline]
    pub fn kswapd_max_retries(&self) -> u32 {
        self.kswapd_max_retries.load(Ordering::Relaxed)
    }

    pub fn set_kswapd_max_retries(&self, retries: u32) {
        self.kswapd_max_retries.store(retries, Ordering::Relaxed);
    }
}

impl Default for Tunables {
    fn default() -> Self {
        Self::new()
    }
}
