//! # Memory Management Subsystem (MM) - Núcleo de Reclaim
//!
//! Decide, sob pressão de memória, quais páginas sair do page cache e do
//! working set, dirige o write-back e devolve os frames às zonas.
//!
//! ## 🏗️ Arquitetura dos Módulos
//!
//! | Módulo       | Responsabilidade |
//! |--------------|------------------|
//! | `pfm`        | Metadados por página (flags, refcount, mapcount) e rmap. |
//! | `pmm`        | Zonas, pool de frames livres, listas LRU (registro). |
//! | `page_cache` | `AddressSpace`: índice, write-back e erros assíncronos. |
//! | `swap`       | Slots de swap e swap cache. |
//! | `reclaim`    | Isolamento, eviction, aging, driver de zona, shrinkers, reclaim direto e kswapd. |
//! | `config`     | Constantes de política e tunables (`swappiness`). |
//! | `stats`      | Contadores aproximados (`nr_mapped`) e eventos (vmstat). |
//!
//! ## Dependências
//!
//! ```text
//! pfm ──▶ pmm (registro LRU) ──▶ reclaim::isolate
//!                                   │
//!                 ┌─────────────────┼──────────────┐
//!                 ▼                 ▼              ▼
//!            reclaim::evict   reclaim::aging   shrinker
//!                 └──────────┬──────┘              │
//!                            ▼                     │
//!                      reclaim::zone ◀─────────────┘
//!                            │
//!                ┌───────────┴───────────┐
//!                ▼                       ▼
//!         reclaim::direct          reclaim::kswapd
//! ```
//!
//! ## Concorrência
//!
//! - Um `lru_lock` (spinlock) por zona guarda listas e contadores.
//! - A decisão por página roda sem esse lock, sobre lotes isolados.
//! - O lock da página é um bit com try-lock; o reclaim nunca espera por ele.
//! - O registro de shrinkers é um RwLock: passadas leem, (des)registro escreve.
//! - `nr_mapped`/`total_pages` são lidos sem lock (heurística).
//!
//! ## Hardware
//!
//! Nada aqui toca hardware. Page tables, I/O, swap e sono do daemon são
//! colaboradores (`ReverseMap`, `AddressSpaceOps`, `SwapBackend`,
//! `IoControl`, `KswapdWaiter`) fornecidos pelo kernel hospedeiro.

pub mod config;
pub mod error;
pub mod page_cache;
pub mod pfm;
pub mod pmm;
pub mod reclaim;
pub mod stats;
pub mod swap;

#[cfg(any(test, feature = "self_test"))]
pub mod test;

pub use error::{MmError, MmResult};
pub use reclaim::{AllocFlags, Reclaimer, ScanControl};
