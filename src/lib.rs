//! Forge Reclaim.
//!
//! Núcleo de reclaim de páginas do kernel Forge: listas LRU por zona,
//! motor de eviction, aging ativo/inativo, shrinkers, reclaim direto e
//! kswapd.

#![no_std]

// Habilitar alocação dinâmica (necessário para Vec/Box/Arc)
extern crate alloc;

#[cfg(test)]
extern crate std;

pub mod core; // Logging
pub mod klib; // Utilitários internos (framework de testes)
pub mod mm; // Gerenciamento de memória (reclaim)
