//! # Shrinkers
//!
//! Caches auxiliares (slab, dentries, inodes) que devolvem memória em
//! proporção à pressão de reclaim sobre as LRUs.
//!
//! Registro e remoção seguram o lock de escrita; a passada de shrink só o de
//! leitura (callbacks podem rodar em paralelo entre si, nunca com
//! (des)registro).

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use spin::RwLock;

use super::AllocFlags;
use crate::mm::config::{SHRINK_BATCH, SWAP_CLUSTER_MAX};
use crate::mm::error::{MmError, MmResult};
use crate::mm::stats::VmEvents;

/// Resposta de um shrinker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShrinkReply {
    /// Objetos que restam no cache após a chamada.
    Count(usize),
    /// Não me chame de novo nesta passada.
    Stop,
}

/// Callback de um cache auxiliar.
pub trait Shrinker: Send + Sync {
    /// Tenta liberar `nr_to_scan` objetos.
    ///
    /// Com `nr_to_scan == 0` é só uma sonda: devolve o tamanho do cache
    /// (máximo liberável) sem liberar nada.
    fn shrink(&self, nr_to_scan: usize, gfp: AllocFlags) -> ShrinkReply;
}

/// Handle devolvido pelo registro.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShrinkerHandle(u64);

struct ShrinkerEntry {
    handle: ShrinkerHandle,
    /// Custo de recriar um objeto
    seeks: u32,
    /// Trabalho pendente acumulado
    nr: AtomicUsize,
    callback: Box<dyn Shrinker>,
}

impl ShrinkerEntry {
    fn probe(&self, gfp: AllocFlags) -> usize {
        match self.callback.shrink(0, gfp) {
            ShrinkReply::Count(n) => n,
            ShrinkReply::Stop => 0,
        }
    }
}

/// Registro de shrinkers.
pub struct ShrinkerRegistry {
    entries: RwLock<Vec<ShrinkerEntry>>,
    next_id: AtomicU64,
}

impl ShrinkerRegistry {
    pub const fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn register(&self, callback: Box<dyn Shrinker>, seeks: u32) -> ShrinkerHandle {
        let handle = ShrinkerHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.write().push(ShrinkerEntry {
            handle,
            seeks,
            nr: AtomicUsize::new(0),
            callback,
        });
        crate::kdebug!("(SHRINK) registrado id=", handle.0);
        handle
    }

    pub fn unregister(&self, handle: ShrinkerHandle) -> MmResult<()> {
        let mut entries = self.entries.write();
        let pos = entries
            .iter()
            .position(|e| e.handle == handle)
            .ok_or(MmError::UnknownShrinker)?;
        entries.remove(pos);
        crate::kdebug!("(SHRINK) removido id=", handle.0);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Trabalho pendente acumulado de um shrinker.
    pub fn pending(&self, handle: ShrinkerHandle) -> MmResult<usize> {
        self.entries
            .read()
            .iter()
            .find(|e| e.handle == handle)
            .map(|e| e.nr.load(Ordering::Relaxed))
            .ok_or(MmError::UnknownShrinker)
    }

    /// Aplica pressão proporcional a `scanned` sobre todos os shrinkers.
    ///
    /// `delta = 4 * scanned * seeks / (lru_pages + 1)`, acumulado e limitado
    /// a 2× o máximo liberável; o callback é chamado em sub-lotes de
    /// `SHRINK_BATCH` até a pendência cair abaixo de um sub-lote ou ele
    /// pedir `Stop`. Retorna quantos objetos foram liberados.
    ///
    /// Se um (des)registro segura o lock de escrita, a passada é pulada.
    pub fn shrink_slab(
        &self,
        scanned: usize,
        gfp: AllocFlags,
        lru_pages: usize,
        events: &VmEvents,
    ) -> usize {
        let scanned = if scanned == 0 { SWAP_CLUSTER_MAX } else { scanned };

        let entries = match self.entries.try_read() {
            Some(entries) => entries,
            None => return 1,
        };

        let mut freed = 0;
        for entry in entries.iter() {
            let max_pass = entry.probe(gfp);
            let delta = scanned
                .saturating_mul(4)
                .saturating_mul(entry.seeks as usize)
                / lru_pages.saturating_add(1);

            let pending = entry.nr.swap(0, Ordering::Relaxed).saturating_add(delta);
            let mut total_scan = pending.min(max_pass.saturating_mul(2));

            while total_scan >= SHRINK_BATCH {
                let nr_before = entry.probe(gfp);
                let remaining = match entry.callback.shrink(SHRINK_BATCH, gfp) {
                    ShrinkReply::Stop => break,
                    ShrinkReply::Count(n) => n,
                };
                freed += nr_before.saturating_sub(remaining);
                VmEvents::add(&events.slabs_scanned, SHRINK_BATCH);
                total_scan -= SHRINK_BATCH;
            }

            entry.nr.fetch_add(total_scan, Ordering::Relaxed);
        }

        if freed > 0 {
            crate::ktrace!("(SHRINK) objetos liberados=", freed);
        }
        freed
    }
}

impl Default for ShrinkerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
