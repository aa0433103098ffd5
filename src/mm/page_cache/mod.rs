//! Page Cache
//!
//! O mapping dono de uma página (`AddressSpace`): índice offset→página
//! protegido pelo `tree_lock`, operações de write-back e as flags de erro que
//! um `fsync` posterior vai consumir.
//!
//! # Arquitetura
//! - Cada arquivo (e o swap) tem um `AddressSpace`
//! - O índice segura uma referência (`count`) de cada página
//! - A página aponta para o mapping com um `Weak`: truncar o arquivo
//!   (soltar o `Arc`) deixa as páginas órfãs, nunca penduradas

use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use bitflags::bitflags;
use spin::{Mutex, MutexGuard};

use crate::mm::error::{MmError, MmResult, WritebackError};
use crate::mm::pfm::Page;

pub type MappingId = u64;

bitflags! {
    /// Flags de erro assíncrono do mapping.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct AsFlags: u32 {
        const EIO    = 1 << 0;
        const ENOSPC = 1 << 1;
    }
}

/// Resultado de um write-back pedido pelo reclaim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritebackResult {
    /// Escrita concluída de forma síncrona; página limpa.
    Success,
    /// Transporte recusou (precisaria bloquear, ou redirtied). Página segue suja.
    StillDirty,
    /// Escrita submetida; `end_page_writeback` será chamado na conclusão.
    InFlight,
    /// Falha de transporte.
    Error(WritebackError),
}

/// Operações de write-back do mapping (filesystem ou transporte de swap).
pub trait AddressSpaceOps: Send + Sync {
    /// Escreve `page` no backing store.
    ///
    /// `allow_blocking == false` proíbe esperar por fila congestionada;
    /// nesse caso o colaborador deve devolver `StillDirty`.
    fn writepage(&self, page: &Page, allow_blocking: bool) -> WritebackResult;
}

/// Mapping dono de páginas do cache.
pub struct AddressSpace {
    id: MappingId,
    /// tree_lock + índice
    tree: Mutex<BTreeMap<u64, Arc<Page>>>,
    flags: AtomicU32,
    nr_mmaps: AtomicUsize,
    ops: Option<Arc<dyn AddressSpaceOps>>,
    swap: bool,
}

impl AddressSpace {
    /// Mapping de arquivo. `ops == None`: não há como escrever de volta.
    pub fn new(id: MappingId, ops: Option<Arc<dyn AddressSpaceOps>>) -> Arc<Self> {
        Arc::new(Self {
            id,
            tree: Mutex::new(BTreeMap::new()),
            flags: AtomicU32::new(0),
            nr_mmaps: AtomicUsize::new(0),
            ops,
            swap: false,
        })
    }

    /// O mapping do swap cache (swapper space). Indexado por slot.
    pub fn new_swapper(ops: Arc<dyn AddressSpaceOps>) -> Arc<Self> {
        Arc::new(Self {
            id: MappingId::MAX,
            tree: Mutex::new(BTreeMap::new()),
            flags: AtomicU32::new(0),
            nr_mmaps: AtomicUsize::new(0),
            ops: Some(ops),
            swap: true,
        })
    }

    #[inline]
    pub fn id(&self) -> MappingId {
        self.id
    }

    #[inline]
    pub fn is_swapper(&self) -> bool {
        self.swap
    }

    pub fn ops(&self) -> Option<&Arc<dyn AddressSpaceOps>> {
        self.ops.as_ref()
    }

    pub fn nr_pages(&self) -> usize {
        self.tree.lock().len()
    }

    pub fn find_page(&self, index: u64) -> Option<Arc<Page>> {
        self.tree.lock().get(&index).cloned()
    }

    /// Adquire o tree_lock. Seção crítica curta e limitada.
    pub(crate) fn tree(&self) -> MutexGuard<'_, BTreeMap<u64, Arc<Page>>> {
        self.tree.lock()
    }

    /// Insere `page` no índice em `index`. O índice ganha uma referência.
    pub fn add_page(self: &Arc<Self>, page: &Arc<Page>, index: u64) -> MmResult<()> {
        let mut tree = self.tree.lock();
        if tree.contains_key(&index) {
            return Err(MmError::AlreadyMapped);
        }
        page.get();
        page.set_index(index);
        page.set_mapping(Some(self));
        tree.insert(index, page.clone());
        Ok(())
    }

    /// Remove a página do índice (truncation). Solta a referência do cache.
    pub fn remove_page(&self, page: &Page) -> bool {
        let mut tree = self.tree.lock();
        Self::remove_locked(&mut tree, page)
    }

    /// Remove com o tree_lock já adquirido.
    pub(crate) fn remove_locked(tree: &mut BTreeMap<u64, Arc<Page>>, page: &Page) -> bool {
        let index = page.index();
        match tree.get(&index) {
            Some(p) if p.pfn() == page.pfn() => {
                tree.remove(&index);
                page.set_mapping(None);
                page.put();
                true
            }
            _ => false,
        }
    }

    // -------------------------------------------------------------------------
    // VMAs
    // -------------------------------------------------------------------------

    /// Registra uma VMA mapeando este arquivo.
    pub fn mmap(&self) {
        self.nr_mmaps.fetch_add(1, Ordering::Relaxed);
    }

    pub fn munmap(&self) {
        let _ = self
            .nr_mmaps
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                Some(n.saturating_sub(1))
            });
    }

    /// Há VMAs vivas sobre este mapping?
    #[inline]
    pub fn is_mmapped(&self) -> bool {
        self.nr_mmaps.load(Ordering::Relaxed) > 0
    }

    // -------------------------------------------------------------------------
    // Erros assíncronos
    // -------------------------------------------------------------------------

    /// Registra um erro de write-back para ser visto no próximo `fsync`.
    pub fn set_error(&self, err: WritebackError) {
        let flag = match err {
            WritebackError::NoSpace => AsFlags::ENOSPC,
            WritebackError::Io => AsFlags::EIO,
        };
        self.flags.fetch_or(flag.bits(), Ordering::AcqRel);
    }

    pub fn error_flags(&self) -> AsFlags {
        AsFlags::from_bits_truncate(self.flags.load(Ordering::Acquire))
    }

    /// Consome os erros pendentes (semântica de `fsync`).
    ///
    /// ENOSPC tem precedência sobre EIO quando ambos estão setados.
    pub fn check_errors(&self) -> MmResult<()> {
        let mask = (AsFlags::ENOSPC | AsFlags::EIO).bits();
        let prev = AsFlags::from_bits_truncate(self.flags.fetch_and(!mask, Ordering::AcqRel));
        if prev.contains(AsFlags::ENOSPC) {
            Err(WritebackError::NoSpace.into())
        } else if prev.contains(AsFlags::EIO) {
            Err(WritebackError::Io.into())
        } else {
            Ok(())
        }
    }
}

impl core::fmt::Debug for AddressSpace {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AddressSpace")
            .field("id", &self.id)
            .field("swap", &self.swap)
            .field("flags", &self.error_flags())
            .finish()
    }
}
