//! Colaborador de I/O do reclaim.
//!
//! O núcleo nunca fala com dispositivos: pausas limitadas, throttling de
//! write-back e liberação de dados privados de cache passam por aqui.

use core::time::Duration;

use crate::mm::pfm::Page;

pub trait IoControl: Send + Sync {
    /// Pausa limitada esperando filas de write-back esvaziarem.
    fn congestion_wait(&self, timeout: Duration);

    /// Bloqueia brevemente se write-back demais está pendente no sistema.
    fn throttle_vm_writeout(&self) {}

    /// Acorda o flusher de background para escrever `nr_pages` páginas
    /// sujas (`0` = tudo).
    fn wakeup_flusher(&self, nr_pages: usize);

    /// Libera dados privados do cache anexados a `page` (buffer heads).
    fn release_private(&self, page: &Page) -> bool;
}
