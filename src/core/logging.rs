// =============================================================================
// RECLAIM LOGGING SYSTEM - ZERO OVERHEAD
// =============================================================================
//
// Sistema de logging do núcleo de reclaim com custo ZERO em release.
//
// ARQUITETURA:
// - Usa features do Cargo para compile-time filtering
// - Com feature "no_logs", TODOS os macros viram expressões vazias
// - SEM core::fmt - Apenas strings literais + um valor hex opcional
// - SEM alocação
// - A saída vai para um `LogSink` instalado pelo kernel hospedeiro
//   (serial, ring buffer, stderr nos testes). Sem sink, a mensagem é descartada.
//
// NÍVEIS DE LOG (do mais crítico ao menos):
// - ERROR: Erros fatais ou críticos
// - WARN:  Situações suspeitas mas recuperáveis
// - INFO:  Fluxo normal de execução
// - DEBUG: Informações de debugging
// - TRACE: Detalhes extremos (cada página)
//
// FEATURES:
// - no_logs:   Remove 100% dos logs (custo zero no binário)
// - log_error: Apenas ERROR, WARN
// - log_info:  ERROR, WARN, INFO
// - log_debug: ERROR, WARN, INFO, DEBUG
// - log_trace: Todos os níveis (padrão)
//
// COMO USAR:
//   kinfo!("(KSWAPD) Iniciado");             // Apenas string
//   kinfo!("(VMSCAN) nr_reclaimed=", n);     // String + hex
//   klog!("Scan=", scanned, " Freed=", freed);
//
// =============================================================================

use spin::RwLock;

// =============================================================================
// SINK
// =============================================================================

/// Destino das mensagens de log.
pub trait LogSink: Sync {
    fn write_str(&self, s: &str);
}

static SINK: RwLock<Option<&'static dyn LogSink>> = RwLock::new(None);

/// Instala o destino global dos logs. Substitui o anterior.
pub fn set_sink(sink: &'static dyn LogSink) {
    *SINK.write() = Some(sink);
}

/// Remove o destino atual (logs passam a ser descartados).
pub fn clear_sink() {
    *SINK.write() = None;
}

#[inline(never)]
pub fn emit_str(s: &str) {
    if let Some(sink) = *SINK.read() {
        sink.write_str(s);
    }
}

#[inline(never)]
pub fn emit_nl() {
    emit_str("\n");
}

/// Emite um valor u64 em hexadecimal (`0x` + 16 nibbles).
#[inline(never)]
pub fn emit_hex(value: u64) {
    let mut buf = [0u8; 18];
    buf[0] = b'0';
    buf[1] = b'x';
    let mut i = 0;
    while i < 16 {
        let shift = 60 - i * 4;
        buf[2 + i] = nibble_to_ascii(((value >> shift) & 0xF) as u8);
        i += 1;
    }
    if let Ok(s) = core::str::from_utf8(&buf) {
        emit_str(s);
    }
}

/// Emite um valor usize em decimal.
///
/// Esta função usa um buffer de stack de 20 bytes (máximo para u64).
#[inline(never)]
pub fn emit_dec(mut value: usize) {
    let mut buf: [u8; 20] = [0; 20];
    let mut pos = 20;

    if value == 0 {
        emit_str("0");
        return;
    }

    while value > 0 {
        pos -= 1;
        buf[pos] = b'0' + (value % 10) as u8;
        value /= 10;
    }

    if let Ok(s) = core::str::from_utf8(&buf[pos..]) {
        emit_str(s);
    }
}

/// Converte nibble (0-15) para caractere ASCII ('0'-'9', 'A'-'F').
#[inline(always)]
const fn nibble_to_ascii(n: u8) -> u8 {
    if n < 10 {
        b'0' + n
    } else {
        b'A' + (n - 10)
    }
}

// =============================================================================
// PREFIXOS COM CORES ANSI
// =============================================================================

pub const P_ERROR: &str = "\x1b[1;31m[ERRO]\x1b[0m ";
pub const P_WARN: &str = "\x1b[1;33m[WARN]\x1b[0m ";
pub const P_INFO: &str = "\x1b[32m[INFO]\x1b[0m ";
pub const P_DEBUG: &str = "\x1b[36m[DEBG]\x1b[0m ";
pub const P_TRACE: &str = "\x1b[35m[TRAC]\x1b[0m ";

// =============================================================================
// MACROS DE LOG - NÍVEL ERROR
// =============================================================================

#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! kerror {
    ($msg:expr) => {{
        $crate::core::logging::emit_str($crate::core::logging::P_ERROR);
        $crate::core::logging::emit_str($msg);
        $crate::core::logging::emit_nl();
    }};
    ($msg:expr, $val:expr) => {{
        $crate::core::logging::emit_str($crate::core::logging::P_ERROR);
        $crate::core::logging::emit_str($msg);
        $crate::core::logging::emit_hex($val as u64);
        $crate::core::logging::emit_nl();
    }};
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! kerror {
    ($($t:tt)*) => {{}};
}

// =============================================================================
// MACROS DE LOG - NÍVEL WARN
// =============================================================================

#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! kwarn {
    ($msg:expr) => {{
        $crate::core::logging::emit_str($crate::core::logging::P_WARN);
        $crate::core::logging::emit_str($msg);
        $crate::core::logging::emit_nl();
    }};
    ($msg:expr, $val:expr) => {{
        $crate::core::logging::emit_str($crate::core::logging::P_WARN);
        $crate::core::logging::emit_str($msg);
        $crate::core::logging::emit_hex($val as u64);
        $crate::core::logging::emit_nl();
    }};
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! kwarn {
    ($($t:tt)*) => {{}};
}

// =============================================================================
// MACROS DE LOG - NÍVEL INFO
// =============================================================================

#[cfg(any(
    feature = "log_trace",
    feature = "log_debug",
    feature = "log_info"
))]
#[macro_export]
macro_rules! kinfo {
    ($msg:expr) => {{
        $crate::core::logging::emit_str($crate::core::logging::P_INFO);
        $crate::core::logging::emit_str($msg);
        $crate::core::logging::emit_nl();
    }};
    ($msg:expr, $val:expr) => {{
        $crate::core::logging::emit_str($crate::core::logging::P_INFO);
        $crate::core::logging::emit_str($msg);
        $crate::core::logging::emit_hex($val as u64);
        $crate::core::logging::emit_nl();
    }};
}

#[cfg(not(any(
    feature = "log_trace",
    feature = "log_debug",
    feature = "log_info"
)))]
#[macro_export]
macro_rules! kinfo {
    ($($t:tt)*) => {{}};
}

// =============================================================================
// MACROS DE LOG - NÍVEL DEBUG
// =============================================================================

#[cfg(any(feature = "log_trace", feature = "log_debug"))]
#[macro_export]
macro_rules! kdebug {
    ($msg:expr) => {{
        $crate::core::logging::emit_str($crate::core::logging::P_DEBUG);
        $crate::core::logging::emit_str($msg);
        $crate::core::logging::emit_nl();
    }};
    ($msg:expr, $val:expr) => {{
        $crate::core::logging::emit_str($crate::core::logging::P_DEBUG);
        $crate::core::logging::emit_str($msg);
        $crate::core::logging::emit_hex($val as u64);
        $crate::core::logging::emit_nl();
    }};
}

#[cfg(not(any(feature = "log_trace", feature = "log_debug")))]
#[macro_export]
macro_rules! kdebug {
    ($($t:tt)*) => {{}};
}

// =============================================================================
// MACROS DE LOG - NÍVEL TRACE
// =============================================================================
//
// ktrace! - Ativo apenas com log_trace.
// Usado para detalhes de cada página processada.
//

#[cfg(feature = "log_trace")]
#[macro_export]
macro_rules! ktrace {
    ($msg:expr) => {{
        $crate::core::logging::emit_str($crate::core::logging::P_TRACE);
        $crate::core::logging::emit_str($msg);
        $crate::core::logging::emit_nl();
    }};
    ($msg:expr, $val:expr) => {{
        $crate::core::logging::emit_str($crate::core::logging::P_TRACE);
        $crate::core::logging::emit_str($msg);
        $crate::core::logging::emit_hex($val as u64);
        $crate::core::logging::emit_nl();
    }};
}

#[cfg(not(feature = "log_trace"))]
#[macro_export]
macro_rules! ktrace {
    ($($t:tt)*) => {{}};
}

// =============================================================================
// MACROS AUXILIARES
// =============================================================================

/// klog! - Log genérico sem prefixo de nível.
///
/// Útil para construir logs com múltiplos valores.
///
/// # Uso
/// ```text
/// klog!("Zone=", idx);                           // String + hex
/// klog!("Scan=", scanned, " Freed=", freed);     // Múltiplos
/// ```
#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! klog {
    ($msg:expr) => {{
        $crate::core::logging::emit_str($msg);
    }};
    ($msg:expr, $val:expr) => {{
        $crate::core::logging::emit_str($msg);
        $crate::core::logging::emit_hex($val as u64);
    }};
    ($msg1:expr, $val:expr, $msg2:expr) => {{
        $crate::core::logging::emit_str($msg1);
        $crate::core::logging::emit_hex($val as u64);
        $crate::core::logging::emit_str($msg2);
    }};
    ($msg1:expr, $val1:expr, $msg2:expr, $val2:expr) => {{
        $crate::core::logging::emit_str($msg1);
        $crate::core::logging::emit_hex($val1 as u64);
        $crate::core::logging::emit_str($msg2);
        $crate::core::logging::emit_hex($val2 as u64);
    }};
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! klog {
    ($($t:tt)*) => {{}};
}

/// knl! - Emite apenas newline.
#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! knl {
    () => {{
        $crate::core::logging::emit_nl();
    }};
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! knl {
    () => {{}};
}

// =============================================================================
// MACROS DE STATUS (OK/FAIL)
// =============================================================================

/// kok! - Log de sucesso (prefixo verde [OK]).
#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! kok {
    ($msg:expr) => {{
        $crate::core::logging::emit_str("\x1b[32m[OK]\x1b[0m ");
        $crate::core::logging::emit_str($msg);
        $crate::core::logging::emit_nl();
    }};
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! kok {
    ($($t:tt)*) => {{}};
}

/// kfail! - Log de falha (prefixo vermelho [FAIL]).
#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! kfail {
    ($msg:expr) => {{
        $crate::core::logging::emit_str("\x1b[1;31m[FAIL]\x1b[0m ");
        $crate::core::logging::emit_str($msg);
        $crate::core::logging::emit_nl();
    }};
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! kfail {
    ($($t:tt)*) => {{}};
}
