//! Framework de testes do kernel
//!
//! As suítes são listas estáticas de `TestCase`. No boot (feature `self_test`)
//! elas rodam via `run_test_suite`; no host, `host_suite!` transforma cada
//! caso em um `#[test]` do `cargo test`.

/// Resultado de teste
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestResult {
    Passed,
    Failed,
    Skipped,
}

/// Um caso de teste
pub struct TestCase {
    pub name: &'static str,
    pub func: fn() -> TestResult,
}

impl TestCase {
    pub const fn new(name: &'static str, func: fn() -> TestResult) -> Self {
        Self { name, func }
    }
}

/// Executa suite de testes
///
/// Retorna `(passed, failed, skipped)`.
pub fn run_test_suite(name: &str, tests: &[TestCase]) -> (usize, usize, usize) {
    crate::kinfo!("=== Executando suite de testes");
    crate::klog!("    ");
    crate::klog!(name);
    crate::knl!();

    let mut passed = 0;
    let mut failed = 0;
    let mut skipped = 0;

    for test in tests {
        let result = (test.func)();
        match result {
            TestResult::Passed => {
                crate::kok!(test.name);
                passed += 1;
            }
            TestResult::Failed => {
                crate::kfail!(test.name);
                failed += 1;
            }
            TestResult::Skipped => {
                crate::kwarn!("[SKIP]");
                skipped += 1;
            }
        }
    }

    crate::kinfo!("Resultados: passed=", passed as u64);
    if failed > 0 {
        crate::kerror!("Resultados: failed=", failed as u64);
    }
    (passed, failed, skipped)
}

/// kassert! - Falha o caso de teste atual com uma mensagem.
///
/// Só pode ser usado dentro de funções `fn() -> TestResult`.
#[macro_export]
macro_rules! kassert {
    ($cond:expr, $msg:expr) => {
        if !$cond {
            $crate::kerror!($msg);
            return $crate::klib::test_framework::TestResult::Failed;
        }
    };
    ($cond:expr, $msg:expr, $val:expr) => {
        if !$cond {
            $crate::kerror!($msg, $val);
            return $crate::klib::test_framework::TestResult::Failed;
        }
    };
}

/// host_suite! - Expõe casos de uma suíte como `#[test]` no host.
///
/// Cada identificador deve nomear uma `fn() -> TestResult` do módulo atual.
#[macro_export]
macro_rules! host_suite {
    ($($case:ident),* $(,)?) => {
    };
}
