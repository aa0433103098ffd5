//! # Testes de Concorrência
//!
//! Usam threads do host (`std`): só existem em `cargo test`.
//!
//! - `isolate_race_test.rs` - Isolamento e eviction concorrentes na mesma zona
//! - `kswapd_thread_test.rs` - kswapd em thread própria, acordado pelo alocador

pub mod isolate_race_test;
pub mod kswapd_thread_test;
