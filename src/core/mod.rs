//! Core Module
//!
//! Infraestrutura comum ao núcleo de reclaim, independente de arquitetura.

pub mod logging;
