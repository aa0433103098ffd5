//! # PMM - Physical Memory Manager
//!
//! Zonas, pool de frames livres e o registro LRU de páginas recuperáveis.

pub mod lru;
pub mod zones;

pub use lru::{IsolateResult, LruList};
pub use zones::{Node, Watermark, Watermarks, Zone, ZoneType};
