//! # Page Frame Manager (PFM)
//!
//! Metadados por página (`frame`) e a interface de reverse-mapping (`rmap`).

pub mod frame;
pub mod rmap;

pub use frame::{Page, PageFlags, Pfn};
pub use rmap::{
    page_add_rmap, page_mapping_inuse, page_referenced, page_remove_rmap, ReverseMap,
    UnmapResult,
};
