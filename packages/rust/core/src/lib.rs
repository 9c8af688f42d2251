//! Core domain logic for annorelay.
//!
//! Ties the read-only Zotero store to color classification, category
//! aggregation, and chunking into the payloads handed to delivery
//! collaborators (e.g. `Extractor::extract`).

pub mod aggregate;
pub mod chunk;
pub mod classifier;
pub mod payload;
pub mod pipeline;
