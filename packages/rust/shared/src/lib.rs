//! Shared types, error model, and configuration for annorelay.
//!
//! This crate is the foundation depended on by all other annorelay crates.
//! It provides:
//! - [`AnnoRelayError`]: the unified error type
//! - Domain types ([`ItemKey`], [`Category`], [`ColorBucket`], [`MetadataRecord`])
//! - Configuration ([`AppConfig`], runtime configs, config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ClassifierConfig, ClassifierPolicy, ClassifierSection, DEFAULT_MAX_LENGTH,
    DeliveryConfig, DeliverySection, OversizePolicy, RedHighlight, SheetConfig, SheetSection,
    StoreSection, config_dir, config_file_path, expand_home, init_config, load_config,
    load_config_from,
};
pub use error::{AnnoRelayError, ErrorKind, Result};
pub use types::{
    AttachmentHandle, Category, ClassifiedAnnotation, ColorBucket, ItemKey, MetadataRecord,
    ParentId, RawAnnotation,
};
