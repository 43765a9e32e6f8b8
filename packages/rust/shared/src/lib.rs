//! Shared types, error model, and configuration for tenderfeed.
//!
//! This crate is the foundation depended on by all other tenderfeed crates.
//! It provides:
//! - [`TenderFeedError`]: the unified error type
//! - Domain types ([`Tender`], [`TenderCommon`], [`SupportingDocument`], [`RunId`])
//! - Configuration ([`AppConfig`], [`PortalConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DeliveryConfig, HttpConfig, MAX_BATCH_SIZE, PortalConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, validate_config,
};
pub use error::{Result, TenderFeedError};
pub use types::{
    CanonicalRecord, NOT_AVAILABLE, RunId, SupportingDocument, TENDER_DETAILS_DOC, Tender,
    TenderCommon,
};
