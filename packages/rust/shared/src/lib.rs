//! Shared types, error model, and configuration for shipfiles.
//!
//! This crate is the foundation depended on by the other shipfiles crates.
//! It provides:
//! - [`ShipfilesError`] — the unified error type
//! - Domain types ([`RuntimeFileSet`], [`RuntimeSource`], [`ShippablePattern`])
//! - Configuration ([`AppConfig`], [`PluginConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, FilesConfig, ManifestConfig, PluginConfig, RuntimeConfig, config_file_path,
    init_config, load_config_from, load_project_config,
};
pub use error::{Result, ShipfilesError};
pub use types::{
    DEFAULT_ANCHOR_PACKAGE, DEFAULT_MANIFEST_SUFFIX, DEFAULT_RUNTIME_PACKAGE,
    DEFAULT_SHIPPABLE_PATTERN, DEFAULT_TRACE_FIELD, RuntimeFileSet, RuntimeSource,
    ShippablePattern,
};
