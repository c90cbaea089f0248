//! Core of shipfiles: ships dynamically loaded runtime files with a
//! standalone build.
//!
//! The [`plugin::RuntimeFilesPlugin`] hooks into a compilation through the
//! [`hooks`] seams: it appends runtime files to every trace manifest while
//! assets are ready, then copies the files into the output root once the
//! build is done.

pub mod assets;
pub mod context;
pub mod hooks;
pub mod locator;
pub mod manifest;
pub mod pipeline;
pub mod plugin;
pub mod propagate;

pub use assets::{DiskAssets, MemoryAssets};
pub use context::BuildContext;
pub use hooks::{AssetStore, CompilerPlugin};
pub use locator::RuntimeFileLocator;
pub use manifest::ManifestPatcher;
pub use pipeline::{
    BuildReport, ProgressReporter, SilentProgress, patch_output_dir, run_compilation,
};
pub use plugin::RuntimeFilesPlugin;
pub use propagate::OutputPropagator;
