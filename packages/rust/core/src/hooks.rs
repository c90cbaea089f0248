//! Seams to the host compilation pipeline.
//!
//! The host owns the compilation. It hands plugins the in-memory build
//! artifacts at the assets-ready stage and signals the done stage once the
//! whole build (emission included) has finished.

use std::path::Path;

use async_trait::async_trait;

use shipfiles_shared::Result;

use crate::context::BuildContext;

/// Named build artifacts of one compilation.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Names of every artifact, `/`-separated and relative to the output root.
    async fn asset_names(&self) -> Result<Vec<String>>;

    /// Current content of `name`. Unknown names are [`ShipfilesError::Asset`] errors.
    ///
    /// [`ShipfilesError::Asset`]: shipfiles_shared::ShipfilesError::Asset
    async fn get_asset(&self, name: &str) -> Result<Vec<u8>>;

    /// Replace the content of an existing artifact. The artifact is either
    /// fully replaced or left untouched.
    async fn update_asset(&self, name: &str, contents: Vec<u8>) -> Result<()>;

    /// Write the artifacts into `output_root`.
    async fn emit(&self, output_root: &Path) -> Result<()>;
}

/// A plugin attached to the compilation lifecycle.
///
/// Both stages default to no-ops so plugins only implement what they use.
#[async_trait]
pub trait CompilerPlugin: Send + Sync {
    /// Plugin name for tracing.
    fn name(&self) -> &str;

    /// Assets-ready, pre-emit stage. Runs once per compilation.
    async fn process_assets(&self, _assets: &dyn AssetStore, _ctx: &BuildContext) -> Result<()> {
        Ok(())
    }

    /// Build-done stage. Runs once, after every `process_assets` call has
    /// completed and the assets were emitted.
    async fn done(&self, _ctx: &BuildContext) -> Result<()> {
        Ok(())
    }
}
