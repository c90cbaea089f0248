//! The runtime-files plugin: patches trace manifests while assets are
//! ready, then copies the runtime files once the build is done.

use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::{debug, info, instrument};

use shipfiles_shared::{PluginConfig, Result};

use crate::context::BuildContext;
use crate::hooks::{AssetStore, CompilerPlugin};
use crate::manifest::ManifestPatcher;
use crate::propagate::OutputPropagator;

/// Plugin name reported to the host.
pub const PLUGIN_NAME: &str = "RuntimeFilesPlugin";

/// Ships dynamically loaded runtime files with a standalone build.
#[derive(Debug, Clone)]
pub struct RuntimeFilesPlugin {
    patcher: ManifestPatcher,
    propagator: OutputPropagator,
}

impl RuntimeFilesPlugin {
    pub fn new(config: &PluginConfig) -> Self {
        Self {
            patcher: ManifestPatcher::from_config(config),
            propagator: OutputPropagator::from_config(config),
        }
    }
}

#[async_trait]
impl CompilerPlugin for RuntimeFilesPlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    #[instrument(skip_all, fields(output_root = %ctx.output_root().display()))]
    async fn process_assets(&self, assets: &dyn AssetStore, ctx: &BuildContext) -> Result<()> {
        let names = assets.asset_names().await?;
        let manifests = self.patcher.select_manifest_artifacts(&names);

        if manifests.is_empty() {
            debug!("no trace manifests in this compilation");
            return Ok(());
        }

        let output_root = ctx.output_root();
        try_join_all(
            manifests
                .iter()
                .map(|name| self.patcher.patch(assets, name, output_root, ctx)),
        )
        .await?;

        info!(count = manifests.len(), "trace manifests patched");
        Ok(())
    }

    async fn done(&self, ctx: &BuildContext) -> Result<()> {
        self.propagator.propagate(ctx, ctx.output_root()).await?;
        Ok(())
    }
}
