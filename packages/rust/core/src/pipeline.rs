//! Host-side compilation driver: context → assets-ready → emit → done.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, instrument};

use shipfiles_shared::{PluginConfig, Result};

use crate::assets::DiskAssets;
use crate::context::BuildContext;
use crate::hooks::{AssetStore, CompilerPlugin};
use crate::plugin::RuntimeFilesPlugin;

/// Summary of one compilation.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Directory the build emitted into.
    pub output_root: PathBuf,
    /// Number of trace manifests patched.
    pub manifests_patched: usize,
    /// Number of runtime files copied.
    pub files_copied: usize,
    /// Output roots that had at least one manifest patched.
    pub dirty_roots: Vec<PathBuf>,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting build status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new lifecycle stage.
    fn phase(&self, name: &str);
    /// Called after a manifest was patched.
    fn manifest_patched(&self, artifact: &str);
    /// Called after a runtime file was copied.
    fn file_copied(&self, file: &str);
    /// Called when the build completes.
    fn done(&self, report: &BuildReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn manifest_patched(&self, _artifact: &str) {}
    fn file_copied(&self, _file: &str) {}
    fn done(&self, _report: &BuildReport) {}
}

/// Run one compilation's lifecycle over `assets`.
///
/// 1. Fresh [`BuildContext`] for `output_root`
/// 2. Every plugin's assets-ready stage, in registration order
/// 3. Emit assets
/// 4. Every plugin's done stage
///
/// The first stage error aborts the build. The context is dropped on return.
#[instrument(skip_all, fields(output_root = %output_root.display(), plugins = plugins.len()))]
pub async fn run_compilation(
    output_root: &Path,
    assets: &dyn AssetStore,
    plugins: &[Box<dyn CompilerPlugin>],
    progress: Arc<dyn ProgressReporter>,
) -> Result<BuildReport> {
    let start = Instant::now();
    let ctx = BuildContext::new(output_root, progress.clone());

    progress.phase("Processing assets");
    for plugin in plugins {
        plugin.process_assets(assets, &ctx).await?;
    }

    progress.phase("Emitting assets");
    assets.emit(output_root).await?;

    progress.phase("Finishing build");
    for plugin in plugins {
        plugin.done(&ctx).await?;
    }

    let report = BuildReport {
        output_root: output_root.to_path_buf(),
        manifests_patched: ctx.manifests_patched(),
        files_copied: ctx.files_copied(),
        dirty_roots: ctx.dirty_roots().await,
        elapsed: start.elapsed(),
    };

    info!(
        manifests = report.manifests_patched,
        files = report.files_copied,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "build complete"
    );
    progress.done(&report);

    Ok(report)
}

/// Patch an already emitted output directory and copy the runtime files
/// into it.
pub async fn patch_output_dir(
    config: &PluginConfig,
    output_root: &Path,
    progress: Arc<dyn ProgressReporter>,
) -> Result<BuildReport> {
    let assets = DiskAssets::new(output_root);
    let plugins: Vec<Box<dyn CompilerPlugin>> = vec![Box::new(RuntimeFilesPlugin::new(config))];
    run_compilation(output_root, &assets, &plugins, progress).await
}
