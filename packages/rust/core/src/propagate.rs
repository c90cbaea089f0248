//! Post-build copy of runtime files into patched output roots.

use std::path::Path;

use futures::future::try_join_all;
use tracing::{debug, info, instrument};

use shipfiles_shared::{PluginConfig, Result, ShipfilesError};

use crate::context::BuildContext;
use crate::locator::RuntimeFileLocator;

/// Copies shippable runtime files next to the build output.
#[derive(Debug, Clone)]
pub struct OutputPropagator {
    locator: RuntimeFileLocator,
}

impl OutputPropagator {
    pub fn new(locator: RuntimeFileLocator) -> Self {
        Self { locator }
    }

    pub fn from_config(config: &PluginConfig) -> Self {
        Self::new(RuntimeFileLocator::from_config(config))
    }

    /// Copy every shippable file into `output_root` if a manifest under it
    /// was patched in this build. Returns the number of files copied.
    ///
    /// Copies run concurrently and overwrite existing files. The first failed
    /// copy fails the call with [`ShipfilesError::Copy`]; copies that already
    /// finished stay in place.
    #[instrument(skip_all, fields(output_root = %output_root.display()))]
    pub async fn propagate(&self, ctx: &BuildContext, output_root: &Path) -> Result<usize> {
        if !ctx.is_patched(output_root).await {
            debug!("no patched manifests, nothing to copy");
            return Ok(0);
        }

        let files = self.locator.list_shippable_files().await?;

        let copies = files.files().iter().map(|name| {
            let from = files.source_path(name);
            let to = output_root.join(name);
            async move {
                tokio::fs::copy(&from, &to)
                    .await
                    .map_err(|e| ShipfilesError::copy(&from, e))?;
                ctx.record_copy();
                ctx.progress().file_copied(name);
                debug!(file = %name, "copied runtime file");
                Ok::<_, ShipfilesError>(())
            }
        });
        try_join_all(copies).await?;

        info!(count = files.len(), from = %files.dir().display(), "runtime files propagated");
        Ok(files.len())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use shipfiles_shared::RuntimeSource;

    fn temp_dir() -> PathBuf {
        let dir =
            std::env::temp_dir().join(format!("sf-propagate-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn unpatched_root_is_untouched() {
        let out = temp_dir();
        // The runtime source does not even resolve: nothing may be read.
        let propagator = OutputPropagator::new(RuntimeFileLocator::new(
            RuntimeSource::Explicit(out.join("missing-runtime")),
            Default::default(),
        ));
        let ctx = BuildContext::silent(&out);

        let copied = propagator.propagate(&ctx, &out).await.unwrap();

        assert_eq!(copied, 0);
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 0);

        let _ = std::fs::remove_dir_all(&out);
    }

    #[tokio::test]
    async fn copies_and_overwrites() {
        let rt = temp_dir();
        std::fs::write(rt.join("schema.prisma"), "model User {}").unwrap();
        std::fs::write(rt.join("libquery_engine.so"), "ELF").unwrap();
        std::fs::write(rt.join("index.js"), "").unwrap();

        let out = temp_dir();
        std::fs::write(out.join("schema.prisma"), "stale").unwrap();

        let ctx = BuildContext::silent(&out);
        ctx.mark_patched(&out).await;

        let propagator = OutputPropagator::from_config(&PluginConfig::with_runtime_dir(&rt));
        let copied = propagator.propagate(&ctx, &out).await.unwrap();

        assert_eq!(copied, 2);
        assert_eq!(ctx.files_copied(), 2);
        assert_eq!(
            std::fs::read_to_string(out.join("schema.prisma")).unwrap(),
            "model User {}"
        );
        assert!(out.join("libquery_engine.so").exists());
        assert!(!out.join("index.js").exists());

        let _ = std::fs::remove_dir_all(&rt);
        let _ = std::fs::remove_dir_all(&out);
    }

    #[tokio::test]
    async fn failed_copy_names_the_file() {
        let rt = temp_dir();
        std::fs::write(rt.join("schema.prisma"), "").unwrap();

        // Output root that does not exist makes every copy fail.
        let out = temp_dir().join("gone");
        let ctx = BuildContext::silent(&out);
        ctx.mark_patched(&out).await;

        let propagator = OutputPropagator::from_config(&PluginConfig::with_runtime_dir(&rt));
        let err = propagator.propagate(&ctx, &out).await.unwrap_err();

        match err {
            ShipfilesError::Copy { file, .. } => assert_eq!(file, rt.join("schema.prisma")),
            other => panic!("expected copy error, got {other}"),
        }

        let _ = std::fs::remove_dir_all(&rt);
    }
}
