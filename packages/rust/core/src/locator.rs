//! Runtime file discovery.
//!
//! Finds the directory holding the runtime component's generated files and
//! filters its entries down to the ones that must ship with the build. Both
//! steps hit the filesystem on every call; the directory's contents depend on
//! the platform the runtime was generated for, so nothing is cached.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};

use shipfiles_shared::{
    PluginConfig, Result, RuntimeFileSet, RuntimeSource, ShipfilesError, ShippablePattern,
};

/// Locates and lists shippable runtime files.
#[derive(Debug, Clone)]
pub struct RuntimeFileLocator {
    source: RuntimeSource,
    pattern: ShippablePattern,
}

impl RuntimeFileLocator {
    pub fn new(source: RuntimeSource, pattern: ShippablePattern) -> Self {
        Self { source, pattern }
    }

    pub fn from_config(config: &PluginConfig) -> Self {
        Self::new(config.source.clone(), config.pattern.clone())
    }

    /// Resolve the runtime directory.
    ///
    /// Fails with [`ShipfilesError::Resolution`] when the directory, or the
    /// anchor package it is resolved from, cannot be found.
    #[instrument(skip_all)]
    pub async fn locate_runtime_directory(&self) -> Result<PathBuf> {
        match &self.source {
            RuntimeSource::Explicit(dir) => {
                if is_dir(dir).await {
                    Ok(dir.clone())
                } else {
                    Err(ShipfilesError::resolution(format!(
                        "runtime directory {} does not exist",
                        dir.display()
                    )))
                }
            }
            RuntimeSource::Package {
                project_root,
                anchor,
                package,
            } => {
                let root = tokio::fs::canonicalize(project_root).await.map_err(|e| {
                    ShipfilesError::resolution(format!(
                        "project root {} not found: {e}",
                        project_root.display()
                    ))
                })?;

                let anchor_link = resolve_package_dir(anchor, &root).await.ok_or_else(|| {
                    ShipfilesError::resolution(format!(
                        "package {anchor} not found from {}",
                        root.display()
                    ))
                })?;
                // Linked installs (pnpm, workspaces) keep the real package in a
                // store; resolution continues from there, not from the link.
                let anchor_dir = real_path(&anchor_link).await?;
                debug!(package = %anchor, dir = %anchor_dir.display(), "resolved anchor package");

                let runtime_link =
                    resolve_package_dir(package, &anchor_dir).await.ok_or_else(|| {
                        ShipfilesError::resolution(format!(
                            "package {package} not found from {anchor} at {}",
                            anchor_dir.display()
                        ))
                    })?;
                let runtime_dir = real_path(&runtime_link).await?;
                debug!(package = %package, dir = %runtime_dir.display(), "resolved runtime package");

                Ok(runtime_dir)
            }
        }
    }

    /// List the runtime directory's immediate entries whose names match the
    /// shippable pattern, in directory-listing order.
    ///
    /// No match is an empty set, not an error.
    #[instrument(skip_all)]
    pub async fn list_shippable_files(&self) -> Result<RuntimeFileSet> {
        let dir = self.locate_runtime_directory().await?;
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| ShipfilesError::io(&dir, e))?;

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ShipfilesError::io(&dir, e))?
        {
            let path = entry.path();
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                warn!(path = %path.display(), "skipping non UTF-8 file name");
                continue;
            };

            if !self.pattern.is_match(&name) {
                continue;
            }

            // Follows symlinks; package managers often link engine binaries.
            let meta = tokio::fs::metadata(&path)
                .await
                .map_err(|e| ShipfilesError::io(&path, e))?;
            if !meta.is_file() {
                debug!(name = %name, "skipping matching non-file entry");
                continue;
            }

            files.push(name);
        }

        debug!(dir = %dir.display(), count = files.len(), "listed shippable files");
        Ok(RuntimeFileSet::new(dir, files))
    }
}

/// Find `<ancestor>/node_modules/<package>` walking upward from `from`.
///
/// Ancestors that are themselves `node_modules` directories are skipped, so
/// resolving from inside an installed package never probes
/// `node_modules/node_modules`.
pub async fn resolve_package_dir(package: &str, from: &Path) -> Option<PathBuf> {
    for ancestor in from.ancestors() {
        if ancestor.file_name().is_some_and(|n| n == "node_modules") {
            continue;
        }

        let candidate = package
            .split('/')
            .fold(ancestor.join("node_modules"), |acc, part| acc.join(part));

        if is_dir(&candidate).await {
            return Some(candidate);
        }
    }
    None
}

async fn real_path(path: &Path) -> Result<PathBuf> {
    tokio::fs::canonicalize(path).await.map_err(|e| {
        ShipfilesError::resolution(format!("cannot resolve {}: {e}", path.display()))
    })
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sf-locator-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), name).unwrap();
    }

    #[tokio::test]
    async fn filters_by_pattern() {
        let tmp = temp_dir();
        touch(&tmp, "schema.prisma");
        touch(&tmp, "README.md");
        touch(&tmp, "query_engine-darwin.node");

        let locator =
            RuntimeFileLocator::new(RuntimeSource::Explicit(tmp.clone()), Default::default());
        let set = locator.list_shippable_files().await.unwrap();

        let mut files = set.files().to_vec();
        files.sort();
        assert_eq!(files, vec!["query_engine-darwin.node", "schema.prisma"]);
        assert_eq!(set.dir(), tmp.as_path());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn no_match_is_empty_not_error() {
        let tmp = temp_dir();
        touch(&tmp, "index.js");
        touch(&tmp, "package.json");

        let locator =
            RuntimeFileLocator::new(RuntimeSource::Explicit(tmp.clone()), Default::default());
        let set = locator.list_shippable_files().await.unwrap();
        assert!(set.is_empty());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn matching_directories_are_skipped() {
        let tmp = temp_dir();
        touch(&tmp, "schema.prisma");
        std::fs::create_dir_all(tmp.join("engines")).unwrap();

        let locator =
            RuntimeFileLocator::new(RuntimeSource::Explicit(tmp.clone()), Default::default());
        let set = locator.list_shippable_files().await.unwrap();
        assert_eq!(set.files(), ["schema.prisma".to_string()]);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinked_engine_is_listed() {
        let store = temp_dir();
        touch(&store, "libquery_engine-linux.so.node");

        let tmp = temp_dir();
        touch(&tmp, "schema.prisma");
        std::os::unix::fs::symlink(
            store.join("libquery_engine-linux.so.node"),
            tmp.join("libquery_engine-linux.so.node"),
        )
        .unwrap();
        // Dangling links that do not match the pattern are never inspected.
        std::os::unix::fs::symlink(store.join("gone"), tmp.join("index.js")).unwrap();

        let locator =
            RuntimeFileLocator::new(RuntimeSource::Explicit(tmp.clone()), Default::default());
        let set = locator.list_shippable_files().await.unwrap();

        let mut files = set.files().to_vec();
        files.sort();
        assert_eq!(files, vec!["libquery_engine-linux.so.node", "schema.prisma"]);

        let _ = std::fs::remove_dir_all(&tmp);
        let _ = std::fs::remove_dir_all(&store);
    }

    #[tokio::test]
    async fn custom_pattern() {
        let tmp = temp_dir();
        touch(&tmp, "schema.prisma");
        touch(&tmp, "query_compiler_bg.wasm");

        let pattern = ShippablePattern::new(r"\.wasm$").unwrap();
        let locator = RuntimeFileLocator::new(RuntimeSource::Explicit(tmp.clone()), pattern);
        let set = locator.list_shippable_files().await.unwrap();
        assert_eq!(set.files(), ["query_compiler_bg.wasm".to_string()]);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn missing_explicit_dir_is_resolution_error() {
        let tmp = temp_dir();
        let locator = RuntimeFileLocator::new(
            RuntimeSource::Explicit(tmp.join("nope")),
            Default::default(),
        );
        let err = locator.list_shippable_files().await.unwrap_err();
        assert!(matches!(err, ShipfilesError::Resolution { .. }));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn resolves_runtime_package_from_anchor() {
        let tmp = temp_dir();
        // Hoisted layout: both packages live in the project's node_modules.
        let anchor = tmp.join("node_modules/@prisma/client");
        let runtime = tmp.join("node_modules/.prisma/client");
        std::fs::create_dir_all(&anchor).unwrap();
        std::fs::create_dir_all(&runtime).unwrap();
        let app = tmp.join("packages/service");
        std::fs::create_dir_all(&app).unwrap();

        let locator = RuntimeFileLocator::new(RuntimeSource::from_project(&app), Default::default());
        let dir = locator.locate_runtime_directory().await.unwrap();
        assert_eq!(dir, std::fs::canonicalize(&runtime).unwrap());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn nested_runtime_package_wins() {
        let tmp = temp_dir();
        let anchor = tmp.join("node_modules/@prisma/client");
        let nested = anchor.join("node_modules/.prisma/client");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::create_dir_all(tmp.join("node_modules/.prisma/client")).unwrap();

        let locator = RuntimeFileLocator::new(RuntimeSource::from_project(&tmp), Default::default());
        let dir = locator.locate_runtime_directory().await.unwrap();
        assert_eq!(dir, std::fs::canonicalize(&nested).unwrap());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinked_anchor_resolves_from_its_real_location() {
        let tmp = temp_dir();
        // pnpm layout: the top-level package is a link into the store, and the
        // generated runtime package sits beside the real anchor.
        let store = tmp.join("node_modules/.pnpm/@prisma+client@5/node_modules");
        let real_anchor = store.join("@prisma/client");
        let runtime = store.join(".prisma/client");
        std::fs::create_dir_all(&real_anchor).unwrap();
        std::fs::create_dir_all(&runtime).unwrap();
        std::fs::create_dir_all(tmp.join("node_modules/@prisma")).unwrap();
        std::os::unix::fs::symlink(&real_anchor, tmp.join("node_modules/@prisma/client"))
            .unwrap();

        let locator = RuntimeFileLocator::new(RuntimeSource::from_project(&tmp), Default::default());
        let dir = locator.locate_runtime_directory().await.unwrap();
        assert_eq!(dir, std::fs::canonicalize(&runtime).unwrap());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinked_runtime_package_is_returned_as_real_path() {
        let tmp = temp_dir();
        let generated = tmp.join("generated/client");
        std::fs::create_dir_all(&generated).unwrap();
        std::fs::create_dir_all(tmp.join("node_modules/@prisma/client")).unwrap();
        std::fs::create_dir_all(tmp.join("node_modules/.prisma")).unwrap();
        std::os::unix::fs::symlink(&generated, tmp.join("node_modules/.prisma/client")).unwrap();

        let locator = RuntimeFileLocator::new(RuntimeSource::from_project(&tmp), Default::default());
        let dir = locator.locate_runtime_directory().await.unwrap();
        assert_eq!(dir, std::fs::canonicalize(&generated).unwrap());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn missing_anchor_is_resolution_error() {
        let tmp = temp_dir();
        let locator = RuntimeFileLocator::new(RuntimeSource::from_project(&tmp), Default::default());
        let err = locator.locate_runtime_directory().await.unwrap_err();
        assert!(matches!(err, ShipfilesError::Resolution { .. }));
        assert!(err.to_string().contains("@prisma/client"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn missing_runtime_package_is_resolution_error() {
        let tmp = temp_dir();
        std::fs::create_dir_all(tmp.join("node_modules/@prisma/client")).unwrap();

        let locator = RuntimeFileLocator::new(RuntimeSource::from_project(&tmp), Default::default());
        let err = locator.locate_runtime_directory().await.unwrap_err();
        assert!(err.to_string().contains(".prisma/client"));

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
