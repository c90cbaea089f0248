//! [`AssetStore`] implementations: in-memory and emitted-on-disk.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use shipfiles_shared::{Result, ShipfilesError};

use crate::hooks::AssetStore;

// ---------------------------------------------------------------------------
// MemoryAssets
// ---------------------------------------------------------------------------

/// Artifacts held in memory until emission.
#[derive(Debug, Default)]
pub struct MemoryAssets {
    assets: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with_asset(mut self, name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.assets.get_mut().insert(name.into(), contents.into());
        self
    }

}

#[async_trait]
impl AssetStore for MemoryAssets {
    async fn asset_names(&self) -> Result<Vec<String>> {
        Ok(self.assets.lock().await.keys().cloned().collect())
    }

    async fn get_asset(&self, name: &str) -> Result<Vec<u8>> {
        self.assets
            .lock()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| ShipfilesError::Asset(format!("unknown asset {name}")))
    }

    async fn update_asset(&self, name: &str, contents: Vec<u8>) -> Result<()> {
        let mut assets = self.assets.lock().await;
        match assets.get_mut(name) {
            Some(slot) => {
                *slot = contents;
                Ok(())
            }
            None => Err(ShipfilesError::Asset(format!("unknown asset {name}"))),
        }
    }

    async fn emit(&self, output_root: &Path) -> Result<()> {
        let snapshot = self.assets.lock().await.clone();
        for (name, contents) in &snapshot {
            let target = asset_path(output_root, name)?;
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| ShipfilesError::io(parent, e))?;
            }
            write_atomic(&target, contents).await?;
        }
        debug!(count = snapshot.len(), root = %output_root.display(), "emitted assets");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DiskAssets
// ---------------------------------------------------------------------------

/// Artifacts of a build that was already emitted to `root`.
#[derive(Debug, Clone)]
pub struct DiskAssets {
    root: PathBuf,
}

impl DiskAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl AssetStore for DiskAssets {
    async fn asset_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .map_err(|e| ShipfilesError::io(&dir, e))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| ShipfilesError::io(&dir, e))?
            {
                let path = entry.path();
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| ShipfilesError::io(&path, e))?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if let Some(name) = relative_name(&self.root, &path) {
                    names.push(name);
                }
            }
        }

        names.sort();
        Ok(names)
    }

    async fn get_asset(&self, name: &str) -> Result<Vec<u8>> {
        let path = asset_path(&self.root, name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ShipfilesError::Asset(format!("unknown asset {name}")))
            }
            Err(e) => Err(ShipfilesError::io(&path, e)),
        }
    }

    async fn update_asset(&self, name: &str, contents: Vec<u8>) -> Result<()> {
        let path = asset_path(&self.root, name)?;
        if tokio::fs::metadata(&path).await.is_err() {
            return Err(ShipfilesError::Asset(format!("unknown asset {name}")));
        }
        write_atomic(&path, &contents).await
    }

    async fn emit(&self, output_root: &Path) -> Result<()> {
        // Content is already on disk.
        debug!(root = %self.root.display(), output_root = %output_root.display(), "assets already emitted");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map an artifact name onto a path under `root`, rejecting names that
/// would escape it.
pub(crate) fn asset_path(root: &Path, name: &str) -> Result<PathBuf> {
    let rel = Path::new(name);
    let escapes = rel
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if name.is_empty() || escapes {
        return Err(ShipfilesError::Asset(format!("invalid asset name {name:?}")));
    }
    Ok(root.join(rel))
}

/// `/`-joined name of `path` relative to `root`.
fn relative_name(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = rel.components().map(|c| c.as_os_str().to_str()).collect();
    Some(parts?.join("/"))
}

/// Write `contents` to a dot-prefixed temp file beside `target`, then
/// rename it over `target`.
pub(crate) async fn write_atomic(target: &Path, contents: &[u8]) -> Result<()> {
    let file_name = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ShipfilesError::Asset(format!("invalid target {}", target.display())))?;
    let temp = target.with_file_name(format!(".{file_name}.tmp"));

    if let Err(e) = tokio::fs::write(&temp, contents).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(ShipfilesError::io(&temp, e));
    }

    if let Err(e) = tokio::fs::rename(&temp, target).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(ShipfilesError::io(target, e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sf-assets-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn memory_get_and_update() {
        let assets = MemoryAssets::new().with_asset("app.nft.json", "{}");
        assert_eq!(assets.get_asset("app.nft.json").await.unwrap(), b"{}");

        assets
            .update_asset("app.nft.json", b"{\"files\":[]}".to_vec())
            .await
            .unwrap();
        assert_eq!(
            assets.get_asset("app.nft.json").await.unwrap(),
            b"{\"files\":[]}"
        );
    }

    #[tokio::test]
    async fn memory_unknown_asset() {
        let assets = MemoryAssets::new();
        assert!(matches!(
            assets.get_asset("missing.js").await,
            Err(ShipfilesError::Asset(_))
        ));
        assert!(assets.update_asset("missing.js", vec![]).await.is_err());
    }

    #[tokio::test]
    async fn memory_emit_writes_nested_files() {
        let tmp = temp_dir();
        let assets = MemoryAssets::new()
            .with_asset("server.js", "module.exports = {}")
            .with_asset("server/app/page.js.nft.json", "{\"files\":[]}");

        assets.emit(&tmp).await.unwrap();

        assert!(tmp.join("server.js").exists());
        let manifest = std::fs::read_to_string(tmp.join("server/app/page.js.nft.json")).unwrap();
        assert_eq!(manifest, "{\"files\":[]}");

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn disk_names_are_relative_and_slash_separated() {
        let tmp = temp_dir();
        std::fs::create_dir_all(tmp.join("server/pages")).unwrap();
        std::fs::write(tmp.join("server.js"), "").unwrap();
        std::fs::write(tmp.join("server/pages/index.js.nft.json"), "{}").unwrap();

        let assets = DiskAssets::new(&tmp);
        let names = assets.asset_names().await.unwrap();
        assert_eq!(names, vec!["server.js", "server/pages/index.js.nft.json"]);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn disk_update_leaves_no_temp_files() {
        let tmp = temp_dir();
        std::fs::write(tmp.join("app.nft.json"), "{}").unwrap();

        let assets = DiskAssets::new(&tmp);
        assets
            .update_asset("app.nft.json", b"{\"files\":[\"a\"]}".to_vec())
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(tmp.join("app.nft.json")).unwrap(),
            "{\"files\":[\"a\"]}"
        );
        for entry in std::fs::read_dir(&tmp).unwrap() {
            let name = entry.unwrap().file_name().to_string_lossy().to_string();
            assert!(!name.starts_with('.'), "temp file left behind: {name}");
        }

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn failed_rename_removes_temp_file() {
        let tmp = temp_dir();
        // Renaming a file over a non-empty directory fails on every platform.
        let target = tmp.join("app.nft.json");
        std::fs::create_dir_all(target.join("occupied")).unwrap();

        let err = write_atomic(&target, b"{}").await.unwrap_err();
        assert!(matches!(err, ShipfilesError::Io { .. }));
        assert!(!tmp.join(".app.nft.json.tmp").exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn disk_rejects_escaping_names() {
        let tmp = temp_dir();
        let assets = DiskAssets::new(&tmp);
        assert!(assets.get_asset("../outside.json").await.is_err());
        assert!(assets.get_asset("/etc/passwd").await.is_err());
        let _ = std::fs::remove_dir_all(&tmp);
    }
}
