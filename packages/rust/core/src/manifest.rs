//! Trace manifest patching.
//!
//! A trace manifest (`*.nft.json`) lists every file a build artifact needs at
//! runtime, relative to the manifest's own directory. Runtime files loaded
//! dynamically are invisible to the bundler's tracer, so they are appended
//! here pointing at the copies the propagator places in the output root.
//!
//! Patching is parse → [`append_trace_entries`] → serialize → replace. Running
//! it twice on the same artifact appends duplicates; it runs once per
//! artifact per build, from the assets-ready stage only.

use std::path::{Component, Path, PathBuf};

use serde_json::Value;
use tracing::{debug, instrument};

use shipfiles_shared::{PluginConfig, Result, RuntimeFileSet, ShipfilesError};

use crate::context::BuildContext;
use crate::hooks::AssetStore;
use crate::locator::RuntimeFileLocator;

/// Appends runtime files to trace manifests.
#[derive(Debug, Clone)]
pub struct ManifestPatcher {
    locator: RuntimeFileLocator,
    suffix: String,
    trace_field: String,
}

impl ManifestPatcher {
    pub fn new(
        locator: RuntimeFileLocator,
        suffix: impl Into<String>,
        trace_field: impl Into<String>,
    ) -> Self {
        Self {
            locator,
            suffix: suffix.into(),
            trace_field: trace_field.into(),
        }
    }

    pub fn from_config(config: &PluginConfig) -> Self {
        Self::new(
            RuntimeFileLocator::from_config(config),
            config.manifest_suffix.clone(),
            config.trace_field.clone(),
        )
    }

    /// Artifact names ending in the manifest suffix, in input order.
    pub fn select_manifest_artifacts<I, S>(&self, artifact_names: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        artifact_names
            .into_iter()
            .filter(|name| name.as_ref().ends_with(&self.suffix))
            .map(|name| name.as_ref().to_string())
            .collect()
    }

    /// Patch one manifest artifact and mark `output_root` dirty.
    ///
    /// A manifest that is not JSON, or lacks a string-array trace field,
    /// fails with [`ShipfilesError::MalformedManifest`] before anything is
    /// replaced.
    #[instrument(skip_all, fields(artifact = %artifact_name))]
    pub async fn patch(
        &self,
        assets: &dyn AssetStore,
        artifact_name: &str,
        output_root: &Path,
        ctx: &BuildContext,
    ) -> Result<()> {
        let manifest_dir = manifest_dir(output_root, artifact_name);
        let files = self.locator.list_shippable_files().await?;

        let source = assets.get_asset(artifact_name).await?;
        let mut doc: Value = serde_json::from_slice(&source)
            .map_err(|e| ShipfilesError::malformed(artifact_name, e.to_string()))?;

        let entries = trace_entries(&files, output_root, &manifest_dir);
        append_trace_entries(&mut doc, &self.trace_field, &entries)
            .map_err(|msg| ShipfilesError::malformed(artifact_name, msg))?;

        let updated = serde_json::to_vec(&doc)
            .map_err(|e| ShipfilesError::malformed(artifact_name, e.to_string()))?;
        assets.update_asset(artifact_name, updated).await?;

        ctx.mark_patched(output_root).await;
        ctx.progress().manifest_patched(artifact_name);
        debug!(appended = entries.len(), "patched manifest");
        Ok(())
    }
}

/// Directory containing the manifest `artifact_name` under `output_root`.
pub fn manifest_dir(output_root: &Path, artifact_name: &str) -> PathBuf {
    let path = output_root.join(artifact_name);
    path.parent().map(Path::to_path_buf).unwrap_or(path)
}

/// Trace entries for every shippable file, each pointing at the file's
/// propagated copy `<output_root>/<name>` relative to `manifest_dir`.
pub fn trace_entries(files: &RuntimeFileSet, output_root: &Path, manifest_dir: &Path) -> Vec<String> {
    files
        .files()
        .iter()
        .map(|name| relative_path(manifest_dir, &output_root.join(name)))
        .collect()
}

/// Append `entries` to the string array `doc[field]`, leaving every other
/// field and the existing entries untouched.
pub fn append_trace_entries(
    doc: &mut Value,
    field: &str,
    entries: &[String],
) -> std::result::Result<(), String> {
    let obj = doc
        .as_object_mut()
        .ok_or_else(|| "manifest is not a JSON object".to_string())?;
    let list = obj
        .get_mut(field)
        .ok_or_else(|| format!("missing trace field {field:?}"))?
        .as_array_mut()
        .ok_or_else(|| format!("trace field {field:?} is not an array"))?;

    if let Some(bad) = list.iter().position(|v| !v.is_string()) {
        return Err(format!("trace field {field:?} has a non-string entry at {bad}"));
    }

    list.extend(entries.iter().cloned().map(Value::String));
    Ok(())
}

/// Lexical path from directory `from` to `to`, `/`-separated.
///
/// Neither path is touched on disk. `.` and `..` components are folded
/// before comparing.
pub fn relative_path(from: &Path, to: &Path) -> String {
    let from = normalize(from);
    let to = normalize(to);

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = std::iter::repeat_n("..".to_string(), from.len() - common).collect();
    parts.extend(to[common..].iter().cloned());

    if parts.is_empty() {
        ".".into()
    } else {
        parts.join("/")
    }
}

fn normalize(path: &Path) -> Vec<String> {
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.last().is_some_and(|p| p != ".." && !p.is_empty()) {
                    parts.pop();
                } else if parts.first().is_none_or(|p| p == "..") {
                    parts.push("..".into());
                }
            }
            Component::RootDir => parts.push(String::new()),
            Component::Prefix(prefix) => {
                parts.push(prefix.as_os_str().to_string_lossy().into_owned())
            }
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
        }
    }
    parts
}
