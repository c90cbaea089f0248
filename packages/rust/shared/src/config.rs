//! Project configuration for shipfiles.
//!
//! Config lives next to the project as `shipfiles.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShipfilesError};
use crate::types::{
    DEFAULT_ANCHOR_PACKAGE, DEFAULT_MANIFEST_SUFFIX, DEFAULT_RUNTIME_PACKAGE,
    DEFAULT_SHIPPABLE_PATTERN, DEFAULT_TRACE_FIELD, RuntimeSource, ShippablePattern,
};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "shipfiles.toml";

// ---------------------------------------------------------------------------
// Config structs (matching shipfiles.toml schema)
// ---------------------------------------------------------------------------

/// Top-level project config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Runtime directory resolution.
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Shippable file selection.
    #[serde(default)]
    pub files: FilesConfig,

    /// Trace manifest conventions.
    #[serde(default)]
    pub manifest: ManifestConfig,
}

/// `[runtime]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Explicit runtime directory. Skips package resolution when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,

    /// Package whose install location anchors the search.
    #[serde(default = "default_anchor_package")]
    pub anchor_package: String,

    /// Generated runtime package, resolved from the anchor.
    #[serde(default = "default_runtime_package")]
    pub package: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            dir: None,
            anchor_package: default_anchor_package(),
            package: default_runtime_package(),
        }
    }
}

fn default_anchor_package() -> String {
    DEFAULT_ANCHOR_PACKAGE.into()
}
fn default_runtime_package() -> String {
    DEFAULT_RUNTIME_PACKAGE.into()
}

/// `[files]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesConfig {
    /// Regex matched anywhere in a runtime file name.
    #[serde(default = "default_pattern")]
    pub pattern: String,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            pattern: default_pattern(),
        }
    }
}

fn default_pattern() -> String {
    DEFAULT_SHIPPABLE_PATTERN.into()
}

/// `[manifest]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestConfig {
    /// Reserved artifact suffix identifying trace manifests.
    #[serde(default = "default_suffix")]
    pub suffix: String,

    /// Field holding the ordered trace list.
    #[serde(default = "default_trace_field")]
    pub trace_field: String,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            suffix: default_suffix(),
            trace_field: default_trace_field(),
        }
    }
}

fn default_suffix() -> String {
    DEFAULT_MANIFEST_SUFFIX.into()
}
fn default_trace_field() -> String {
    DEFAULT_TRACE_FIELD.into()
}

// ---------------------------------------------------------------------------
// Plugin config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime plugin configuration with the pattern compiled and the
/// runtime source decided.
#[derive(Debug, Clone)]
pub struct PluginConfig {
    /// Where to find the runtime files.
    pub source: RuntimeSource,
    /// Which runtime files to ship.
    pub pattern: ShippablePattern,
    /// Reserved trace manifest suffix.
    pub manifest_suffix: String,
    /// Trace-list field name.
    pub trace_field: String,
}

impl PluginConfig {
    /// Default conventions with an explicitly supplied runtime directory.
    pub fn with_runtime_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            source: RuntimeSource::Explicit(dir.into()),
            pattern: ShippablePattern::default(),
            manifest_suffix: DEFAULT_MANIFEST_SUFFIX.into(),
            trace_field: DEFAULT_TRACE_FIELD.into(),
        }
    }

    /// Build the runtime config from a file config. Relative paths are
    /// taken from `project_root`.
    pub fn from_app(config: &AppConfig, project_root: &Path) -> Result<Self> {
        let source = match &config.runtime.dir {
            Some(dir) => RuntimeSource::Explicit(project_root.join(dir)),
            None => RuntimeSource::Package {
                project_root: project_root.to_path_buf(),
                anchor: config.runtime.anchor_package.clone(),
                package: config.runtime.package.clone(),
            },
        };

        if config.manifest.suffix.is_empty() {
            return Err(ShipfilesError::config("manifest suffix must not be empty"));
        }
        if config.manifest.trace_field.is_empty() {
            return Err(ShipfilesError::config("trace field must not be empty"));
        }

        Ok(Self {
            source,
            pattern: ShippablePattern::new(&config.files.pattern)?,
            manifest_suffix: config.manifest.suffix.clone(),
            trace_field: config.manifest.trace_field.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Path of the config file for a project.
pub fn config_file_path(project_root: &Path) -> PathBuf {
    project_root.join(CONFIG_FILE_NAME)
}

/// Load the project config. Returns defaults if the file does not exist.
pub fn load_project_config(project_root: &Path) -> Result<AppConfig> {
    let path = config_file_path(project_root);

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ShipfilesError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| ShipfilesError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Write a default config file into the project. Returns its path.
pub fn init_config(project_root: &Path) -> Result<PathBuf> {
    let path = config_file_path(project_root);
    if path.exists() {
        return Err(ShipfilesError::config(format!(
            "{} already exists",
            path.display()
        )));
    }

    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| ShipfilesError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ShipfilesError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
