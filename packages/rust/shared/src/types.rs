//! Core domain types shared by the locator, patcher, and propagator.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Result, ShipfilesError};

/// Default reserved suffix of trace manifests.
pub const DEFAULT_MANIFEST_SUFFIX: &str = ".nft.json";

/// Default name of the trace-list field inside a manifest.
pub const DEFAULT_TRACE_FIELD: &str = "files";

/// Default shippable-file pattern: the schema definition or any engine binary.
pub const DEFAULT_SHIPPABLE_PATTERN: &str = r"schema\.prisma|engine";

/// Package whose install location anchors runtime resolution.
pub const DEFAULT_ANCHOR_PACKAGE: &str = "@prisma/client";

/// Generated runtime package, resolved relative to the anchor.
pub const DEFAULT_RUNTIME_PACKAGE: &str = ".prisma/client";

// ---------------------------------------------------------------------------
// RuntimeSource
// ---------------------------------------------------------------------------

/// Where the runtime component's generated files live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeSource {
    /// A directory supplied directly by the caller.
    Explicit(PathBuf),
    /// Resolve `package` from the install location of `anchor`, searching
    /// `node_modules` directories upward from `project_root`.
    Package {
        project_root: PathBuf,
        anchor: String,
        package: String,
    },
}

impl RuntimeSource {
    /// Package resolution with the default anchor and runtime package names.
    pub fn from_project(project_root: impl Into<PathBuf>) -> Self {
        Self::Package {
            project_root: project_root.into(),
            anchor: DEFAULT_ANCHOR_PACKAGE.into(),
            package: DEFAULT_RUNTIME_PACKAGE.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ShippablePattern
// ---------------------------------------------------------------------------

/// Name filter selecting which runtime files must travel with the build.
///
/// A name is shippable when the pattern matches anywhere inside it.
#[derive(Debug, Clone)]
pub struct ShippablePattern(Regex);

impl ShippablePattern {
    /// Compile a pattern. Invalid expressions are configuration errors.
    pub fn new(pattern: &str) -> Result<Self> {
        Regex::new(pattern)
            .map(Self)
            .map_err(|e| ShipfilesError::config(format!("invalid file pattern {pattern:?}: {e}")))
    }

    /// Whether `file_name` should be shipped.
    pub fn is_match(&self, file_name: &str) -> bool {
        self.0.is_match(file_name)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Default for ShippablePattern {
    fn default() -> Self {
        static DEFAULT_RE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(DEFAULT_SHIPPABLE_PATTERN).expect("valid regex"));
        Self(DEFAULT_RE.clone())
    }
}

// ---------------------------------------------------------------------------
// RuntimeFileSet
// ---------------------------------------------------------------------------

/// Shippable file names found in a single runtime directory.
///
/// Names keep directory-listing order and are unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeFileSet {
    dir: PathBuf,
    files: Vec<String>,
}

impl RuntimeFileSet {
    pub fn new(dir: impl Into<PathBuf>, files: Vec<String>) -> Self {
        Self {
            dir: dir.into(),
            files,
        }
    }

    /// The runtime directory the names are relative to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Absolute location of `name` inside the runtime directory.
    pub fn source_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}
