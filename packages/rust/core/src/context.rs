//! Per-compilation state shared by the patch and propagate stages.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Mutex;

use crate::pipeline::{ProgressReporter, SilentProgress};

/// State for exactly one compilation.
///
/// Created by the host driver before the assets-ready stage and dropped
/// after the done stage, so nothing leaks between builds of a long-lived
/// (watch mode) process.
pub struct BuildContext {
    output_root: PathBuf,
    /// Output roots with at least one patched manifest.
    dirty: Mutex<HashSet<PathBuf>>,
    manifests_patched: AtomicUsize,
    files_copied: AtomicUsize,
    progress: Arc<dyn ProgressReporter>,
}

impl BuildContext {
    pub fn new(output_root: impl Into<PathBuf>, progress: Arc<dyn ProgressReporter>) -> Self {
        Self {
            output_root: output_root.into(),
            dirty: Mutex::new(HashSet::new()),
            manifests_patched: AtomicUsize::new(0),
            files_copied: AtomicUsize::new(0),
            progress,
        }
    }

    /// Context without progress reporting.
    pub fn silent(output_root: impl Into<PathBuf>) -> Self {
        Self::new(output_root, Arc::new(SilentProgress))
    }

    /// The directory this compilation emits into.
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn progress(&self) -> &dyn ProgressReporter {
        self.progress.as_ref()
    }

    /// Record that a manifest under `output_root` was patched.
    ///
    /// Set-union semantics: concurrent callers never lose each other's marks.
    /// Returns `true` when this is the first mark for the root.
    pub async fn mark_patched(&self, output_root: &Path) -> bool {
        self.manifests_patched.fetch_add(1, Ordering::Relaxed);
        self.dirty.lock().await.insert(output_root.to_path_buf())
    }

    /// Whether any manifest under `output_root` was patched in this build.
    pub async fn is_patched(&self, output_root: &Path) -> bool {
        self.dirty.lock().await.contains(output_root)
    }

    /// All dirty output roots, sorted.
    pub async fn dirty_roots(&self) -> Vec<PathBuf> {
        let mut roots: Vec<_> = self.dirty.lock().await.iter().cloned().collect();
        roots.sort();
        roots
    }

    pub(crate) fn record_copy(&self) {
        self.files_copied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn manifests_patched(&self) -> usize {
        self.manifests_patched.load(Ordering::Relaxed)
    }

    pub fn files_copied(&self) -> usize {
        self.files_copied.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildContext")
            .field("output_root", &self.output_root)
            .field("manifests_patched", &self.manifests_patched())
            .field("files_copied", &self.files_copied())
            .finish_non_exhaustive()
    }
}
