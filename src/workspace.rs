//! Output-directory management and Go source inspection.
//!
//! All generated files land under a single workspace root. Relative paths
//! coming out of LLM responses are untrusted: anything absolute or escaping
//! the root via `..` is rejected before a single byte is written.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};

use tracing::warn;

use crate::config::MarkerConfig;
use crate::error::{CodeGenerationError, ForgeError};
use crate::types::StructureAnalysis;

/// Subdirectories created up front for generated output.
pub const OUTPUT_DIRS: [&str; 4] = ["cmd", "collectors", "dashboards", "alerts"];

/// Where the dashboard definition is persisted, relative to the root.
pub const DASHBOARD_FILE: &str = "dashboards/dashboard.txt";

/// Where the alert rules are persisted, relative to the root.
pub const ALERTS_FILE: &str = "alerts/alerts.txt";

/// Source patterns that mark a file as registering Prometheus collectors.
pub const COLLECTOR_MARKERS: [&str; 3] = [
    "prometheus.NewGauge",
    "prometheus.NewCounter",
    "prometheus.NewHistogram",
];

/// `create_dir_all` that tolerates the directory already existing.
pub fn ensure_dir_all(path: &Path) -> std::io::Result<()> {
    match std::fs::create_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e),
    }
}

/// Handle to the output directory of one run.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root and the standard output subdirectories.
    pub fn prepare(&self) -> Result<(), ForgeError> {
        ensure_dir_all(&self.root).map_err(|e| ForgeError::io(&self.root, e))?;
        for dir in OUTPUT_DIRS {
            let path = self.root.join(dir);
            ensure_dir_all(&path).map_err(|e| ForgeError::io(&path, e))?;
        }
        Ok(())
    }

    /// Join an untrusted relative path onto the root.
    ///
    /// Rejects empty paths, absolute paths, and anything containing `..`.
    fn safe_join(&self, rel: &str) -> Result<PathBuf, CodeGenerationError> {
        let unsafe_path = || CodeGenerationError::UnsafePath {
            path: rel.to_string(),
        };
        if rel.trim().is_empty() {
            return Err(unsafe_path());
        }
        let rel_path = Path::new(rel);
        let escapes = rel_path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(unsafe_path());
        }
        Ok(self.root.join(rel_path))
    }

    /// Absolute location a relative path would land at. Does not validate.
    #[must_use]
    pub fn path_of(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Write one file under the root, creating parent directories.
    pub fn write_text(&self, rel: &str, content: &str) -> Result<PathBuf, ForgeError> {
        let path = self.safe_join(rel)?;
        if let Some(parent) = path.parent() {
            ensure_dir_all(parent).map_err(|e| ForgeError::io(parent, e))?;
        }
        std::fs::write(&path, content).map_err(|e| ForgeError::io(&path, e))?;
        Ok(path)
    }

    /// Write every file of an artifact; returns the absolute paths written.
    pub fn write_artifact(
        &self,
        files: &BTreeMap<String, String>,
    ) -> Result<Vec<PathBuf>, ForgeError> {
        let mut written = Vec::with_capacity(files.len());
        for (rel, content) in files {
            written.push(self.write_text(rel, content)?);
        }
        Ok(written)
    }

    pub fn read_to_string(&self, rel: &str) -> Result<String, ForgeError> {
        let path = self.safe_join(rel)?;
        std::fs::read_to_string(&path).map_err(|e| ForgeError::io(&path, e))
    }

    /// Best-effort removal; missing files are fine, other failures are logged.
    pub fn remove_file(&self, rel: &str) {
        let Ok(path) = self.safe_join(rel) else {
            return;
        };
        if let Err(e) = std::fs::remove_file(&path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "failed to remove file");
            }
        }
    }
}

/// Recursively load `.go` sources from an existing exporter directory.
///
/// Returns relative path → content. A missing or non-directory path yields
/// an empty map with a warning; unreadable entries are skipped the same way.
/// The caller decides whether an empty result is fatal.
#[must_use]
pub fn load_existing_sources(path: &Path) -> BTreeMap<String, String> {
    let mut files = BTreeMap::new();
    if !path.is_dir() {
        warn!(path = %path.display(), "existing exporter path is not a directory");
        return files;
    }
    collect_go_files(path, path, &mut files);
    files
}

fn collect_go_files(base: &Path, dir: &Path, files: &mut BTreeMap<String, String>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "skipping unreadable directory");
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_go_files(base, &path, files);
        } else if path.extension().is_some_and(|ext| ext == "go") {
            match std::fs::read_to_string(&path) {
                Ok(content) => {
                    let rel = path
                        .strip_prefix(base)
                        .unwrap_or(&path)
                        .to_string_lossy()
                        .replace('\\', "/");
                    files.insert(rel, content);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable file"),
            }
        }
    }
}

/// Derive entry point, collector files, package name and imports from
/// existing sources. Purely textual; no Go parser involved.
#[must_use]
pub fn analyze_structure(
    files: &BTreeMap<String, String>,
    markers: &MarkerConfig,
) -> StructureAnalysis {
    let mut analysis = StructureAnalysis::default();
    for (rel, content) in files {
        if analysis.main_file.is_none() && content.contains(&markers.entry_marker) {
            analysis.main_file = Some(rel.clone());
            analysis.package_name = package_of(content);
        }
        if COLLECTOR_MARKERS
            .iter()
            .any(|marker| content.contains(marker))
        {
            analysis.collector_files.push(rel.clone());
        }
        collect_imports(content, &mut analysis.imports);
    }
    analysis
}

fn package_of(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        line.trim()
            .strip_prefix("package ")
            .map(|name| name.trim().to_string())
    })
}

fn collect_imports(content: &str, imports: &mut BTreeSet<String>) {
    let mut in_block = false;
    for line in content.lines() {
        let trimmed = line.trim();
        if in_block {
            if trimmed.starts_with(')') {
                in_block = false;
            } else if let Some(path) = quoted_import(trimmed) {
                imports.insert(path);
            }
        } else if trimmed.starts_with("import (") {
            in_block = true;
        } else if let Some(rest) = trimmed.strip_prefix("import ") {
            if let Some(path) = quoted_import(rest) {
                imports.insert(path);
            }
        }
    }
}

fn quoted_import(line: &str) -> Option<String> {
    let start = line.find('"')?;
    let rest = &line[start + 1..];
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}
