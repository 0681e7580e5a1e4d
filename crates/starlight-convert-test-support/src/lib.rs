//! Shared fixture helpers for starlight-convert integration tests.

use std::fs;
use std::path::{Path, PathBuf};

use starlight_convert_config::{FolderMapping, MigrationConfig};
use tempfile::TempDir;

/// Write `contents` to `root/relative`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create fixture directories");
    }
    fs::write(&path, contents).expect("write fixture file");
    path
}

/// Read `root/relative` as UTF-8.
pub fn read_file(root: &Path, relative: &str) -> String {
    fs::read_to_string(root.join(relative))
        .unwrap_or_else(|err| panic!("read {relative}: {err}"))
}

/// A temporary Hugo source tree and an empty Starlight target tree.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Workspace {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Root of the Hugo documentation checkout.
    pub fn source_root(&self) -> PathBuf {
        self.dir.path().join("hugo")
    }

    /// Root of the Starlight `src/content/docs` tree.
    pub fn target_root(&self) -> PathBuf {
        self.dir.path().join("starlight")
    }

    /// Add a file below the Hugo checkout.
    pub fn source_file(&self, relative: &str, contents: &str) -> PathBuf {
        write_file(&self.source_root(), relative, contents)
    }

    /// Read a migrated file below the Starlight tree.
    pub fn target_file(&self, relative: &str) -> String {
        read_file(&self.target_root(), relative)
    }

    /// Migration config for this workspace with the given `(source, mount)` folders.
    pub fn config(&self, folders: &[(&str, &str)]) -> MigrationConfig {
        MigrationConfig::with_defaults(self.source_root(), self.target_root()).with_folders(
            folders
                .iter()
                .map(|(source, target)| FolderMapping::new(*source, target))
                .collect(),
        )
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}
