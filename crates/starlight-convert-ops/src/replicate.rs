//! Structural mirroring of a source tree into the target location.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::walk::{walk, EntryKind};
use crate::OperationError;

/// Counts reported by [`replicate_tree`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ReplicateStats {
    pub files_copied: usize,
    pub directories_created: usize,
}

/// Copy every file under `source_root` byte-for-byte to the mirrored path
/// under `target_root`, overwriting existing files and creating directories
/// as needed. The target root is always created; a missing source root
/// copies nothing.
pub fn replicate_tree(
    source_root: &Path,
    target_root: &Path,
) -> Result<ReplicateStats, OperationError> {
    let mut stats = ReplicateStats::default();
    ensure_dir(target_root, &mut stats)?;

    if !source_root.is_dir() {
        tracing::warn!(
            source = %source_root.display(),
            "source folder does not exist, nothing to copy"
        );
        return Ok(stats);
    }

    for entry in walk(source_root, true) {
        let entry = entry?;
        let relative = entry.dir.strip_prefix(source_root).unwrap_or(Path::new(""));
        let destination = target_root.join(relative).join(&entry.name);

        match entry.kind {
            EntryKind::File => {
                let source = entry.path();
                fs::copy(&source, &destination).map_err(|err| OperationError::Io {
                    path: destination.clone(),
                    source: err,
                })?;
                stats.files_copied += 1;
            }
            EntryKind::Directory => ensure_dir(&destination, &mut stats)?,
        }
    }

    Ok(stats)
}

fn ensure_dir(path: &Path, stats: &mut ReplicateStats) -> Result<(), OperationError> {
    if path.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(path).map_err(|source| OperationError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    stats.directories_created += 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn mirrors_files_and_directories() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("hugo/content");
        let target = dir.path().join("starlight/bff/v3");
        fs::create_dir_all(source.join("guide/images")).unwrap();
        fs::create_dir_all(source.join("empty")).unwrap();
        fs::write(source.join("_index.md"), "+++\ntitle = \"BFF\"\n+++\n").unwrap();
        fs::write(source.join("guide/images/logo.png"), [0u8, 159, 146, 150]).unwrap();

        let stats = replicate_tree(&source, &target).unwrap();

        assert_eq!(stats.files_copied, 2);
        assert_eq!(stats.directories_created, 4);
        assert_eq!(
            fs::read(target.join("guide/images/logo.png")).unwrap(),
            vec![0u8, 159, 146, 150]
        );
        assert!(target.join("empty").is_dir());
    }

    #[test]
    fn overwrites_existing_target_files() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src");
        let target = dir.path().join("dst");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&target).unwrap();
        fs::write(source.join("page.md"), "fresh").unwrap();
        fs::write(target.join("page.md"), "stale").unwrap();

        let stats = replicate_tree(&source, &target).unwrap();

        assert_eq!(stats.directories_created, 0);
        assert_eq!(fs::read_to_string(target.join("page.md")).unwrap(), "fresh");
    }

    #[test]
    fn missing_source_only_creates_the_target_root() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("dst");

        let stats = replicate_tree(&dir.path().join("absent"), &target).unwrap();

        assert_eq!(stats.files_copied, 0);
        assert_eq!(stats.directories_created, 1);
        assert!(target.is_dir());
    }
}
