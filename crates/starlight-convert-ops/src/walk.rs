//! Lazy depth-first directory enumeration.
//!
//! Within a directory every file is reported before any subdirectory. Each
//! subdirectory is reported first and then, when walking recursively, fully
//! descended into before its next sibling. Siblings are sorted by name.

use std::cmp::Ordering;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::OperationError;

/// Kind of entry produced by [`walk`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EntryKind {
    File,
    Directory,
}

/// A file or directory, reported as its containing directory plus its name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WalkEntry {
    pub dir: PathBuf,
    pub name: String,
    pub kind: EntryKind,
}

impl WalkEntry {
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.name)
    }
}

/// Start a walk of `root`. A missing root produces an empty walk.
pub fn walk(root: impl Into<PathBuf>, recursive: bool) -> Walk {
    let root = root.into();
    let inner = root.is_dir().then(|| {
        WalkDir::new(&root)
            .min_depth(1)
            .max_depth(if recursive { usize::MAX } else { 1 })
            .follow_links(true)
            .sort_by(files_first)
            .into_iter()
    });
    Walk { root, inner }
}

fn files_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

/// Iterator returned by [`walk`]. Directories are listed only when reached.
pub struct Walk {
    root: PathBuf,
    inner: Option<walkdir::IntoIter>,
}

impl Iterator for Walk {
    type Item = Result<WalkEntry, OperationError>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.inner.as_mut()?.next()?;
        Some(entry.map(to_entry).map_err(|err| {
            let path = err.path().unwrap_or(&self.root).to_path_buf();
            OperationError::Io {
                path,
                source: io::Error::from(err),
            }
        }))
    }
}

fn to_entry(entry: DirEntry) -> WalkEntry {
    let kind = if entry.file_type().is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::File
    };
    WalkEntry {
        dir: entry.path().parent().map(Path::to_path_buf).unwrap_or_default(),
        name: entry.file_name().to_string_lossy().into_owned(),
        kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn describe(root: &Path, entries: Vec<WalkEntry>) -> Vec<String> {
        entries
            .into_iter()
            .map(|entry| {
                let path = entry.path();
                let relative = path.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/");
                match entry.kind {
                    EntryKind::File => relative,
                    EntryKind::Directory => format!("{relative}/"),
                }
            })
            .collect()
    }

    #[test]
    fn missing_root_yields_nothing() {
        let dir = tempdir().unwrap();
        assert_eq!(walk(dir.path().join("absent"), true).count(), 0);
    }

    #[test]
    fn files_precede_subdirectories_depth_first() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("b.md"));
        touch(&root.join("a.md"));
        touch(&root.join("guide/intro.md"));
        touch(&root.join("guide/deep/more.md"));
        touch(&root.join("api/index.md"));

        let entries = walk(root, true).collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(
            describe(root, entries),
            vec![
                "a.md",
                "b.md",
                "api/",
                "api/index.md",
                "guide/",
                "guide/intro.md",
                "guide/deep/",
                "guide/deep/more.md",
            ]
        );
    }

    #[test]
    fn later_named_file_still_precedes_earlier_directory() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("zz.md"));
        touch(&root.join("aa/page.md"));

        let entries = walk(root, true).collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(describe(root, entries), vec!["zz.md", "aa/", "aa/page.md"]);
    }

    #[test]
    fn non_recursive_walk_stays_at_the_top() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("top.md"));
        touch(&root.join("nested/inner.md"));

        let entries = walk(root, false).collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(describe(root, entries), vec!["top.md", "nested/"]);
    }

    #[test]
    fn each_walk_starts_fresh() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("one.md"));

        assert_eq!(walk(dir.path(), true).count(), 1);
        assert_eq!(walk(dir.path(), true).count(), 1);
    }
}
