//! Filesystem-aware resolution of image paths and cross-references.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::paths::{
    is_external, is_markdown_path, mount_path, split_link_target, to_markdown_path,
    with_lowercase_anchor,
};
use crate::pipeline::Collection;
use crate::OperationError;

/// Maximum number of leading `../` segments stripped from an image path.
pub const MAX_IMAGE_HOPS: usize = 4;

/// Maximum number of parent directories tried for a relative reference.
pub const MAX_REFERENCE_HOPS: usize = 5;

const SUGGESTION_THRESHOLD: f64 = 0.6;

/// Find a viable form of a `../`-prefixed image path referenced from `file`.
///
/// While the path does not exist relative to the file's directory one
/// leading `../` is stripped and the lookup retried. Query strings and
/// fragments are carried through untouched.
pub fn resolve_image(file: &Path, image: &str) -> Result<String, OperationError> {
    let dir = file.parent().unwrap_or(Path::new(""));
    let split = image.find(['?', '#']).unwrap_or(image.len());
    let (mut candidate, suffix) = image.split_at(split);

    let mut attempts = 0;
    loop {
        if dir.join(candidate).exists() {
            return Ok(format!("{candidate}{suffix}"));
        }
        if attempts == MAX_IMAGE_HOPS {
            break;
        }
        match candidate.strip_prefix("../") {
            Some(stripped) => candidate = stripped,
            None => break,
        }
        attempts += 1;
    }

    Err(OperationError::UnresolvedImage {
        path: file.to_path_buf(),
        image: image.to_string(),
        attempts,
    })
}

/// Resolve a `ref`/`relref` target written in `file` into a link path.
///
/// Bare anchors are lower-cased. Root-relative paths are mounted under the
/// collection. Relative paths are tried against the file's directory and
/// then up to [`MAX_REFERENCE_HOPS`] of its parents, and finally looked up by
/// name in the subtree below the file.
pub fn resolve_reference(
    file: &Path,
    reference: &str,
    collection: &Collection,
) -> Result<String, OperationError> {
    if is_external(reference) {
        return Ok(reference.to_string());
    }

    let (path, anchor) = split_link_target(reference);
    if path.is_empty() {
        return Ok(with_lowercase_anchor("", anchor));
    }
    if path.starts_with('/') {
        return Ok(with_lowercase_anchor(
            &mount_path(&collection.mount, path),
            anchor,
        ));
    }

    let dir = file.parent().unwrap_or(Path::new(""));
    for (hops, base) in dir.ancestors().take(MAX_REFERENCE_HOPS + 1).enumerate() {
        if !base.starts_with(&collection.root) {
            break;
        }
        if page_exists(&base.join(path)) {
            let resolved = format!("{}{path}", "../".repeat(hops));
            return Ok(with_lowercase_anchor(&resolved, anchor));
        }
    }

    let matches = search_subtree(dir, path);
    match matches.len() {
        1 => {
            let found = matches.into_iter().next().unwrap_or_default();
            Ok(with_lowercase_anchor(&found, anchor))
        }
        0 => Err(OperationError::UnresolvedReference {
            path: file.to_path_buf(),
            reference: reference.to_string(),
            suggestion: suggest(&collection.root, path),
        }),
        _ => Err(OperationError::AmbiguousReference {
            path: file.to_path_buf(),
            reference: reference.to_string(),
            candidates: matches.into_iter().collect(),
        }),
    }
}

fn page_exists(candidate: &Path) -> bool {
    if candidate.is_file() || candidate.is_dir() {
        return true;
    }
    let mut with_extension = candidate.as_os_str().to_owned();
    with_extension.push(".md");
    PathBuf::from(with_extension).is_file()
}

fn last_segment(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

fn matches_name(entry_name: &str, wanted: &str) -> bool {
    entry_name == wanted
        || (is_markdown_path(entry_name) && entry_name[..entry_name.len() - 3] == *wanted)
}

/// Entries below `dir` whose name, or Markdown stem, equals the last segment
/// of `reference`, rendered relative to `dir`.
fn search_subtree(dir: &Path, reference: &str) -> BTreeSet<String> {
    let wanted = last_segment(reference);
    let keep_extension = is_markdown_path(wanted);
    let mut found = BTreeSet::new();
    if wanted.is_empty() {
        return found;
    }

    for entry in WalkDir::new(dir).min_depth(1).into_iter().filter_map(Result::ok) {
        let name = entry.file_name().to_string_lossy();
        if !matches_name(&name, wanted) {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(dir) else {
            continue;
        };
        let mut rendered = to_markdown_path(relative);
        if entry.file_type().is_file() && !keep_extension && is_markdown_path(&rendered) {
            rendered.truncate(rendered.len() - 3);
        }
        found.insert(rendered);
    }
    found
}

/// Closest Markdown page name in the collection, if any is close enough.
fn suggest(root: &Path, reference: &str) -> Option<String> {
    let wanted = last_segment(reference).trim_end_matches(".md");
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            let stem = name.strip_suffix(".md")?.to_string();
            let score = strsim::normalized_levenshtein(wanted, &stem);
            (score > SUGGESTION_THRESHOLD).then_some((score, stem))
        })
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, stem)| stem)
}
