//! Per-file rewrite pipeline.
//!
//! Each Markdown file is read once, passed through the transform chain in a
//! fixed order and written back at most once. Re-running over converted
//! output leaves it unchanged: most steps look for Hugo markup first, and
//! heading stripping only follows a front matter conversion.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use starlight_convert_config::{Correction, SiteConfig};
use starlight_convert_utils::{atomic_write, unified_diff};

use crate::frontmatter::{self, YAML_DELIMITER};
use crate::headings::strip_redundant_heading;
use crate::images::normalize_images;
use crate::links::rewrite_links;
use crate::paths::to_markdown_path;
use crate::redirects::{redirect_target, RedirectRecord};
use crate::shortcodes::Shortcodes;
use crate::OperationError;

const HUGO_INDEX: &str = "_index.md";
const INDEX: &str = "index.md";

static CSHARP_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)```c#").unwrap());

/// A migrated documentation collection: its mount path and target directory.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Collection {
    pub mount: String,
    pub root: PathBuf,
}

impl Collection {
    pub fn new(mount: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Collection {
            mount: mount.into().trim_matches('/').to_string(),
            root: root.into(),
        }
    }
}

/// Everything the pipeline needs to rewrite files of one collection.
pub struct RewriteContext {
    pub collection: Collection,
    pub site: SiteConfig,
    pub shortcodes: Shortcodes,
    pub known_mounts: Vec<String>,
    pub corrections: Vec<Correction>,
    pub report_redirects: bool,
    pub capture_diff: bool,
}

impl RewriteContext {
    pub fn new(collection: Collection, site: SiteConfig) -> Self {
        let known_mounts = vec![collection.mount.clone()];
        RewriteContext {
            collection,
            site,
            shortcodes: Shortcodes::default(),
            known_mounts,
            corrections: Vec::new(),
            report_redirects: true,
            capture_diff: false,
        }
    }

    pub fn with_shortcodes(mut self, shortcodes: Shortcodes) -> Self {
        self.shortcodes = shortcodes;
        self
    }

    pub fn with_known_mounts(mut self, mounts: Vec<String>) -> Self {
        self.known_mounts = mounts;
        self
    }

    pub fn with_corrections(mut self, corrections: Vec<Correction>) -> Self {
        self.corrections = corrections;
        self
    }

    pub fn with_report_redirects(mut self, report: bool) -> Self {
        self.report_redirects = report;
        self
    }

    pub fn with_capture_diff(mut self, capture: bool) -> Self {
        self.capture_diff = capture;
        self
    }
}

/// What happened to a single file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FileStatus {
    Unchanged,
    Rewritten,
    DeletedRedirect,
}

/// Result of [`rewrite_file`].
#[derive(Clone, Debug)]
pub struct FileOutcome {
    /// Final location of the file (after any `_index.md` rename).
    pub path: PathBuf,
    pub status: FileStatus,
    pub renamed_from: Option<PathBuf>,
    pub redirect: Option<RedirectRecord>,
    pub diff: Option<String>,
}

struct Document {
    path: PathBuf,
    original: String,
    content: String,
}

impl Document {
    fn read(path: PathBuf) -> Result<Self, OperationError> {
        let content = fs::read_to_string(&path).map_err(|source| OperationError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(Document {
            path,
            original: content.clone(),
            content,
        })
    }

    fn update(&mut self, step: &'static str, next: String) {
        if next != self.content {
            tracing::trace!(path = %self.path.display(), step, "transform applied");
            self.content = next;
        }
    }

    fn changed(&self) -> bool {
        self.content != self.original
    }

    fn is_index(&self) -> bool {
        self.path.file_name().is_some_and(|name| name == INDEX)
    }
}

/// Rewrite one Markdown file of `ctx.collection` in place.
pub fn rewrite_file(path: &Path, ctx: &RewriteContext) -> Result<FileOutcome, OperationError> {
    let (path, renamed_from) = rename_hugo_index(path)?;
    let mut doc = Document::read(path)?;

    if let Some(target) = redirect_target(&doc.content, &doc.path)? {
        fs::remove_file(&doc.path).map_err(|source| OperationError::Io {
            path: doc.path.clone(),
            source,
        })?;
        let record = RedirectRecord::new(&ctx.collection, &doc.path, &target);
        tracing::debug!(path = %doc.path.display(), to = %record.to, "deleted redirect stub");
        return Ok(FileOutcome {
            path: doc.path,
            status: FileStatus::DeletedRedirect,
            renamed_from,
            redirect: ctx.report_redirects.then_some(record),
            diff: None,
        });
    }

    let next = normalize_images(&doc.content, &doc.path)?;
    doc.update("images", next);

    let converted = frontmatter::convert(&doc.content, &doc.path, doc.is_index())?;
    let front_matter_converted = converted.is_some();
    if let Some(next) = converted {
        doc.update("front-matter", next);
    }

    if doc.content.find(YAML_DELIMITER).is_some_and(|idx| idx > 3) {
        let next = format!("{YAML_DELIMITER}\n{YAML_DELIMITER}\n{}", doc.content);
        doc.update("leading-delimiter", next);
    }

    // Only on the pass that converts the front matter, so reruns keep headings.
    if front_matter_converted {
        let next = strip_redundant_heading(&doc.content, &doc.path)?;
        doc.update("heading", next);
    }

    if CSHARP_FENCE.is_match(&doc.content) {
        let next = CSHARP_FENCE.replace_all(&doc.content, "```csharp").into_owned();
        doc.update("code-fence", next);
    }

    let next = ctx
        .shortcodes
        .translate(&doc.content, &doc.path, &ctx.collection, &ctx.site)?;
    doc.update("shortcodes", next);

    let next = rewrite_links(&doc.content, &ctx.collection.mount, &ctx.known_mounts);
    doc.update("links", next);

    for correction in &ctx.corrections {
        if doc.content.contains(&correction.find) {
            let next = doc.content.replace(&correction.find, &correction.replace);
            doc.update("correction", next);
        }
    }

    if !doc.changed() {
        return Ok(FileOutcome {
            path: doc.path,
            status: FileStatus::Unchanged,
            renamed_from,
            redirect: None,
            diff: None,
        });
    }

    atomic_write(&doc.path, &doc.content).map_err(|source| OperationError::Io {
        path: doc.path.clone(),
        source,
    })?;
    let diff = if ctx.capture_diff {
        let relative = doc
            .path
            .strip_prefix(&ctx.collection.root)
            .unwrap_or(&doc.path);
        unified_diff(&doc.original, &doc.content, &to_markdown_path(relative))
    } else {
        None
    };
    tracing::debug!(path = %doc.path.display(), "rewrote file");

    Ok(FileOutcome {
        path: doc.path,
        status: FileStatus::Rewritten,
        renamed_from,
        redirect: None,
        diff,
    })
}

fn rename_hugo_index(path: &Path) -> Result<(PathBuf, Option<PathBuf>), OperationError> {
    if path.file_name().map_or(true, |name| name != HUGO_INDEX) {
        return Ok((path.to_path_buf(), None));
    }

    let renamed = path.with_file_name(INDEX);
    fs::rename(path, &renamed).map_err(|source| OperationError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(from = %path.display(), to = %renamed.display(), "renamed index file");
    Ok((renamed, Some(path.to_path_buf())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn context(root: &Path) -> RewriteContext {
        RewriteContext::new(Collection::new("bff/v3", root), SiteConfig::default())
    }

    #[test]
    fn hugo_index_is_renamed_before_rewriting() {
        let dir = tempdir().unwrap();
        let hugo_index = dir.path().join("_index.md");
        fs::write(&hugo_index, "+++\ntitle = \"BFF\"\n+++\n").unwrap();

        let outcome = rewrite_file(&hugo_index, &context(dir.path())).unwrap();

        assert_eq!(outcome.status, FileStatus::Rewritten);
        assert_eq!(outcome.renamed_from.as_deref(), Some(hugo_index.as_path()));
        assert!(!hugo_index.exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("index.md")).unwrap(),
            "---\ntitle: BFF\nsidebar:\n  order: 1\n---\n"
        );
    }

    #[test]
    fn leading_delimiter_is_inserted_for_bare_bodies() {
        let dir = tempdir().unwrap();
        let page = dir.path().join("page.md");
        fs::write(&page, "Intro\n\n---\n\nMore\n").unwrap();

        rewrite_file(&page, &context(dir.path())).unwrap();

        assert_eq!(
            fs::read_to_string(&page).unwrap(),
            "---\n---\nIntro\n\n---\n\nMore\n"
        );
    }

    #[test]
    fn title_heading_is_stripped_once_across_reruns() {
        let dir = tempdir().unwrap();
        let page = dir.path().join("setup.md");
        fs::write(&page, "+++\ntitle = \"Setup\"\n+++\n# Setup\n\n## Setup\n\nx\n").unwrap();
        let ctx = context(dir.path());

        let first = rewrite_file(&page, &ctx).unwrap();
        let second = rewrite_file(&page, &ctx).unwrap();

        assert_eq!(first.status, FileStatus::Rewritten);
        assert_eq!(second.status, FileStatus::Unchanged);
        assert_eq!(
            fs::read_to_string(&page).unwrap(),
            "---\ntitle: Setup\n---\n## Setup\n\nx\n"
        );
    }

    #[test]
    fn already_yaml_page_keeps_its_title_heading() {
        let dir = tempdir().unwrap();
        let page = dir.path().join("page.md");
        let contents = "---\ntitle: Setup\n---\n# Setup\n\nx\n";
        fs::write(&page, contents).unwrap();

        let outcome = rewrite_file(&page, &context(dir.path())).unwrap();

        assert_eq!(outcome.status, FileStatus::Unchanged);
        assert_eq!(fs::read_to_string(&page).unwrap(), contents);
    }

    #[test]
    fn csharp_fences_are_renamed() {
        let dir = tempdir().unwrap();
        let page = dir.path().join("page.md");
        fs::write(&page, "---\ntitle: Code\n---\n```C#\nvar x = 1;\n```\n").unwrap();

        rewrite_file(&page, &context(dir.path())).unwrap();

        assert_eq!(
            fs::read_to_string(&page).unwrap(),
            "---\ntitle: Code\n---\n```csharp\nvar x = 1;\n```\n"
        );
    }

    #[test]
    fn corrections_apply_after_other_steps() {
        let dir = tempdir().unwrap();
        let page = dir.path().join("page.md");
        fs::write(&page, "---\ntitle: Fix\n---\nSee teh docs.\n").unwrap();
        let ctx = context(dir.path()).with_corrections(vec![Correction {
            find: "teh".into(),
            replace: "the".into(),
            folder: None,
        }]);

        rewrite_file(&page, &ctx).unwrap();

        assert_eq!(fs::read_to_string(&page).unwrap(), "---\ntitle: Fix\n---\nSee the docs.\n");
    }

    #[test]
    fn diff_is_captured_on_request() {
        let dir = tempdir().unwrap();
        let page = dir.path().join("page.md");
        fs::write(&page, "---\ntitle: T\nweight: 2\n---\n").unwrap();

        let outcome = rewrite_file(&page, &context(dir.path()).with_capture_diff(true)).unwrap();

        let diff = outcome.diff.unwrap();
        assert!(diff.contains("-weight: 2"));
        assert!(diff.contains("+  order: 2"));
    }

    #[test]
    fn redirect_without_reporting_yields_no_record() {
        let dir = tempdir().unwrap();
        let page = dir.path().join("old.md");
        fs::write(&page, "---\ntype: redirect\ntarget: new\n---\n").unwrap();

        let outcome =
            rewrite_file(&page, &context(dir.path()).with_report_redirects(false)).unwrap();

        assert_eq!(outcome.status, FileStatus::DeletedRedirect);
        assert!(outcome.redirect.is_none());
        assert!(!page.exists());
    }
}
