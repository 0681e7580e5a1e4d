//! Batch driver running the copy and rewrite phases over configured folders.

use std::path::{Path, PathBuf};

use serde::Serialize;
use starlight_convert_config::{FolderMapping, MigrationConfig, SiteConfig};

use crate::paths::is_markdown_path;
use crate::pipeline::{rewrite_file, Collection, FileStatus, RewriteContext};
use crate::redirects::RedirectRecord;
use crate::replicate::{replicate_tree, ReplicateStats};
use crate::shortcodes::Shortcodes;
use crate::walk::{walk, EntryKind};
use crate::OperationError;

/// Which phases a run executes.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Phases {
    #[default]
    All,
    CopyOnly,
    RewriteOnly,
}

impl Phases {
    fn copies(self) -> bool {
        matches!(self, Phases::All | Phases::CopyOnly)
    }

    fn rewrites(self) -> bool {
        matches!(self, Phases::All | Phases::RewriteOnly)
    }
}

/// Options controlling a [`Migration::run`].
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    pub phases: Phases,
    /// Restrict the run to these mount paths. Empty means every folder.
    pub folders: Vec<String>,
    pub capture_diffs: bool,
}

/// Counts collected while rewriting one folder.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct RewriteStats {
    pub scanned: usize,
    pub rewritten: usize,
    pub unchanged: usize,
    pub renamed: usize,
    pub deleted: usize,
}

/// Unified diff of one rewritten file.
#[derive(Clone, Debug, Serialize)]
pub struct FileDiff {
    pub path: PathBuf,
    pub diff: String,
}

/// Outcome of migrating one folder.
#[derive(Clone, Debug, Serialize)]
pub struct FolderReport {
    pub mount: String,
    pub source: PathBuf,
    pub target: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copied: Option<ReplicateStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewrite: Option<RewriteStats>,
    pub redirects: Vec<RedirectRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diffs: Vec<FileDiff>,
}

/// Outcome of a whole run, one entry per processed folder.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RunReport {
    pub folders: Vec<FolderReport>,
}

impl RunReport {
    /// Every redirect record of the run, in processing order.
    pub fn redirects(&self) -> impl Iterator<Item = &RedirectRecord> {
        self.folders.iter().flat_map(|folder| folder.redirects.iter())
    }
}

/// Hugo → Starlight migration over a validated configuration.
pub struct Migration {
    config: MigrationConfig,
}

impl Migration {
    pub fn new(config: MigrationConfig) -> Self {
        Migration { config }
    }

    /// Site configuration of the folder mounted at `mount`.
    pub fn site_config(&self, mount: &str) -> Result<SiteConfig, OperationError> {
        let folder = self.lookup(mount)?;
        let source_dir = self.config.source_dir(folder);
        Ok(SiteConfig::load(&source_dir, &self.config.site_config.candidates)?)
    }

    /// Run the selected phases for each selected folder in declaration
    /// order. The first error stops the run.
    pub fn run(&self, options: &RunOptions) -> Result<RunReport, OperationError> {
        self.run_with(options, |_| {})
    }

    /// Like [`Migration::run`], handing each redirect record to `on_redirect`
    /// as soon as its stub is deleted. Records seen before a failing file are
    /// therefore delivered even when the run returns an error.
    pub fn run_with(
        &self,
        options: &RunOptions,
        mut on_redirect: impl FnMut(&RedirectRecord),
    ) -> Result<RunReport, OperationError> {
        for mount in &options.folders {
            self.lookup(mount)?;
        }

        let selected = self
            .config
            .folders
            .iter()
            .filter(|folder| {
                options.folders.is_empty()
                    || options
                        .folders
                        .iter()
                        .any(|mount| mount.trim_matches('/') == folder.target)
            })
            .collect::<Vec<_>>();

        let mut report = RunReport::default();
        for folder in selected {
            report
                .folders
                .push(self.run_folder(folder, options, &mut on_redirect)?);
        }
        Ok(report)
    }

    fn lookup(&self, mount: &str) -> Result<&FolderMapping, OperationError> {
        self.config
            .folder(mount)
            .ok_or_else(|| OperationError::UnknownFolder {
                mount: mount.to_string(),
            })
    }

    fn run_folder(
        &self,
        folder: &FolderMapping,
        options: &RunOptions,
        on_redirect: &mut dyn FnMut(&RedirectRecord),
    ) -> Result<FolderReport, OperationError> {
        let source = self.config.source_dir(folder);
        let target = self.config.target_dir(folder);
        tracing::info!(folder = %folder.target, source = %source.display(), "migrating folder");

        let site = SiteConfig::load(&source, &self.config.site_config.candidates)?;

        let mut report = FolderReport {
            mount: folder.target.clone(),
            source: source.clone(),
            target: target.clone(),
            copied: None,
            rewrite: None,
            redirects: Vec::new(),
            diffs: Vec::new(),
        };

        if options.phases.copies() {
            let stats = replicate_tree(&source, &target)?;
            tracing::info!(
                folder = %folder.target,
                files = stats.files_copied,
                directories = stats.directories_created,
                "copied source tree"
            );
            report.copied = Some(stats);
        }

        if options.phases.rewrites() {
            let ctx = RewriteContext::new(Collection::new(&folder.target, &target), site)
                .with_shortcodes(Shortcodes::new(&self.config.cross_product_refs)?)
                .with_known_mounts(
                    self.config
                        .folders
                        .iter()
                        .map(|folder| folder.target.clone())
                        .collect(),
                )
                .with_corrections(self.config.corrections_for(folder).cloned().collect())
                .with_report_redirects(self.config.redirects.report)
                .with_capture_diff(options.capture_diffs);
            let stats = rewrite_tree(&target, &ctx, &mut report, on_redirect)?;
            tracing::info!(
                folder = %folder.target,
                scanned = stats.scanned,
                rewritten = stats.rewritten,
                deleted = stats.deleted,
                "rewrote content"
            );
            report.rewrite = Some(stats);
        }

        Ok(report)
    }
}

fn rewrite_tree(
    root: &Path,
    ctx: &RewriteContext,
    report: &mut FolderReport,
    on_redirect: &mut dyn FnMut(&RedirectRecord),
) -> Result<RewriteStats, OperationError> {
    let mut stats = RewriteStats::default();

    for entry in walk(root, true) {
        let entry = entry?;
        if entry.kind != EntryKind::File || !is_markdown_path(&entry.name) {
            continue;
        }
        let path = entry.path();
        // An earlier `_index.md` rename or redirect deletion may have replaced it.
        if !path.is_file() {
            continue;
        }

        let outcome = rewrite_file(&path, ctx)?;
        stats.scanned += 1;
        if outcome.renamed_from.is_some() {
            stats.renamed += 1;
        }
        match outcome.status {
            FileStatus::Unchanged => stats.unchanged += 1,
            FileStatus::Rewritten => stats.rewritten += 1,
            FileStatus::DeletedRedirect => stats.deleted += 1,
        }
        if let Some(record) = outcome.redirect {
            tracing::info!(from = %record.from, to = %record.to, "removed redirect stub");
            on_redirect(&record);
            report.redirects.push(record);
        }
        if let Some(diff) = outcome.diff {
            let relative = outcome.path.strip_prefix(root).unwrap_or(&outcome.path);
            report.diffs.push(FileDiff {
                path: relative.to_path_buf(),
                diff,
            });
        }
    }

    Ok(stats)
}
