//! Configuration primitives and loaders for the starlight converter.
//!
//! Two inputs are resolved here. The migration config (`.starlight-convert.toml`)
//! names the source/target roots and the content folders to migrate; the loader
//! layers it over built-in defaults and validates it into [`MigrationConfig`].
//! The per-folder Hugo site configuration is flattened by [`SiteConfig`] so the
//! rewrite pipeline can substitute `param` shortcodes.
//!
//! There are no built-in text corrections. The final rewrite step only does
//! something when `.starlight-convert.toml` declares `[[corrections]]`
//! entries, each with `find`, `replace` and an optional `folder` mount.

mod site;

use std::collections::HashSet;
use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub use site::SiteConfig;

const CONFIG_FILE_NAME: &str = ".starlight-convert.toml";

/// Site configuration files tried for each folder, relative to its source directory.
pub const DEFAULT_SITE_CONFIG_CANDIDATES: &[&str] =
    &["../config.toml", "../config/_default/hugo.toml"];

/// Documentation sets migrated when the config file does not declare `[[folders]]`.
pub const DEFAULT_FOLDERS: &[(&str, &str)] = &[
    ("BFF/v2/docs/content", "bff/v2"),
    ("BFF/v3/docs/content", "bff/v3"),
    ("FOSS/content", "foss"),
    ("IdentityServer/v5/docs/content", "identityserver/v5"),
    ("IdentityServer/v6/docs/content", "identityserver/v6"),
    ("IdentityServer/v7/docs/content", "identityserver/v7"),
];

/// Fully resolved migration settings handed to the batch driver.
#[derive(Clone, Debug)]
pub struct MigrationConfig {
    pub source_root: PathBuf,
    pub target_root: PathBuf,
    pub folders: Vec<FolderMapping>,
    pub site_config: SiteConfigSettings,
    pub redirects: RedirectSettings,
    pub cross_product_refs: Vec<CrossProductRef>,
    /// Literal replacements applied last to every rewritten file. Empty unless
    /// the config file declares `[[corrections]]`.
    pub corrections: Vec<Correction>,
    pub source: ConfigSource,
}

impl MigrationConfig {
    /// Build a configuration from built-in defaults and the provided roots,
    /// without consulting any file on disk.
    pub fn with_defaults(source_root: impl Into<PathBuf>, target_root: impl Into<PathBuf>) -> Self {
        MigrationConfig {
            source_root: source_root.into(),
            target_root: target_root.into(),
            folders: DEFAULT_FOLDERS
                .iter()
                .map(|(source, target)| FolderMapping::new(*source, *target))
                .collect(),
            site_config: SiteConfigSettings::default(),
            redirects: RedirectSettings::default(),
            cross_product_refs: default_cross_product_refs(),
            corrections: Vec::new(),
            source: ConfigSource::defaults(),
        }
    }

    /// Replace the folder list, typically in tests that migrate a single collection.
    pub fn with_folders(mut self, folders: Vec<FolderMapping>) -> Self {
        self.folders = folders;
        self
    }

    /// Loads the config file selected by `options` and validates it.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let working_dir = resolve_working_dir(options.working_dir)?;
        let override_path = options
            .override_path
            .map(|path| make_absolute(&path, &working_dir));

        let (raw, source) = match override_path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::OverrideNotFound { path });
                }
                let raw = load_raw(&path)?;
                (raw, ConfigSource::for_file(ConfigSourceKind::Override, path))
            }
            None => {
                let local = working_dir.join(CONFIG_FILE_NAME);
                if local.exists() {
                    let raw = load_raw(&local)?;
                    (raw, ConfigSource::for_file(ConfigSourceKind::Local, local))
                } else {
                    tracing::debug!(
                        working_dir = %working_dir.display(),
                        "no {CONFIG_FILE_NAME} found, using built-in defaults"
                    );
                    (RawConfig::default(), ConfigSource::defaults())
                }
            }
        };

        let base_dir = source
            .path
            .as_ref()
            .and_then(|path| path.parent())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| working_dir.clone());

        let roots = RootOverrides {
            source_root: options
                .source_root
                .map(|path| make_absolute(&path, &working_dir)),
            target_root: options
                .target_root
                .map(|path| make_absolute(&path, &working_dir)),
        };

        raw.finalize(source, &base_dir, roots)
            .map_err(ConfigError::Validation)
    }

    /// Absolute path of the folder's Hugo content directory.
    pub fn source_dir(&self, folder: &FolderMapping) -> PathBuf {
        self.source_root.join(&folder.source)
    }

    /// Absolute path of the folder's Starlight content directory.
    pub fn target_dir(&self, folder: &FolderMapping) -> PathBuf {
        self.target_root.join(&folder.target)
    }

    /// Look up a folder by its mount path (`bff/v3`), ignoring surrounding slashes.
    pub fn folder(&self, mount: &str) -> Option<&FolderMapping> {
        let mount = normalize_mount(mount);
        self.folders.iter().find(|folder| folder.target == mount)
    }

    /// Corrections that apply to the given folder, in declaration order.
    pub fn corrections_for<'a>(
        &'a self,
        folder: &'a FolderMapping,
    ) -> impl Iterator<Item = &'a Correction> + 'a {
        self.corrections.iter().filter(move |correction| {
            correction
                .folder
                .as_deref()
                .map_or(true, |scope| scope == folder.target)
        })
    }
}

/// One documentation collection to migrate.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FolderMapping {
    /// Hugo content directory, relative to the source root.
    pub source: PathBuf,
    /// Mount path under the Starlight content root, without surrounding slashes.
    pub target: String,
}

impl FolderMapping {
    pub fn new(source: impl Into<PathBuf>, target: &str) -> Self {
        FolderMapping {
            source: source.into(),
            target: normalize_mount(target),
        }
    }
}

/// Where to find each folder's Hugo site configuration.
#[derive(Clone, Debug)]
pub struct SiteConfigSettings {
    pub candidates: Vec<PathBuf>,
}

impl Default for SiteConfigSettings {
    fn default() -> Self {
        SiteConfigSettings {
            candidates: DEFAULT_SITE_CONFIG_CANDIDATES
                .iter()
                .map(PathBuf::from)
                .collect(),
        }
    }
}

/// Controls the redirect mapping report.
#[derive(Clone, Debug)]
pub struct RedirectSettings {
    pub report: bool,
}

impl Default for RedirectSettings {
    fn default() -> Self {
        RedirectSettings { report: true }
    }
}

/// Shortcode that links into another collection (e.g. `ref-idsrv`).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CrossProductRef {
    pub shortcode: String,
    pub mount: String,
}

/// Exact substring replacement for a known content defect.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Correction {
    pub find: String,
    pub replace: String,
    /// Restrict the correction to one folder mount path.
    pub folder: Option<String>,
}

fn default_cross_product_refs() -> Vec<CrossProductRef> {
    vec![CrossProductRef {
        shortcode: "ref-idsrv".into(),
        mount: "identityserver/v7".into(),
    }]
}

/// Provenance of the resolved configuration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigSource {
    pub kind: ConfigSourceKind,
    pub path: Option<PathBuf>,
}

impl ConfigSource {
    fn defaults() -> Self {
        ConfigSource {
            kind: ConfigSourceKind::Default,
            path: None,
        }
    }

    fn for_file(kind: ConfigSourceKind, path: PathBuf) -> Self {
        ConfigSource {
            kind,
            path: Some(path),
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{} at {}", self.kind, path.display()),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Kinds of configuration sources.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfigSourceKind {
    Default,
    Local,
    Override,
}

impl fmt::Display for ConfigSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConfigSourceKind::Default => "built-in defaults",
            ConfigSourceKind::Local => "local config",
            ConfigSourceKind::Override => "override config",
        };
        f.write_str(label)
    }
}

/// Loader options, typically supplied by the CLI layer.
#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub override_path: Option<PathBuf>,
    pub working_dir: Option<PathBuf>,
    pub source_root: Option<PathBuf>,
    pub target_root: Option<PathBuf>,
}

impl LoadOptions {
    pub fn with_override_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.override_path = Some(path.into());
        self
    }

    pub fn with_working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(path.into());
        self
    }

    pub fn with_source_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_root = Some(path.into());
        self
    }

    pub fn with_target_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.target_root = Some(path.into());
        self
    }
}

/// Errors surfaced while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to resolve working directory {attempted}: {source}")]
    WorkingDirectory {
        attempted: PathBuf,
        source: io::Error,
    },
    #[error("override config {path} not found")]
    OverrideNotFound { path: PathBuf },
    #[error("failed to read config {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("unsupported {kind} value for '{key}' in {path}")]
    UnsupportedValue {
        path: PathBuf,
        key: String,
        kind: &'static str,
    },
    #[error("configuration validation failed:\n{0}")]
    Validation(ConfigValidationErrors),
}

/// Collection of validation failures reported together.
#[derive(Debug)]
pub struct ConfigValidationErrors(Vec<ConfigValidationError>);

impl ConfigValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ConfigValidationError> {
        self.0.iter()
    }
}

impl fmt::Display for ConfigValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, error) in self.0.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "  - {error}")?;
        }
        Ok(())
    }
}

/// Single validation failure with its provenance.
#[derive(Debug)]
pub struct ConfigValidationError {
    pub source: ConfigSource,
    pub message: String,
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.source)
    }
}

fn resolve_working_dir(override_dir: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    match override_dir {
        Some(path) => fs::canonicalize(&path).map_err(|source| ConfigError::WorkingDirectory {
            attempted: path,
            source,
        }),
        None => env::current_dir().map_err(|source| ConfigError::WorkingDirectory {
            attempted: PathBuf::from("."),
            source,
        }),
    }
}

fn make_absolute(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn normalize_mount(mount: &str) -> String {
    mount.trim().trim_matches('/').to_string()
}

fn load_raw(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.into(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.into(),
        source,
    })
}

struct RootOverrides {
    source_root: Option<PathBuf>,
    target_root: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    paths: RawPaths,
    folders: Option<Vec<RawFolder>>,
    site_config: Option<RawSiteConfig>,
    redirects: Option<RawRedirects>,
    cross_product_refs: Option<Vec<RawCrossProductRef>>,
    #[serde(default)]
    corrections: Vec<RawCorrection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPaths {
    source_root: Option<PathBuf>,
    target_root: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFolder {
    source: PathBuf,
    target: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSiteConfig {
    candidates: Vec<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRedirects {
    report: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCrossProductRef {
    shortcode: String,
    mount: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCorrection {
    find: String,
    replace: String,
    folder: Option<String>,
}

impl RawConfig {
    fn finalize(
        self,
        source: ConfigSource,
        base_dir: &Path,
        roots: RootOverrides,
    ) -> Result<MigrationConfig, ConfigValidationErrors> {
        let mut errors = Vec::new();
        let mut invalid = |message: String| {
            errors.push(ConfigValidationError {
                source: source.clone(),
                message,
            })
        };

        let source_root = roots
            .source_root
            .or_else(|| self.paths.source_root.map(|p| make_absolute(&p, base_dir)));
        let target_root = roots
            .target_root
            .or_else(|| self.paths.target_root.map(|p| make_absolute(&p, base_dir)));

        if source_root.is_none() {
            invalid("paths.source_root is required".into());
        }
        if target_root.is_none() {
            invalid("paths.target_root is required".into());
        }

        let folders = match self.folders {
            Some(raw) => raw
                .into_iter()
                .map(|folder| FolderMapping::new(folder.source, &folder.target))
                .collect::<Vec<_>>(),
            None => DEFAULT_FOLDERS
                .iter()
                .map(|(source, target)| FolderMapping::new(*source, *target))
                .collect(),
        };

        if folders.is_empty() {
            invalid("at least one [[folders]] entry is required".into());
        }

        let mut seen = HashSet::new();
        for folder in &folders {
            if folder.target.is_empty() {
                invalid(format!(
                    "folder '{}' has an empty target mount path",
                    folder.source.display()
                ));
            } else if !seen.insert(folder.target.clone()) {
                invalid(format!("duplicate folder target '{}'", folder.target));
            }
            if folder.source.is_absolute() {
                invalid(format!(
                    "folder source '{}' must be relative to paths.source_root",
                    folder.source.display()
                ));
            }
        }

        let site_config = match self.site_config {
            Some(raw) if raw.candidates.is_empty() => {
                invalid("site_config.candidates must not be empty".into());
                SiteConfigSettings::default()
            }
            Some(raw) => SiteConfigSettings {
                candidates: raw.candidates,
            },
            None => SiteConfigSettings::default(),
        };

        let redirects = self
            .redirects
            .map(|raw| RedirectSettings { report: raw.report })
            .unwrap_or_default();

        let cross_product_refs = match self.cross_product_refs {
            Some(raw) => raw
                .into_iter()
                .map(|entry| CrossProductRef {
                    shortcode: entry.shortcode.trim().to_string(),
                    mount: normalize_mount(&entry.mount),
                })
                .collect::<Vec<_>>(),
            None => default_cross_product_refs(),
        };

        for entry in &cross_product_refs {
            if entry.shortcode.is_empty()
                || !entry
                    .shortcode
                    .chars()
                    .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
            {
                invalid(format!(
                    "cross_product_refs shortcode '{}' must be a non-empty identifier",
                    entry.shortcode
                ));
            }
            if entry.mount.is_empty() {
                invalid(format!(
                    "cross_product_refs entry '{}' has an empty mount",
                    entry.shortcode
                ));
            }
        }

        let corrections = self
            .corrections
            .into_iter()
            .map(|raw| Correction {
                find: raw.find,
                replace: raw.replace,
                folder: raw.folder.as_deref().map(normalize_mount),
            })
            .collect::<Vec<_>>();

        for correction in &corrections {
            if correction.find.is_empty() {
                invalid("corrections.find must not be empty".into());
            }
            if let Some(scope) = &correction.folder {
                if !folders.iter().any(|folder| &folder.target == scope) {
                    invalid(format!(
                        "correction scoped to unknown folder '{scope}'"
                    ));
                }
            }
        }

        match (source_root, target_root) {
            (Some(source_root), Some(target_root)) if errors.is_empty() => Ok(MigrationConfig {
                source_root,
                target_root,
                folders,
                site_config,
                redirects,
                cross_product_refs,
                corrections,
                source,
            }),
            _ => Err(ConfigValidationErrors(errors)),
        }
    }
}
