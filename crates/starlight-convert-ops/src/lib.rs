//! Migration operations for converting Hugo documentation trees to Starlight.
//!
//! The crate is layered leaves-first: [`walk`] enumerates a directory tree,
//! [`replicate`] mirrors a source tree into the target location, [`pipeline`]
//! rewrites one Markdown file through the ordered transform chain, and
//! [`driver`] runs both phases for every configured folder.

pub mod driver;
pub mod frontmatter;
pub mod headings;
pub mod images;
pub mod links;
pub mod paths;
pub mod pipeline;
pub mod redirects;
pub mod replicate;
pub mod resolve;
pub mod shortcodes;
pub mod walk;

mod text;

use std::io;
use std::path::PathBuf;

use starlight_convert_config::ConfigError;
use thiserror::Error;

pub use driver::{
    FileDiff, FolderReport, Migration, Phases, RewriteStats, RunOptions, RunReport,
};
pub use frontmatter::{FrontMatter, FrontMatterValue};
pub use pipeline::{rewrite_file, Collection, FileOutcome, FileStatus, RewriteContext};
pub use redirects::RedirectRecord;
pub use replicate::{replicate_tree, ReplicateStats};
pub use resolve::{resolve_image, resolve_reference, MAX_IMAGE_HOPS, MAX_REFERENCE_HOPS};
pub use walk::{walk, EntryKind, Walk, WalkEntry};

/// Errors raised while migrating content. Every variant halts the run.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("I/O error on {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("unknown folder '{mount}'")]
    UnknownFolder { mount: String },

    #[error("malformed front matter in {path}: {reason}")]
    MalformedFrontMatter { path: PathBuf, reason: String },

    #[error("failed to parse TOML front matter in {path}: {source}")]
    FrontMatterToml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to parse YAML front matter in {path}: {source}")]
    FrontMatterYaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("unsupported {kind} front matter value for '{key}' in {path}")]
    UnsupportedFrontMatterValue {
        path: PathBuf,
        key: String,
        kind: &'static str,
    },

    #[error("redirect stub {path} does not declare a target")]
    MissingRedirectTarget { path: PathBuf },

    #[error("image '{image}' in {path} not found within {attempts} parent-directory hops")]
    UnresolvedImage {
        path: PathBuf,
        image: String,
        attempts: usize,
    },

    #[error("unresolved reference '{reference}' in {path}{}", suggestion_hint(.suggestion))]
    UnresolvedReference {
        path: PathBuf,
        reference: String,
        suggestion: Option<String>,
    },

    #[error("ambiguous reference '{reference}' in {path}: matches {}", .candidates.join(", "))]
    AmbiguousReference {
        path: PathBuf,
        reference: String,
        candidates: Vec<String>,
    },

    #[error("site parameter '{name}' referenced in {path} is not defined")]
    MissingParameter { path: PathBuf, name: String },

    #[error("invalid pattern for shortcode '{shortcode}': {source}")]
    ShortcodePattern {
        shortcode: String,
        source: regex::Error,
    },

    #[error("unconverted shortcode in {path} at line {line}: {snippet}")]
    UnconvertedShortcode {
        path: PathBuf,
        line: usize,
        snippet: String,
    },
}

fn suggestion_hint(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(candidate) => format!(". Did you mean '{candidate}'?"),
        None => String::new(),
    }
}
