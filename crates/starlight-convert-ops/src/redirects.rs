//! Detection of Hugo redirect stub pages.

use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::paths::{is_external, mount_path, site_url};
use crate::pipeline::Collection;
use crate::OperationError;

static REDIRECT_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*type\s*[:=]\s*["']?redirect["']?\s*$"#).unwrap()
});

static REDIRECT_TARGET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*target\s*[:=]\s*["']?(?P<target>[^"'\r\n]*?)["']?\s*$"#).unwrap()
});

/// Old site URL of a deleted redirect stub and where it now points.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct RedirectRecord {
    pub from: String,
    pub to: String,
}

impl RedirectRecord {
    /// Build the record for the stub at `file` pointing at `target`.
    pub fn new(collection: &Collection, file: &Path, target: &str) -> Self {
        let to = if is_external(target) {
            target.to_string()
        } else {
            mount_path(
                &collection.mount,
                &format!("/{}", target.trim_start_matches('/')),
            )
        };
        RedirectRecord {
            from: site_url(&collection.mount, &collection.root, file),
            to,
        }
    }
}

impl fmt::Display for RedirectRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\": \"{}\",", self.from, self.to)
    }
}

/// Return the redirect target when `content` is a redirect stub.
///
/// Stubs are recognised by a `type = "redirect"` (TOML) or `type: redirect`
/// (YAML) line; a stub without a `target` line is an error.
pub fn redirect_target(content: &str, path: &Path) -> Result<Option<String>, OperationError> {
    if !REDIRECT_TYPE.is_match(content) {
        return Ok(None);
    }

    REDIRECT_TARGET
        .captures(content)
        .map(|caps| caps["target"].trim().to_string())
        .filter(|target| !target.is_empty())
        .map(Some)
        .ok_or_else(|| OperationError::MissingRedirectTarget {
            path: path.to_path_buf(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn bff() -> Collection {
        Collection {
            mount: "bff/v3".into(),
            root: PathBuf::from("/site/bff/v3"),
        }
    }

    #[test]
    fn detects_both_dialects() {
        let path = Path::new("page.md");
        assert_eq!(
            redirect_target("+++\ntype = \"redirect\"\ntarget = \"samples\"\n+++\n", path).unwrap(),
            Some("samples".to_string())
        );
        assert_eq!(
            redirect_target("---\ntype: redirect\ntarget: /overview/\n---\n", path).unwrap(),
            Some("/overview/".to_string())
        );
        assert_eq!(redirect_target("---\ntitle: Page\n---\n", path).unwrap(), None);
    }

    #[test]
    fn mentioning_redirects_in_prose_is_not_a_stub() {
        let content = "Set the type: redirect option in your config.\n";
        assert_eq!(redirect_target(content, Path::new("page.md")).unwrap(), None);
    }

    #[test]
    fn stub_without_target_is_an_error() {
        let err = redirect_target("+++\ntype = \"redirect\"\n+++\n", Path::new("page.md")).unwrap_err();
        assert!(matches!(err, OperationError::MissingRedirectTarget { .. }));
    }

    #[test]
    fn record_maps_old_url_to_mounted_target() {
        let record = RedirectRecord::new(
            &bff(),
            Path::new("/site/bff/v3/fundamentals/old-samples.md"),
            "samples",
        );
        assert_eq!(record.from, "/bff/v3/fundamentals/old-samples/");
        assert_eq!(record.to, "/bff/v3/samples");
        assert_eq!(
            record.to_string(),
            "\"/bff/v3/fundamentals/old-samples/\": \"/bff/v3/samples\","
        );
    }

    #[test]
    fn external_targets_are_kept() {
        let record = RedirectRecord::new(&bff(), Path::new("/site/bff/v3/index.md"), "https://duende.dev");
        assert_eq!(record.from, "/bff/v3/");
        assert_eq!(record.to, "https://duende.dev");
    }
}
