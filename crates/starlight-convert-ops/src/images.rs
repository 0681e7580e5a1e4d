//! Normalization of `../`-prefixed image paths.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::resolve::resolve_image;
use crate::text::try_replace_all;
use crate::OperationError;

static MARKDOWN_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!\[(?P<alt>[^\]]*)\]\((?P<path>\.\./[^)\s]*)(?P<rest>[^)]*)\)").unwrap()
});

static HTML_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?P<prefix><img\b[^>]*?\bsrc=["'])(?P<path>\.\./[^"']*)"#).unwrap()
});

/// Rewrite image references in `content` so every `../` path points at an
/// existing file relative to `file`.
pub fn normalize_images(content: &str, file: &Path) -> Result<String, OperationError> {
    if !content.contains("../") {
        return Ok(content.to_string());
    }

    let content = try_replace_all(&MARKDOWN_IMAGE, content, |caps| {
        let resolved = resolve_image(file, &caps["path"])?;
        Ok::<_, OperationError>(format!("![{}]({resolved}{})", &caps["alt"], &caps["rest"]))
    })?;

    try_replace_all(&HTML_IMAGE, &content, |caps| {
        let resolved = resolve_image(file, &caps["path"])?;
        Ok(format!("{}{resolved}", &caps["prefix"]))
    })
}
