use std::path::{Component, Path};

/// Return true if the provided target points to an external resource (http/mailto/etc.).
pub fn is_external(target: &str) -> bool {
    let lower = target.to_ascii_lowercase();
    lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("//")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
}

/// Determine whether the provided string names a Markdown content file.
pub fn is_markdown_path(path: &str) -> bool {
    path.to_ascii_lowercase().ends_with(".md")
}

/// Split a link target into its path and optional anchor components.
pub fn split_link_target(target: &str) -> (&str, Option<&str>) {
    if let Some((path, anchor)) = target.split_once('#') {
        (path, Some(anchor))
    } else {
        (target, None)
    }
}

/// Re-attach a lower-cased anchor to `path`.
pub fn with_lowercase_anchor(path: &str, anchor: Option<&str>) -> String {
    match anchor {
        Some(anchor) => format!("{path}#{}", anchor.to_lowercase()),
        None => path.to_string(),
    }
}

/// Prefix a root-relative path with the collection mount (`/session` →
/// `/identityserver/v7/session`). Paths already under the mount are returned as-is.
pub fn mount_path(mount: &str, path: &str) -> String {
    if is_under_mount(mount, path) {
        return path.to_string();
    }
    format!("/{mount}/{}", path.trim_start_matches('/'))
}

/// Whether a root-relative path already starts with `/<mount>`.
pub fn is_under_mount(mount: &str, path: &str) -> bool {
    let prefix = format!("/{mount}");
    match path.strip_prefix(&prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || rest.starts_with('#'),
        None => false,
    }
}

/// Render a filesystem path with forward slashes, as used inside Markdown.
pub fn to_markdown_path(path: &Path) -> String {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => continue,
            other => components.push(other.as_os_str().to_string_lossy().into_owned()),
        }
    }

    if components.is_empty() {
        ".".into()
    } else {
        components.join("/")
    }
}

/// Site URL a content file is served at under its collection mount.
///
/// `guide/setup.md` maps to `/<mount>/guide/setup/`; an `index.md` maps to
/// the URL of its directory.
pub fn site_url(mount: &str, collection_root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(collection_root).unwrap_or(file);
    let mut segments = relative
        .parent()
        .map(|parent| {
            parent
                .components()
                .filter_map(|component| match component {
                    Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
                    _ => None,
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let stem = relative
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    if stem != "index" && stem != "_index" && !stem.is_empty() {
        segments.push(stem);
    }

    let mut url = format!("/{mount}/");
    for segment in segments {
        url.push_str(&segment);
        url.push('/');
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_keeps_empty_path_for_bare_anchor() {
        assert_eq!(split_link_target("#Intro"), ("", Some("Intro")));
        assert_eq!(split_link_target("guide#Top"), ("guide", Some("Top")));
        assert_eq!(split_link_target("guide"), ("guide", None));
    }

    #[test]
    fn mount_path_avoids_duplication() {
        assert_eq!(
            mount_path("identityserver/v7", "/session"),
            "/identityserver/v7/session"
        );
        assert_eq!(
            mount_path("identityserver/v7", "/identityserver/v7/session"),
            "/identityserver/v7/session"
        );
        assert_eq!(
            mount_path("identityserver/v7", "/identityserver/v70"),
            "/identityserver/v7/identityserver/v70"
        );
        assert_eq!(mount_path("bff/v3", "/"), "/bff/v3/");
    }

    #[test]
    fn site_urls_follow_directory_structure() {
        let root = Path::new("/docs/bff/v3");
        assert_eq!(
            site_url("bff/v3", root, Path::new("/docs/bff/v3/fundamentals/session.md")),
            "/bff/v3/fundamentals/session/"
        );
        assert_eq!(
            site_url("bff/v3", root, Path::new("/docs/bff/v3/fundamentals/index.md")),
            "/bff/v3/fundamentals/"
        );
        assert_eq!(
            site_url("bff/v3", root, Path::new("/docs/bff/v3/index.md")),
            "/bff/v3/"
        );
    }
}
