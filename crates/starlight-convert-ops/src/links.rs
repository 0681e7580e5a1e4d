//! Markdown link rewriting.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::paths::{is_external, is_under_mount, mount_path, split_link_target, with_lowercase_anchor};

// Link text may hold one nested image, e.g. a linked logo.
static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?P<bang>!?)\[(?P<text>(?:!\[[^\]]*\]\([^)]*\)|[^\]])*)\]\((?P<url>[^)\s]+)(?P<rest>[^)]*)\)",
    )
    .unwrap()
});

/// Mount root-relative link targets under `mount` and lower-case anchors.
///
/// Targets already under any of `known_mounts` are left alone. Image
/// references are skipped.
pub fn rewrite_links(content: &str, mount: &str, known_mounts: &[String]) -> String {
    if !content.contains("](") {
        return content.to_string();
    }
    let mounted = mount_root_relative(content, mount, known_mounts);
    lowercase_anchors(&mounted)
}

fn mount_root_relative(content: &str, mount: &str, known_mounts: &[String]) -> String {
    rewrite_each(content, |url| {
        if !url.starts_with('/') || url.starts_with("//") {
            return None;
        }
        if known_mounts.iter().any(|known| is_under_mount(known, url)) {
            return None;
        }
        Some(mount_path(mount, url))
    })
}

fn lowercase_anchors(content: &str) -> String {
    rewrite_each(content, |url| {
        if is_external(url) {
            return None;
        }
        let (path, anchor) = split_link_target(url);
        let lowered = with_lowercase_anchor(path, anchor);
        (lowered != url).then_some(lowered)
    })
}

fn rewrite_each(content: &str, mut rewrite: impl FnMut(&str) -> Option<String>) -> String {
    LINK.replace_all(content, |caps: &Captures<'_>| {
        let whole = caps[0].to_string();
        if !caps["bang"].is_empty() {
            return whole;
        }
        match rewrite(&caps["url"]) {
            Some(url) => format!("[{}]({url}{})", &caps["text"], &caps["rest"]),
            None => whole,
        }
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn mounts() -> Vec<String> {
        vec!["identityserver/v7".into(), "bff/v3".into()]
    }

    #[test]
    fn root_relative_links_are_mounted() {
        assert_eq!(
            rewrite_links("See [sessions](/session).", "identityserver/v7", &mounts()),
            "See [sessions](/identityserver/v7/session)."
        );
    }

    #[test]
    fn linked_image_mounts_the_link_and_keeps_the_image() {
        assert_eq!(
            rewrite_links("[![logo](/images/logo.png)](/docs)", "bff/v3", &mounts()),
            "[![logo](/images/logo.png)](/bff/v3/docs)"
        );
    }

    #[test]
    fn links_into_known_collections_are_kept() {
        let content = "[BFF](/bff/v3/overview) and [IS](/identityserver/v7/)";
        assert_eq!(rewrite_links(content, "identityserver/v7", &mounts()), content);
    }

    #[test]
    fn anchors_are_lower_cased_but_paths_are_not() {
        assert_eq!(
            rewrite_links("[a](Guide/Setup#Install-Steps) [b](#Top)", "bff/v3", &mounts()),
            "[a](Guide/Setup#install-steps) [b](#top)"
        );
    }

    #[test]
    fn external_links_and_images_are_skipped() {
        let content = "[x](https://example.com/#Frag) ![img](/images/Logo.png#Big) [p](//cdn.example.com/x)";
        assert_eq!(rewrite_links(content, "bff/v3", &mounts()), content);
    }

    #[test]
    fn link_titles_are_preserved() {
        assert_eq!(
            rewrite_links("[t](/tokens#Lifetime \"Tokens\")", "bff/v3", &mounts()),
            "[t](/bff/v3/tokens#lifetime \"Tokens\")"
        );
    }

    #[test]
    fn rewriting_twice_changes_nothing() {
        let once = rewrite_links("[s](/session#Cookie)", "bff/v3", &mounts());
        assert_eq!(rewrite_links(&once, "bff/v3", &mounts()), once);
    }
}
