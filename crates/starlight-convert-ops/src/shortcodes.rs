//! Hugo shortcode to Starlight directive translation.
//!
//! Translation runs as a fixed sequence of pattern rewrites. Any `{{<` or
//! `{{%` opener left afterwards is an error naming the offending line.

use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use starlight_convert_config::{CrossProductRef, SiteConfig};

use crate::pipeline::Collection;
use crate::resolve::resolve_reference;
use crate::text::{byte_to_line, compute_line_offsets, line_at, try_replace_all};
use crate::OperationError;

/// Text left where a Hugo `children` listing used to be.
pub const CHILDREN_PLACEHOLDER: &str = "TODO LIST CHILDREN HERE";

const YOUTUBE_IFRAME_ATTRIBUTES: &str = concat!(
    r#"title="YouTube video player" frameborder="0" "#,
    r#"allow="accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture; web-share" "#,
    r#"referrerpolicy="strict-origin-when-cross-origin" allowfullscreen"#,
);

static PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\{\{[<%]\s*param\s+"?(?P<name>[\w.-]+)"?\s*[>%]\}\}"#).unwrap()
});

static REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\{\{[<%]\s*(?:rel)?ref\s+"(?P<path>[^"]*)"\s*[>%]\}\}"#).unwrap()
});

static NOTICE_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\{\{[<%]\s*notice\s+(?P<kind>\w+)(?:\s+"(?P<title>[^"]*)")?\s*[>%]\}\}"#).unwrap()
});

static NOTICE_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{[<%]\s*/notice\s*[>%]\}\}").unwrap());

static CHILDREN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{[<%]\s*children\b[^}]*[>%]\}\}").unwrap());

static MERMAID_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{[<%]\s*mermaid\b[^}]*[>%]\}\}").unwrap());

static MERMAID_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{[<%]\s*/mermaid\s*[>%]\}\}").unwrap());

static YOUTUBE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\{\{[<%]\s*youtube\s+(?:id=)?"?(?P<id>[A-Za-z0-9_-]+)"?[^}]*[>%]\}\}"#).unwrap()
});

static BRACED_URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\{\{(?P<scheme>http)").unwrap());

static RESIDUE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\{[<%]").unwrap());

/// Starlight aside kind for a Hugo notice type.
pub fn notice_kind(kind: &str) -> &'static str {
    match kind.to_ascii_lowercase().as_str() {
        "note" | "info" => "note",
        "tip" => "tip",
        "warning" => "caution",
        "danger" => "danger",
        _ => "note",
    }
}

struct CrossProductPattern {
    pattern: Regex,
    mount: String,
}

/// Compiled shortcode translator. Built once per run.
#[derive(Default)]
pub struct Shortcodes {
    cross_product: Vec<CrossProductPattern>,
}

impl Shortcodes {
    /// Compile the configured cross-product reference shortcodes.
    pub fn new(refs: &[CrossProductRef]) -> Result<Self, OperationError> {
        let cross_product = refs
            .iter()
            .map(|reference| {
                let source = format!(
                    r#"\{{\{{[<%]\s*{}\s+"(?P<path>[^"]*)"(?:\s+"(?P<text>[^"]*)")?\s*[>%]\}}\}}"#,
                    regex::escape(&reference.shortcode)
                );
                Regex::new(&source)
                    .map(|pattern| CrossProductPattern {
                        pattern,
                        mount: reference.mount.trim_matches('/').to_string(),
                    })
                    .map_err(|source| OperationError::ShortcodePattern {
                        shortcode: reference.shortcode.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Shortcodes { cross_product })
    }

    /// Translate every shortcode in `content`, a page at `file` inside
    /// `collection`.
    pub fn translate(
        &self,
        content: &str,
        file: &Path,
        collection: &Collection,
        site: &SiteConfig,
    ) -> Result<String, OperationError> {
        if !content.contains("{{") {
            return Ok(content.to_string());
        }

        let mut text = try_replace_all(&PARAM, content, |caps| {
            let name = &caps["name"];
            site.get(name)
                .map(str::to_string)
                .ok_or_else(|| OperationError::MissingParameter {
                    path: file.to_path_buf(),
                    name: name.to_string(),
                })
        })?;

        for cross in &self.cross_product {
            text = cross
                .pattern
                .replace_all(&text, |caps: &Captures<'_>| {
                    let target = format!("/{}/{}", cross.mount, caps["path"].trim_start_matches('/'));
                    match caps.name("text").map(|m| m.as_str()).filter(|t| !t.is_empty()) {
                        Some(label) => format!("[{label}]({target})"),
                        None => target,
                    }
                })
                .into_owned();
        }

        text = try_replace_all(&REF, &text, |caps| {
            resolve_reference(file, &caps["path"], collection)
        })?;

        text = NOTICE_OPEN
            .replace_all(&text, |caps: &Captures<'_>| {
                let kind = notice_kind(&caps["kind"]);
                match caps.name("title").map(|m| m.as_str()).filter(|t| !t.is_empty()) {
                    Some(title) => format!(":::{kind}[{title}]"),
                    None => format!(":::{kind}"),
                }
            })
            .into_owned();
        text = NOTICE_CLOSE.replace_all(&text, ":::").into_owned();

        text = CHILDREN.replace_all(&text, CHILDREN_PLACEHOLDER).into_owned();

        text = MERMAID_OPEN.replace_all(&text, "```mermaid").into_owned();
        text = MERMAID_CLOSE.replace_all(&text, "```").into_owned();

        text = YOUTUBE
            .replace_all(&text, |caps: &Captures<'_>| {
                format!(
                    r#"<iframe width="853" height="505" src="https://www.youtube.com/embed/{}" {YOUTUBE_IFRAME_ATTRIBUTES}></iframe>"#,
                    &caps["id"]
                )
            })
            .into_owned();

        text = BRACED_URL.replace_all(&text, "$scheme").into_owned();

        ensure_converted(&text, file)?;
        Ok(text)
    }
}

fn ensure_converted(text: &str, file: &Path) -> Result<(), OperationError> {
    let Some(found) = RESIDUE.find(text) else {
        return Ok(());
    };
    let offsets = compute_line_offsets(text);
    Err(OperationError::UnconvertedShortcode {
        path: file.to_path_buf(),
        line: byte_to_line(found.start(), &offsets),
        snippet: line_at(text, found.start()).trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn collection() -> Collection {
        Collection {
            mount: "identityserver/v7".into(),
            root: PathBuf::from("/nonexistent/identityserver/v7"),
        }
    }

    fn site() -> SiteConfig {
        SiteConfig::parse("[params]\nqs_base = \"https://example.com/qs\"\n", Path::new("config.toml"))
            .unwrap()
    }

    fn translate(content: &str) -> Result<String, OperationError> {
        let shortcodes = Shortcodes::new(&[CrossProductRef {
            shortcode: "ref-idsrv".into(),
            mount: "identityserver/v7".into(),
        }])
        .unwrap();
        shortcodes.translate(
            content,
            Path::new("/nonexistent/identityserver/v7/page.md"),
            &collection(),
            &site(),
        )
    }

    #[test]
    fn text_without_openers_is_untouched() {
        let content = "Plain text with } and { braces";
        assert_eq!(translate(content).unwrap(), content);
    }

    #[test]
    fn notices_become_asides() {
        let content = "{{% notice warning %}}\nCareful\n{{% /notice %}}\n{{% notice Info \"Heads up\" %}}\nx\n{{% /notice %}}\n{{% notice custom %}}y{{% /notice %}}";
        assert_eq!(
            translate(content).unwrap(),
            ":::caution\nCareful\n:::\n:::note[Heads up]\nx\n:::\n:::notey:::"
        );
    }

    #[test]
    fn maps_every_notice_type() {
        assert_eq!(notice_kind("note"), "note");
        assert_eq!(notice_kind("info"), "note");
        assert_eq!(notice_kind("tip"), "tip");
        assert_eq!(notice_kind("warning"), "caution");
        assert_eq!(notice_kind("danger"), "danger");
        assert_eq!(notice_kind("mystery"), "note");
    }

    #[test]
    fn params_come_from_site_config() {
        assert_eq!(
            translate("See {{< param qs_base >}}/intro").unwrap(),
            "See https://example.com/qs/intro"
        );
        let err = translate("{{< param missing >}}").unwrap_err();
        assert!(matches!(err, OperationError::MissingParameter { ref name, .. } if name == "missing"));
    }

    #[test]
    fn root_relative_refs_are_mounted() {
        assert_eq!(
            translate("[Sessions]({{< ref \"/session\" >}})").unwrap(),
            "[Sessions](/identityserver/v7/session)"
        );
        assert_eq!(
            translate("[Top]({{< relref \"#Overview\" >}})").unwrap(),
            "[Top](#overview)"
        );
    }

    #[test]
    fn cross_product_refs_point_at_other_collection() {
        assert_eq!(
            translate("{{< ref-idsrv \"/apis/add-apis\" >}}").unwrap(),
            "/identityserver/v7/apis/add-apis"
        );
        assert_eq!(
            translate("{{< ref-idsrv \"/apis\" \"API docs\" >}}").unwrap(),
            "[API docs](/identityserver/v7/apis)"
        );
    }

    #[test]
    fn media_shortcodes_are_expanded() {
        assert_eq!(
            translate("{{< mermaid align=\"center\" >}}\ngraph TD\n{{< /mermaid >}}").unwrap(),
            "```mermaid\ngraph TD\n```"
        );
        assert_eq!(
            translate("{{% children style=\"li\" /%}}").unwrap(),
            CHILDREN_PLACEHOLDER
        );
        let iframe = translate("{{< youtube \"zHVmzgPUImc\" >}}").unwrap();
        assert!(iframe.starts_with(
            "<iframe width=\"853\" height=\"505\" src=\"https://www.youtube.com/embed/zHVmzgPUImc\""
        ));
        assert!(iframe.ends_with("allowfullscreen></iframe>"));
    }

    #[test]
    fn braced_urls_lose_their_braces() {
        assert_eq!(translate("{{https://duende.dev").unwrap(), "https://duende.dev");
    }

    #[test]
    fn template_braces_in_code_are_allowed() {
        let content = "```html\n<p>{{ user.name }}</p>\n```";
        assert_eq!(translate(content).unwrap(), content);
    }

    #[test]
    fn unknown_shortcode_is_reported_with_line() {
        let err = translate("intro\n\n{{< tabs >}}\n").unwrap_err();
        match err {
            OperationError::UnconvertedShortcode { line, snippet, .. } => {
                assert_eq!(line, 3);
                assert_eq!(snippet, "{{< tabs >}}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn translation_is_idempotent() {
        let once = translate("{{% notice tip %}}\nx\n{{% /notice %}}").unwrap();
        assert_eq!(translate(&once).unwrap(), once);
    }
}
