//! Front matter model and the Hugo → Starlight dialect conversion.
//!
//! Hugo pages open with either a TOML block fenced by `+++` or a YAML block
//! fenced by `---`. Starlight only understands the YAML form and replaces
//! Hugo's `weight` ordering with a nested `sidebar.order` key.

use std::path::Path;

use serde_yaml::{Mapping, Value as YamlValue};
use toml::Value as TomlValue;

use crate::OperationError;

pub const TOML_DELIMITER: &str = "+++";
pub const YAML_DELIMITER: &str = "---";

/// Scalar front matter value. Anything else in a source block is rejected.
#[derive(Clone, Debug, PartialEq)]
pub enum FrontMatterValue {
    String(String),
    Integer(i64),
    Boolean(bool),
    Timestamp(String),
}

impl FrontMatterValue {
    fn to_yaml(&self) -> YamlValue {
        match self {
            FrontMatterValue::String(text) => YamlValue::String(text.clone()),
            FrontMatterValue::Integer(number) => YamlValue::Number((*number).into()),
            FrontMatterValue::Boolean(flag) => YamlValue::Bool(*flag),
            FrontMatterValue::Timestamp(stamp) => YamlValue::String(stamp.clone()),
        }
    }
}

/// Ordered front matter entries plus the Starlight sidebar position.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrontMatter {
    entries: Vec<(String, FrontMatterValue)>,
    sidebar_order: Option<FrontMatterValue>,
}

impl FrontMatter {
    /// Parse the body of a `+++` block.
    pub fn from_toml(source: &str, path: &Path) -> Result<Self, OperationError> {
        let table: toml::Table =
            toml::from_str(source).map_err(|source| OperationError::FrontMatterToml {
                path: path.to_path_buf(),
                source,
            })?;

        let mut front_matter = FrontMatter::default();
        for (key, value) in table {
            let value = match value {
                TomlValue::String(text) => FrontMatterValue::String(text),
                TomlValue::Integer(number) => FrontMatterValue::Integer(number),
                TomlValue::Boolean(flag) => FrontMatterValue::Boolean(flag),
                TomlValue::Datetime(stamp) => FrontMatterValue::Timestamp(stamp.to_string()),
                other => {
                    return Err(OperationError::UnsupportedFrontMatterValue {
                        path: path.to_path_buf(),
                        key,
                        kind: other.type_str(),
                    })
                }
            };
            front_matter.entries.push((key, value));
        }
        Ok(front_matter)
    }

    pub fn get(&self, key: &str) -> Option<&FrontMatterValue> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value)
    }

    fn remove(&mut self, key: &str) -> Option<FrontMatterValue> {
        let idx = self.entries.iter().position(|(candidate, _)| candidate == key)?;
        Some(self.entries.remove(idx).1)
    }

    /// Apply the Starlight conventions: drop `chapter`, move `weight` to
    /// `sidebar.order`, and default index pages without a weight to order 1.
    pub fn migrate(&mut self, is_index: bool) {
        self.remove("chapter");
        match self.remove("weight") {
            Some(weight) => self.sidebar_order = Some(weight),
            None if is_index => self.sidebar_order = Some(FrontMatterValue::Integer(1)),
            None => {}
        }
    }

    /// Serialize the entries as YAML (two-space nested indentation), without
    /// delimiters. Empty front matter serializes to an empty string.
    pub fn to_yaml(&self, path: &Path) -> Result<String, OperationError> {
        let mut mapping = Mapping::new();
        for (key, value) in &self.entries {
            mapping.insert(YamlValue::String(key.clone()), value.to_yaml());
        }
        if let Some(order) = &self.sidebar_order {
            let mut sidebar = Mapping::new();
            sidebar.insert(YamlValue::String("order".into()), order.to_yaml());
            mapping.insert(YamlValue::String("sidebar".into()), YamlValue::Mapping(sidebar));
        }

        mapping_to_yaml(&mapping, path)
    }
}

fn mapping_to_yaml(mapping: &Mapping, path: &Path) -> Result<String, OperationError> {
    if mapping.is_empty() {
        return Ok(String::new());
    }

    serde_yaml::to_string(mapping).map_err(|source| OperationError::FrontMatterYaml {
        path: path.to_path_buf(),
        source,
    })
}

/// Apply the same conventions to a parsed `---` block in place. Values other
/// than `chapter` and `weight` are kept exactly as parsed. Returns `false`
/// when the block carries neither Hugo key.
fn migrate_yaml(mapping: &mut Mapping, is_index: bool) -> bool {
    if !mapping.contains_key("weight") && !mapping.contains_key("chapter") {
        return false;
    }

    mapping.shift_remove("chapter");
    let order = match mapping.shift_remove("weight") {
        Some(weight) => weight,
        None if is_index => YamlValue::Number(1.into()),
        None => return true,
    };

    match mapping.get_mut("sidebar") {
        Some(YamlValue::Mapping(sidebar)) => {
            sidebar.insert(YamlValue::String("order".into()), order);
        }
        _ => {
            let mut sidebar = Mapping::new();
            sidebar.insert(YamlValue::String("order".into()), order);
            mapping.insert(YamlValue::String("sidebar".into()), YamlValue::Mapping(sidebar));
        }
    }
    true
}

/// A delimited block at the very top of a document.
#[derive(Debug, Eq, PartialEq)]
pub struct Block<'a> {
    /// Text between the delimiter lines.
    pub inner: &'a str,
    /// Everything after the closing delimiter line.
    pub rest: &'a str,
}

/// Locate a front matter block fenced by `delimiter` lines at the start of
/// `content`. Returns `Ok(None)` when the document does not open with the
/// delimiter and an error when the closing delimiter is missing.
pub fn split_block<'a>(
    content: &'a str,
    delimiter: &str,
    path: &Path,
) -> Result<Option<Block<'a>>, OperationError> {
    let Some(first_line_end) = line_end(content, 0) else {
        return Ok(None);
    };
    if content[..first_line_end].trim_end() != delimiter {
        return Ok(None);
    }

    let mut cursor = first_line_end;
    while cursor < content.len() {
        let end = line_end(content, cursor).unwrap_or(content.len());
        if content[cursor..end].trim_end() == delimiter {
            return Ok(Some(Block {
                inner: &content[first_line_end..cursor],
                rest: &content[end..],
            }));
        }
        cursor = end;
    }

    Err(OperationError::MalformedFrontMatter {
        path: path.to_path_buf(),
        reason: format!("missing closing '{delimiter}' delimiter"),
    })
}

/// Byte offset just past the line starting at `start` (including its `\n`).
fn line_end(content: &str, start: usize) -> Option<usize> {
    if start >= content.len() {
        return None;
    }
    Some(
        content[start..]
            .find('\n')
            .map_or(content.len(), |idx| start + idx + 1),
    )
}

/// Convert a leading TOML block to YAML, or migrate a leading YAML block that
/// still carries Hugo-only keys. Returns `None` when nothing needs to change.
pub fn convert(
    content: &str,
    path: &Path,
    is_index: bool,
) -> Result<Option<String>, OperationError> {
    if let Some(block) = split_block(content, TOML_DELIMITER, path)? {
        let mut front_matter = FrontMatter::from_toml(block.inner, path)?;
        front_matter.migrate(is_index);
        return Ok(Some(render(&front_matter, block.rest, path)?));
    }

    if let Some(block) = split_block(content, YAML_DELIMITER, path)? {
        if block.inner.trim().is_empty() {
            return Ok(None);
        }
        let mut mapping: Mapping =
            serde_yaml::from_str(block.inner).map_err(|source| OperationError::FrontMatterYaml {
                path: path.to_path_buf(),
                source,
            })?;
        if !migrate_yaml(&mut mapping, is_index) {
            return Ok(None);
        }
        let yaml = mapping_to_yaml(&mapping, path)?;
        return Ok(Some(wrap(&yaml, block.rest)));
    }

    Ok(None)
}

fn render(front_matter: &FrontMatter, rest: &str, path: &Path) -> Result<String, OperationError> {
    let yaml = front_matter.to_yaml(path)?;
    Ok(wrap(&yaml, rest))
}

fn wrap(yaml: &str, rest: &str) -> String {
    format!("{YAML_DELIMITER}\n{yaml}{YAML_DELIMITER}\n{rest}")
}

/// The `title` declared by a leading YAML block, if any.
pub fn yaml_title(content: &str, path: &Path) -> Result<Option<String>, OperationError> {
    let Some(block) = split_block(content, YAML_DELIMITER, path)? else {
        return Ok(None);
    };
    if block.inner.trim().is_empty() {
        return Ok(None);
    }

    let value: YamlValue =
        serde_yaml::from_str(block.inner).map_err(|source| OperationError::FrontMatterYaml {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(value
        .get("title")
        .and_then(YamlValue::as_str)
        .map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn page() -> &'static Path {
        Path::new("docs/page.md")
    }

    #[test]
    fn toml_front_matter_becomes_yaml_with_sidebar_order() {
        let content = "+++\ntitle = \"Sessions\"\nweight = 20\nchapter = true\ndraft = false\n+++\n\nBody\n";

        let converted = convert(content, page(), false).unwrap().unwrap();

        assert_eq!(
            converted,
            "---\ntitle: Sessions\ndraft: false\nsidebar:\n  order: 20\n---\n\nBody\n"
        );
    }

    #[test]
    fn index_without_weight_defaults_to_first() {
        let content = "+++\ntitle = \"Overview\"\n+++\n# Overview\n";

        let converted = convert(content, Path::new("index.md"), true).unwrap().unwrap();

        assert_eq!(converted, "---\ntitle: Overview\nsidebar:\n  order: 1\n---\n# Overview\n");
    }

    #[test]
    fn non_index_without_weight_gets_no_sidebar() {
        let content = "+++\ntitle = \"Page\"\n+++\n";
        let converted = convert(content, page(), false).unwrap().unwrap();
        assert_eq!(converted, "---\ntitle: Page\n---\n");
    }

    #[test]
    fn timestamps_are_kept_as_text() {
        let content = "+++\ndate = 2020-09-10T08:22:12+02:00\n+++\n";
        let mut front_matter =
            FrontMatter::from_toml(split_block(content, TOML_DELIMITER, page()).unwrap().unwrap().inner, page())
                .unwrap();
        front_matter.migrate(false);
        assert_eq!(
            front_matter.get("date"),
            Some(&FrontMatterValue::Timestamp("2020-09-10T08:22:12+02:00".into()))
        );
    }

    #[test]
    fn arrays_are_rejected() {
        let content = "+++\ntags = [\"a\"]\n+++\n";
        let err = convert(content, page(), false).unwrap_err();
        assert!(matches!(
            err,
            OperationError::UnsupportedFrontMatterValue { ref key, kind: "array", .. } if key == "tags"
        ));
    }

    #[test]
    fn missing_closing_delimiter_is_malformed() {
        let err = convert("+++\ntitle = \"x\"\n", page(), false).unwrap_err();
        assert!(matches!(err, OperationError::MalformedFrontMatter { .. }));
    }

    #[test]
    fn yaml_with_hugo_keys_is_migrated() {
        let content = "---\ntitle: Tokens\nweight: 3\n---\nBody\n";
        let converted = convert(content, page(), false).unwrap().unwrap();
        assert_eq!(converted, "---\ntitle: Tokens\nsidebar:\n  order: 3\n---\nBody\n");
    }

    #[test]
    fn yaml_lists_survive_weight_migration() {
        let content = "---\ntitle: T\nweight: 3\naliases:\n  - /old/\n---\nBody\n";

        let converted = convert(content, page(), false).unwrap().unwrap();

        let block = split_block(&converted, YAML_DELIMITER, page()).unwrap().unwrap();
        let mapping: Mapping = serde_yaml::from_str(block.inner).unwrap();
        let keys = mapping.keys().filter_map(YamlValue::as_str).collect::<Vec<_>>();
        assert_eq!(keys, vec!["title", "aliases", "sidebar"]);
        assert_eq!(mapping["aliases"], serde_yaml::from_str::<YamlValue>("[/old/]").unwrap());
        assert_eq!(mapping["sidebar"]["order"].as_i64(), Some(3));
        assert_eq!(block.rest, "Body\n");
    }

    #[test]
    fn yaml_chapter_on_index_adds_default_order_to_existing_sidebar() {
        let content = "---\ntitle: Guide\nchapter: true\nsidebar:\n  label: Start\n---\n";

        let converted = convert(content, Path::new("index.md"), true).unwrap().unwrap();

        assert_eq!(
            converted,
            "---\ntitle: Guide\nsidebar:\n  label: Start\n  order: 1\n---\n"
        );
    }

    #[test]
    fn converted_yaml_is_left_alone() {
        let content = "---\ntitle: Tokens\nsidebar:\n  order: 3\n---\nBody\n";
        assert_eq!(convert(content, page(), true).unwrap(), None);
    }

    #[test]
    fn recovers_yaml_title() {
        let content = "---\ntitle: \"Hello: World\"\n---\n# Hello: World\n";
        assert_eq!(
            yaml_title(content, page()).unwrap(),
            Some("Hello: World".to_string())
        );
        assert_eq!(yaml_title("---\n---\nBody", page()).unwrap(), None);
        assert_eq!(yaml_title("No front matter", page()).unwrap(), None);
    }
}
