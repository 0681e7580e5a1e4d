//! Hugo site configuration flattened into `param` shortcode values.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use toml::{Table, Value};

use crate::ConfigError;

/// Case-insensitive parameter map read from a folder's Hugo site config.
#[derive(Clone, Debug, Default)]
pub struct SiteConfig {
    params: HashMap<String, String>,
    origin: Option<PathBuf>,
}

impl SiteConfig {
    /// Load the first candidate that exists, relative to `source_dir`.
    ///
    /// A folder without any site config yields an empty map.
    pub fn load(source_dir: &Path, candidates: &[PathBuf]) -> Result<Self, ConfigError> {
        let Some(path) = candidates
            .iter()
            .map(|candidate| source_dir.join(candidate))
            .find(|path| path.is_file())
        else {
            tracing::warn!(
                source_dir = %source_dir.display(),
                "no site configuration found; param shortcodes cannot be resolved"
            );
            return Ok(SiteConfig::default());
        };

        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let mut config = SiteConfig::parse(&contents, &path)?;
        tracing::debug!(
            path = %path.display(),
            params = config.len(),
            "loaded site configuration"
        );
        config.origin = Some(path);
        Ok(config)
    }

    /// Parse site configuration text. `path` is only used for error reporting.
    pub fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let table: Table = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let mut params = HashMap::new();
        flatten(&table, path, &mut params)?;
        Ok(SiteConfig {
            params,
            origin: None,
        })
    }

    /// Look up a parameter by name, ignoring ASCII case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// The file this configuration was read from, if any.
    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }

    /// Parameters sorted by (lower-cased) name.
    pub fn entries(&self) -> Vec<(&str, &str)> {
        let mut entries = self
            .params
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect::<Vec<_>>();
        entries.sort();
        entries
    }
}

/// Scalars of a table are recorded before its nested tables are visited, so
/// `[params]` entries win over same-named top-level keys.
fn flatten(
    table: &Table,
    path: &Path,
    params: &mut HashMap<String, String>,
) -> Result<(), ConfigError> {
    let mut nested = Vec::new();
    for (key, value) in table {
        let rendered = match value {
            Value::String(text) => text.clone(),
            Value::Integer(number) => number.to_string(),
            Value::Boolean(flag) => flag.to_string(),
            Value::Datetime(datetime) => datetime.to_string(),
            Value::Array(_) => continue,
            Value::Table(inner) => {
                nested.push(inner);
                continue;
            }
            Value::Float(_) => {
                return Err(ConfigError::UnsupportedValue {
                    path: path.to_path_buf(),
                    key: key.clone(),
                    kind: value.type_str(),
                })
            }
        };
        params.insert(key.trim().to_ascii_lowercase(), rendered);
    }

    for inner in nested {
        flatten(inner, path, params)?;
    }
    Ok(())
}
