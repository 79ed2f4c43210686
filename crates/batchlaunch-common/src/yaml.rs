//! YAML loading for batch configuration files
//!
//! Parses with yaml-rust2 and converts to `serde_json::Value`, so the rest of the
//! pipeline (merging, typed deserialization, dry-run output) works on one value type.

use std::path::Path;

use serde_json::{Map, Number, Value};
use yaml_rust2::{Yaml, YamlLoader};

use crate::Error;

/// A YAML document that could not be parsed or converted
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct YamlError(String);

impl YamlError {
    fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Parse YAML text into a JSON value.
///
/// Only the first document counts; empty input yields `Value::Null`.
pub fn parse_yaml(input: &str) -> Result<Value, YamlError> {
    let mut docs =
        YamlLoader::load_from_str(input).map_err(|e| YamlError::new(e.to_string()))?;
    if docs.is_empty() {
        return Ok(Value::Null);
    }
    to_json(docs.swap_remove(0))
}

/// Read and parse a YAML file.
pub fn load_yaml_file(path: &Path) -> crate::Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_yaml(&content).map_err(|e| Error::Yaml {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn to_json(node: Yaml) -> Result<Value, YamlError> {
    let value = match node {
        Yaml::Null => Value::Null,
        Yaml::Boolean(flag) => Value::Bool(flag),
        Yaml::Integer(n) => Value::from(n),
        // JSON has no infinity or NaN, so `.inf` and `.nan` keep their YAML spelling
        Yaml::Real(text) => match text.parse::<f64>().ok().and_then(Number::from_f64) {
            Some(n) => Value::Number(n),
            None => Value::String(text),
        },
        Yaml::String(text) => Value::String(text),
        Yaml::Array(items) => {
            let items = items.into_iter().map(to_json).collect::<Result<_, _>>()?;
            Value::Array(items)
        }
        Yaml::Hash(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for (key, node) in entries {
                map.insert(key_string(key)?, to_json(node)?);
            }
            Value::Object(map)
        }
        Yaml::Alias(_) => return Err(YamlError::new("anchors and aliases are not supported")),
        Yaml::BadValue => return Err(YamlError::new("malformed YAML value")),
    };
    Ok(value)
}

/// Mapping keys are always strings in the converted value
fn key_string(key: Yaml) -> Result<String, YamlError> {
    match key {
        Yaml::String(s) | Yaml::Real(s) => Ok(s),
        Yaml::Integer(n) => Ok(n.to_string()),
        Yaml::Boolean(b) => Ok(b.to_string()),
        Yaml::Null => Ok("null".to_string()),
        other => Err(YamlError::new(format!("unsupported mapping key {other:?}"))),
    }
}
