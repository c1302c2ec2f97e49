use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

pub type ParsedConfig = BTreeMap<String, ConfigValue>;

/// A decoded vkBasalt setting. Variant order matters for untagged decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Other(serde_json::Value),
}

impl ConfigValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }
}

impl Display for ConfigValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
            Self::Other(value) => write!(f, "{value}"),
        }
    }
}

/// Decodes `key = value` text the way the backend does: integer, then float, then boolean,
/// then plain text with surrounding double quotes removed.
///
/// Two places differ from the backend's reader. A repeated key is not an error here; the
/// later line wins. Integers that do not fit in `i64` decode as `Float`.
pub fn parse_config_text(text: &str) -> ParsedConfig {
    let mut parsed = ParsedConfig::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        let Some(split) = line.find(['=', ':']) else {
            continue;
        };
        let key = line[..split].trim();
        if key.is_empty() {
            continue;
        }
        let raw = line[split + 1..].trim();
        parsed.insert(key.to_owned(), coerce(raw));
    }

    parsed
}

fn coerce(raw: &str) -> ConfigValue {
    if let Ok(value) = raw.parse::<i64>() {
        return ConfigValue::Int(value);
    }
    if let Ok(value) = raw.parse::<f64>() {
        return ConfigValue::Float(value);
    }
    match raw.to_ascii_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => return ConfigValue::Bool(true),
        "0" | "no" | "false" | "off" => return ConfigValue::Bool(false),
        _ => {}
    }
    ConfigValue::Text(raw.trim_matches('"').to_owned())
}
