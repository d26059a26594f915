//! Config override trees and their CLI flag serialization.
//!
//! The Codex CLI accepts repeated `--config key=value` arguments whose values
//! use TOML syntax. Callers describe overrides as a nested tree; this module
//! flattens the tree into dotted-path `key=value` strings, one per leaf, in
//! insertion order.

use serde_json::Value;

use crate::error::{Error, Result};

/// A single value in a config override tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    /// A string, rendered as a quoted TOML string.
    String(String),
    /// A boolean, rendered bare.
    Bool(bool),
    /// An integer, rendered bare.
    Int(i64),
    /// A float, rendered bare. Must be finite.
    Float(f64),
    /// A list, rendered as a TOML array.
    List(Vec<ConfigValue>),
    /// A nested table. Nested tables extend the dotted path; tables inside
    /// lists render as inline tables.
    Map(Vec<(String, ConfigValue)>),
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ConfigValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl<T: Into<ConfigValue>> From<Vec<T>> for ConfigValue {
    fn from(value: Vec<T>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}

impl TryFrom<Value> for ConfigValue {
    type Error = Error;

    /// Converts a JSON value into a config value.
    ///
    /// `null` anywhere in the tree is rejected, matching the CLI's config
    /// syntax which has no null literal. Object keys iterate in
    /// `serde_json`'s map order, which is deterministic.
    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Null => Err(Error::InvalidConfig {
                message: "config override values cannot be null".to_string(),
            }),
            Value::Bool(b) => Ok(Self::Bool(b)),
            Value::Number(n) => n.as_i64().map_or_else(
                || {
                    n.as_f64().map(Self::Float).ok_or_else(|| Error::InvalidConfig {
                        message: format!("unsupported config override number: {n}"),
                    })
                },
                |i| Ok(Self::Int(i)),
            ),
            Value::String(s) => Ok(Self::String(s)),
            Value::Array(items) => Ok(Self::List(
                items.into_iter().map(Self::try_from).collect::<Result<_>>()?,
            )),
            Value::Object(map) => Ok(Self::Map(
                map.into_iter()
                    .map(|(k, v)| Ok((k, Self::try_from(v)?)))
                    .collect::<Result<_>>()?,
            )),
        }
    }
}

/// An ordered tree of config overrides, flattened to `--config` arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    entries: Vec<(String, ConfigValue)>,
}

impl ConfigOverrides {
    /// Creates an empty override tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an override, builder style.
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.entries.push((key.into(), value.into()));
        self
    }

    /// Adds an override in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Returns `true` if no overrides are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flattens the tree into `dotted.path=value` strings, one per leaf, in
    /// input iteration order. An empty nested table yields an explicit
    /// `path={}` entry; an empty top-level tree yields nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for empty keys or non-finite floats.
    pub fn serialize(&self) -> Result<Vec<String>> {
        let mut out = Vec::new();
        flatten_entries(&self.entries, "", &mut out)?;
        Ok(out)
    }
}

impl TryFrom<Value> for ConfigOverrides {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match ConfigValue::try_from(value)? {
            ConfigValue::Map(entries) => Ok(Self { entries }),
            _ => Err(Error::InvalidConfig {
                message: "config overrides must be a plain object".to_string(),
            }),
        }
    }
}

fn flatten_entries(
    entries: &[(String, ConfigValue)],
    prefix: &str,
    out: &mut Vec<String>,
) -> Result<()> {
    for (key, value) in entries {
        if key.is_empty() {
            return Err(Error::InvalidConfig {
                message: "config override keys must be non-empty strings".to_string(),
            });
        }
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            ConfigValue::Map(children) if children.is_empty() => {
                out.push(format!("{path}={{}}"));
            }
            ConfigValue::Map(children) => flatten_entries(children, &path, out)?,
            leaf => out.push(format!("{path}={}", render_value(leaf, &path)?)),
        }
    }
    Ok(())
}

fn render_value(value: &ConfigValue, path: &str) -> Result<String> {
    match value {
        ConfigValue::String(s) => Ok(quote_string(s)),
        ConfigValue::Bool(b) => Ok(if *b { "true" } else { "false" }.to_string()),
        ConfigValue::Int(i) => Ok(i.to_string()),
        ConfigValue::Float(f) => render_float(*f, path),
        ConfigValue::List(items) => {
            let rendered = items
                .iter()
                .enumerate()
                .map(|(index, item)| render_value(item, &format!("{path}[{index}]")))
                .collect::<Result<Vec<_>>>()?;
            Ok(format!("[{}]", rendered.join(", ")))
        }
        ConfigValue::Map(entries) => {
            let mut parts = Vec::with_capacity(entries.len());
            for (key, child) in entries {
                if key.is_empty() {
                    return Err(Error::InvalidConfig {
                        message: "config override keys must be non-empty strings".to_string(),
                    });
                }
                let rendered = render_value(child, &format!("{path}.{key}"))?;
                parts.push(format!("{} = {rendered}", render_key(key)));
            }
            Ok(format!("{{{}}}", parts.join(", ")))
        }
    }
}

fn render_float(value: f64, path: &str) -> Result<String> {
    if !value.is_finite() {
        return Err(Error::InvalidConfig {
            message: format!("config override at {path} must be a finite number"),
        });
    }
    let mut rendered = value.to_string();
    // Keep integral floats typed as TOML floats.
    if !rendered.contains('.') {
        rendered.push_str(".0");
    }
    Ok(rendered)
}

fn is_bare_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn render_key(key: &str) -> String {
    if is_bare_key(key) {
        key.to_string()
    } else {
        quote_string(key)
    }
}

fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
