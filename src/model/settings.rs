//! Flat project settings

use crate::error::{Error, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Settings key listing the names of user-overridden settings
pub const DIFFERENT_SETTINGS_KEY: &str = "different_settings_to_system";

/// Project settings: name → value plus the overridden-name set
///
/// Values keep their document order so that a rewritten settings document
/// lists keys the way the original did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsMap {
    values: Map<String, Value>,
    overridden: BTreeSet<String>,
}

impl SettingsMap {
    /// Create a settings map
    pub fn new(values: Map<String, Value>, overridden: BTreeSet<String>) -> Self {
        Self { values, overridden }
    }

    /// All values in document order
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Names flagged as differing from the printer default
    pub fn overridden(&self) -> &BTreeSet<String> {
        &self.overridden
    }

    /// Raw value of a setting
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// String value of a setting
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    /// List value of a setting, with scalars read as one-element lists
    pub fn get_list(&self, name: &str) -> Vec<String> {
        match self.values.get(name) {
            Some(Value::Array(items)) => items.iter().filter_map(scalar_to_string).collect(),
            Some(other) => scalar_to_string(other).into_iter().collect(),
            None => Vec::new(),
        }
    }

    /// Whether a setting is in the overridden set
    pub fn is_overridden(&self, name: &str) -> bool {
        self.overridden.contains(name)
    }

    /// Whether a setting holds a true value (`"1"`, `"true"`, `true`, non-zero)
    pub fn is_true(&self, name: &str) -> bool {
        self.values.get(name).is_some_and(is_truthy)
    }

    /// Serialize as pretty JSON with four-space indentation
    pub fn to_pretty_json(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.values
            .serialize(&mut serializer)
            .map_err(|e| Error::internal(format!("Failed to serialize settings: {}", e)))?;
        Ok(buf)
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => {
            let s = s.trim();
            s == "1" || s.eq_ignore_ascii_case("true")
        }
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(items) if items.len() == 1 => is_truthy(&items[0]),
        _ => false,
    }
}
