use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// A value in the strings document: display text or a keyword set.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum StringValue {
    Text(String),
    List(Vec<String>),
}

/// Keywords and reply templates loaded from the localized strings document.
#[derive(Debug, Clone, Default)]
pub struct Strings {
    entries: HashMap<String, StringValue>,
}

impl Strings {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read strings file: {}", path.display()))?;
        let strings = Self::from_json_str(&content)
            .with_context(|| format!("Failed to parse strings file: {}", path.display()))?;
        info!("Loaded {} strings from {}", strings.len(), path.display());
        Ok(strings)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let entries: HashMap<String, StringValue> = serde_json::from_str(content)?;
        Ok(Self { entries })
    }

    /// Text for `key`; a missing key or a list value is an error.
    pub fn text(&self, key: &str) -> Result<&str> {
        match self.entries.get(key) {
            Some(StringValue::Text(s)) => Ok(s.as_str()),
            Some(StringValue::List(_)) => anyhow::bail!("string '{}' is a list, expected text", key),
            None => anyhow::bail!("string '{}' is missing", key),
        }
    }

    /// Text for `key`, or `None` when absent.
    pub fn optional(&self, key: &str) -> Option<String> {
        match self.entries.get(key) {
            Some(StringValue::Text(s)) => Some(s.clone()),
            _ => None,
        }
    }

    /// Text for `key`, degrading to `fallback` with a warning.
    pub fn text_or(&self, key: &str, fallback: &str) -> String {
        match self.text(key) {
            Ok(s) => s.to_string(),
            Err(e) => {
                warn!("{}, using fallback", e);
                fallback.to_string()
            }
        }
    }

    /// Keyword set for `key`. A single text value is treated as a one-item set.
    pub fn list(&self, key: &str) -> Vec<String> {
        match self.entries.get(key) {
            Some(StringValue::List(items)) => items.clone(),
            Some(StringValue::Text(s)) => vec![s.clone()],
            None => {
                warn!("string list '{}' is missing", key);
                Vec::new()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
