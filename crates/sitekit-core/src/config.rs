//! Site configuration loading.
//!
//! The site configuration is the generator's own YAML file (`mkdocs.yml`).
//! Only a handful of keys are consumed, so the document is kept as a raw
//! mapping and read through accessors that default missing keys to empty
//! values.

use std::path::Path;

use serde_yaml::{Mapping, Value};

use crate::error::{CoreError, Result};

/// Loaded site configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    values: Mapping,
}

impl Config {
    /// Load configuration from a YAML file.
    ///
    /// A missing file, invalid YAML, or a document that is not a mapping is
    /// a configuration error. An empty document loads as an empty mapping.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&content).map_err(|e| match e {
            CoreError::Config { message, source } => CoreError::Config {
                message: format!("{message} ({})", path.display()),
                source,
            },
            other => other,
        })?;

        tracing::debug!(path = %path.display(), keys = config.values.len(), "loaded configuration");
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(content)
            .map_err(|e| CoreError::config_with_source("Failed to parse config file", e))?;

        match value {
            Value::Mapping(values) => Ok(Self { values }),
            Value::Null => Ok(Self::default()),
            _ => Err(CoreError::config(
                "Config file must contain a mapping at the top level",
            )),
        }
    }

    /// Raw value for a top-level key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// String value for a top-level key, or `""` when absent or not a string.
    ///
    /// Numbers and booleans are not coerced.
    #[must_use]
    pub fn get_str(&self, key: &str) -> &str {
        self.get(key).and_then(Value::as_str).unwrap_or("")
    }

    /// The `site_name` key.
    #[must_use]
    pub fn site_name(&self) -> &str {
        self.get_str("site_name")
    }

    /// The `site_url` key.
    #[must_use]
    pub fn site_url(&self) -> &str {
        self.get_str("site_url")
    }
}
