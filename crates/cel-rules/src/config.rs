//! Serializable environment and rule configuration.
//!
//! ```json
//! {
//!   "variables": [
//!     { "name": "totalAmount", "type": "int" },
//!     { "name": "items", "type": "list<map<string, dyn>>" }
//!   ]
//! }
//! ```

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::env::EnvError;
use crate::rules::Rule;
use crate::types::{CelType, TypeParseError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Env(#[from] EnvError),
}

/// One declared input variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableConfig {
    pub name: String,
    /// CEL spelling, e.g. `int` or `list<map<string, dyn>>`.
    #[serde(rename = "type")]
    pub type_name: String,
}

impl VariableConfig {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }

    pub fn cel_type(&self) -> Result<CelType, TypeParseError> {
        CelType::from_str(&self.type_name)
    }
}

/// The variables visible to every expression compiled by an environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvConfig {
    #[serde(default)]
    pub variables: Vec<VariableConfig>,
}

impl EnvConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json(&read(path.as_ref())?)
    }

    pub fn with_variable(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.variables.push(VariableConfig::new(name, type_name));
        self
    }
}

/// Stored rules, as loaded at startup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl RuleSet {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json(&read(path.as_ref())?)
    }

    pub fn active(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|r| r.active)
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_variable_declarations() {
        let config = EnvConfig::from_json(
            r#"{"variables": [
                {"name": "totalAmount", "type": "int"},
                {"name": "items", "type": "list<map<string, dyn>>"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(config.variables.len(), 2);
        assert_eq!(config.variables[0].cel_type().unwrap(), CelType::Int);
        assert_eq!(
            config.variables[1].cel_type().unwrap(),
            CelType::list(CelType::map(CelType::String, CelType::Dyn))
        );
    }

    #[test]
    fn unknown_type_names_are_rejected() {
        let var = VariableConfig::new("x", "uint");
        assert!(var.cel_type().is_err());
    }

    #[test]
    fn empty_object_is_an_empty_config() {
        assert_eq!(EnvConfig::from_json("{}").unwrap(), EnvConfig::default());
        assert!(matches!(EnvConfig::from_json("[1]"), Err(ConfigError::Json(_))));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = EnvConfig::from_path("/nonexistent/cel-rules.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn rule_set_filters_inactive_rules() {
        let set = RuleSet::from_json(
            r#"{"rules": [
                {"id": 1, "name": "big order", "celExpression": "totalAmount > 100",
                 "rewardType": "PERCENTAGE", "multiplier": 0.1, "active": true},
                {"id": 2, "name": "off", "celExpression": "true",
                 "rewardType": "FIXED_AMOUNT", "fixedAmount": 5000, "active": false}
            ]}"#,
        )
        .unwrap();
        assert_eq!(set.rules.len(), 2);
        let active: Vec<_> = set.active().map(|r| r.name.as_str()).collect();
        assert_eq!(active, vec!["big order"]);
    }
}
