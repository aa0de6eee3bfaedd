//! Editor configuration loaded from a JSON file.

use crate::ddl::{DdlOptions, Dialect};
use crate::view::ViewLevel;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_ACTOR: &str = "local-user";
const DEFAULT_SUGGESTION_LIMIT: usize = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    pub actor_id: String,
    pub initial_view: ViewLevel,
    pub dialect: Dialect,
    pub align_columns: bool,
    pub suggestion_limit: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            actor_id: DEFAULT_ACTOR.to_string(),
            initial_view: ViewLevel::Table,
            dialect: Dialect::Generic,
            align_columns: true,
            suggestion_limit: DEFAULT_SUGGESTION_LIMIT,
        }
    }
}

impl EditorConfig {
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.actor_id.trim().is_empty() {
            return Err(ConfigError::Invalid("actorId must not be empty".into()));
        }
        if self.suggestion_limit == 0 {
            return Err(ConfigError::Invalid("suggestionLimit must be at least 1".into()));
        }
        Ok(())
    }

    pub fn ddl_options(&self) -> DdlOptions {
        DdlOptions {
            dialect: self.dialect.for_output(),
            align_columns: self.align_columns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = EditorConfig::from_json(r#"{"initialView": "attribute"}"#).unwrap();
        assert_eq!(config.initial_view, ViewLevel::Attribute);
        assert_eq!(config.actor_id, "local-user");
        assert_eq!(config.suggestion_limit, 5);
        assert!(config.align_columns);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"actorId": "ana", "dialect": "mysql", "alignColumns": false}}"#).unwrap();

        let config = EditorConfig::load(file.path()).unwrap();
        assert_eq!(config.actor_id, "ana");
        let options = config.ddl_options();
        assert_eq!(options.dialect, Dialect::MySQL);
        assert!(!options.align_columns);
    }

    #[test]
    fn test_load_errors() {
        let missing = EditorConfig::load(Path::new("/nonexistent/schemagraph.json"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));

        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"suggestionLimit": 0}}"#).unwrap();
        assert!(matches!(EditorConfig::load(file.path()), Err(ConfigError::Invalid(_))));

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(EditorConfig::load(file.path()), Err(ConfigError::Parse { .. })));
    }
}
