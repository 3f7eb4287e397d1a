//! Engine configuration, loaded from `~/.finsight/config.toml` (or the
//! path in `FINSIGHT_CONFIG`). Missing file means defaults; a file that
//! exists but does not parse is an error.

use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

pub const CONFIG_ENV_VAR: &str = "FINSIGHT_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

fn default_api_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_assistant_url() -> String {
    "http://localhost:11434/api/generate".to_string()
}

fn default_assistant_model() -> String {
    "mistral-nemo".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_assistant_url")]
    pub url: String,
    #[serde(default = "default_assistant_model")]
    pub model: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            url: default_assistant_url(),
            model: default_assistant_model(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub assistant: AssistantConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            assistant: AssistantConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Default location under the user's home directory.
    pub fn default_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Some(PathBuf::from(path));
        }
        dirs::home_dir().map(|home| home.join(".finsight").join("config.toml"))
    }

    /// Default location for persisted auth tokens, next to the config.
    pub fn default_auth_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".finsight").join("auth.json"))
    }

    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(&path)?;
        Ok(toml::from_str(&contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config =
            EngineConfig::load(Some(&dir.path().join("config.toml"))).expect("config");
        assert_eq!(config.api_base_url, "http://localhost:3000");
        assert_eq!(config.assistant.model, "mistral-nemo");
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "api_base_url = \"https://pnl.internal\"\n").expect("write");
        let config = EngineConfig::load(Some(&path)).expect("config");
        assert_eq!(config.api_base_url, "https://pnl.internal");
        assert_eq!(
            config.assistant.url,
            "http://localhost:11434/api/generate"
        );
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "api_base_url = [not toml").expect("write");
        assert!(EngineConfig::load(Some(&path)).is_err());
    }
}
