// Configuration Storage Service
// Reads API tokens and per-source endpoint overrides from a JSON config file.
// Environment variables take precedence; the file is the fallback.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub api_tokens: HashMap<String, String>,
    #[serde(default)]
    pub sources: HashMap<String, SourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SourceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub base_url: Option<String>,
}

fn default_true() -> bool {
    true
}

pub struct ConfigStore {
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("veriframe"))
    }

    /// Load configuration from file
    pub fn load(&self) -> Result<AppConfig, String> {
        if !self.config_file.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file)
            .map_err(|e| format!("Failed to read config: {}", e))?;

        serde_json::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// Get an API token from the config file
    pub fn get_api_token(&self, provider: &str) -> Result<Option<String>, String> {
        let config = self.load()?;
        Ok(config.api_tokens.get(provider).cloned())
    }

    /// Get a source base-URL override from the config file
    pub fn get_source_url(&self, source: &str) -> Result<Option<String>, String> {
        let config = self.load()?;
        Ok(config.sources.get(source).and_then(|s| s.base_url.clone()))
    }
}
