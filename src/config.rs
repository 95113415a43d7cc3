use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub enable_tracing: bool,
    #[serde(default)]
    pub validator: ValidatorConfig,
}

/// Batch validation limits
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// Largest batch accepted; larger batches are refused whole
    #[serde(default = "ValidatorConfig::default_max_batch_size")]
    pub max_batch_size: usize,
}

impl ValidatorConfig {
    const DEFAULT_MAX_BATCH_SIZE: usize = 8190;

    fn default_max_batch_size() -> usize {
        Self::DEFAULT_MAX_BATCH_SIZE
    }
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_batch_size: Self::DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

impl AppConfig {
    pub fn load(env: &str) -> Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to parse {}", config_path))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }
}
