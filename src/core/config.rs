//! Configuration management for Forge
//!
//! Supports environment variables, config files, and runtime overrides.
//!
//! Config file location: ~/.config/forge/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::core::error::{ForgeError, Result};

/// Main configuration for Forge
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Ollama configuration
    pub ollama: OllamaConfig,
    /// Model configuration
    pub models: ModelConfig,
    /// Web search configuration
    #[serde(default)]
    pub search: SearchConfig,
    /// Instruction store configuration
    #[serde(default)]
    pub store: StoreConfig,
    /// Agent configuration
    pub agent: AgentConfig,
}

/// Ollama server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Host address (default: localhost)
    pub host: String,
    /// Port number (default: 11434)
    pub port: u16,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model identifier, optionally prefixed with a provider ("ollama/qwen3:8b")
    pub default: String,
    /// Model used by the title graph
    pub title: String,
}

/// Web search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Tavily API endpoint
    pub endpoint: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    /// Maximum results returned per query
    pub max_results: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Which store backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local, lost on exit
    Memory,
    /// JSON files under `data_dir`
    File,
}

/// Instruction store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend kind
    pub backend: StoreBackend,
    /// Directory for the file backend
    pub data_dir: Option<PathBuf>,
    /// Namespace category for stored instructions
    pub namespace: String,
}

/// Agent behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// User the runs are scoped to
    pub user_id: String,
    /// Assistant the runs are scoped to
    pub assistant_id: String,
    /// System prompt override
    pub system_prompt: Option<String>,
    /// Step limit for a single run; unbounded when unset
    pub max_steps: Option<usize>,
    /// Whether to emit debug logging
    pub debug: bool,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: env::var("OLLAMA_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: env::var("OLLAMA_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(11434),
            timeout_secs: 120,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            default: env::var("FORGE_MODEL").unwrap_or_else(|_| "ollama/qwen3:8b".to_string()),
            title: env::var("FORGE_TITLE_MODEL")
                .unwrap_or_else(|_| "ollama/qwen3:4b".to_string()),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.tavily.com/search".to_string(),
            api_key_env: "TAVILY_API_KEY".to_string(),
            max_results: 2,
            timeout_secs: 30,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: match env::var("FORGE_STORE").as_deref() {
                Ok("memory") => StoreBackend::Memory,
                _ => StoreBackend::File,
            },
            data_dir: None,
            namespace: "system_messages".to_string(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            user_id: env::var("FORGE_USER_ID").unwrap_or_else(|_| "default".to_string()),
            assistant_id: env::var("FORGE_ASSISTANT_ID")
                .unwrap_or_else(|_| "default".to_string()),
            system_prompt: None,
            max_steps: env::var("FORGE_MAX_STEPS")
                .ok()
                .and_then(|v| v.parse().ok()),
            debug: env::var("FORGE_DEBUG")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("forge")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Directory used by the file store
    pub fn data_dir(&self) -> PathBuf {
        self.store.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("forge")
                .join("store")
        })
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load() -> Self {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        match Self::load_from_file() {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("using default configuration: {}", e);
                Self::default()
            }
        }
    }

    /// Load configuration from file only
    pub fn load_from_file() -> Result<Self> {
        let config_path = Self::config_file();

        if !config_path.exists() {
            return Err(ForgeError::config("Config file not found"));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| ForgeError::config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ForgeError::config(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to file and return the path
    pub fn save(&self) -> Result<PathBuf> {
        let config_dir = Self::config_dir();
        let config_path = Self::config_file();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .map_err(|e| ForgeError::config(format!("Failed to create config dir: {}", e)))?;
        }

        let content = self.to_toml()?;

        fs::write(&config_path, content)
            .map_err(|e| ForgeError::config(format!("Failed to write config: {}", e)))?;

        Ok(config_path)
    }

    /// Get the full Ollama API URL
    pub fn ollama_url(&self) -> Result<url::Url> {
        let raw = format!("http://{}:{}", self.ollama.host, self.ollama.port);
        url::Url::parse(&raw)
            .map_err(|e| ForgeError::config(format!("Invalid Ollama address '{}': {}", raw, e)))
    }

    /// Read the search API key from the configured environment variable
    pub fn search_api_key(&self) -> Option<String> {
        env::var(&self.search.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ForgeError::config(format!("Failed to serialize config: {}", e)))
    }
}
