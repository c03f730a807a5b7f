//! Service configuration.
//!
//! Values are layered: built-in defaults, then the TOML file named by
//! `HIRE_POWER_CONFIG`, then individual environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const CONFIG_PATH_ENV: &str = "HIRE_POWER_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub openai: OpenAiConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Request body limit for uploads, in bytes
    pub max_upload_size: usize,
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_upload_size: 10 * 1024 * 1024, // 10MB
            enable_cors: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Flat directory holding every uploaded resume
    pub upload_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("cvs"),
        }
    }
}

/// Connection and model settings for an OpenAI-compatible API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub chat_model: String,
    pub temperature: f32,
    pub embedding_model: String,
    /// Texts per embeddings request
    pub embedding_batch_size: usize,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            chat_model: "gpt-3.5-turbo-1106".to_string(),
            temperature: 0.0,
            embedding_model: "text-embedding-ada-002".to_string(),
            embedding_batch_size: 512,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Chunks handed to the answer prompt
    pub top_k: usize,
    /// Split documents into windows of this many characters; `None` embeds
    /// each document whole
    pub chunk_size: Option<usize>,
    pub chunk_overlap: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            chunk_size: None,
            chunk_overlap: 200,
        }
    }
}

impl AppConfig {
    /// Load from the optional config file and the process environment.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.is_empty() => Self::from_file(Path::new(&path))?,
            _ => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let mut config: Self =
            toml::from_str(text).map_err(|e| Error::Config(format!("invalid config: {}", e)))?;
        config.normalize();
        Ok(config)
    }

    /// Apply environment-style overrides; `lookup` returns the value of a variable.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.openai.api_key = key;
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            self.openai.base_url = url;
        }
        if let Some(host) = lookup("HIRE_POWER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("HIRE_POWER_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| Error::Config(format!("invalid HIRE_POWER_PORT: {}", port)))?;
        }
        if let Some(dir) = lookup("HIRE_POWER_UPLOAD_DIR") {
            self.storage.upload_dir = PathBuf::from(dir);
        }
        self.normalize();
        Ok(())
    }

    /// Endpoint paths are appended to `base_url` with a leading `/`.
    fn normalize(&mut self) {
        let trimmed = self.openai.base_url.trim_end_matches('/').len();
        self.openai.base_url.truncate(trimmed);
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
