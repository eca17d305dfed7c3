use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{SpritzError, SpritzResult};

/// Top-level configuration (loaded from spritz.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpritzConfig {
    pub container: ContainerConfig,
    pub logging: LoggingConfig,
}

/// Container format and I/O tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Deflate level for the body, 0-9 (default: 9, best compression)
    pub compression_level: u32,
    /// Base KDF rounds; each container adds its own IV byte on top (default: 20000)
    pub kdf_base_rounds: u32,
    /// Read buffer for copying and hashing streams (default: 4096)
    pub buffer_size: usize,
    /// Extension given to encrypted outputs (default: "dat")
    pub encrypted_extension: String,
    /// Suffix for decrypted outputs when no name is stored (default: "unenc")
    pub decrypted_extension: String,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            compression_level: 9,
            kdf_base_rounds: 20_000,
            buffer_size: 4096,
            encrypted_extension: "dat".into(),
            decrypted_extension: "unenc".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level / EnvFilter directive (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Text,
        }
    }
}

impl SpritzConfig {
    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::warn!("config file not found: {}  (using defaults)", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("parsing config: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("validating config: {}", path.display()))?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).map_err(|e| anyhow::anyhow!("invalid TOML: {e}"))
    }

    pub fn validate(&self) -> SpritzResult<()> {
        self.container.validate()
    }
}

impl ContainerConfig {
    pub fn validate(&self) -> SpritzResult<()> {
        if self.compression_level > 9 {
            return Err(SpritzError::Config(format!(
                "compression_level must be 0-9, got {}",
                self.compression_level
            )));
        }
        if self.buffer_size == 0 {
            return Err(SpritzError::Config("buffer_size must be > 0".into()));
        }
        if self.encrypted_extension.is_empty() || self.decrypted_extension.is_empty() {
            return Err(SpritzError::Config("output extensions must not be empty".into()));
        }
        Ok(())
    }
}
