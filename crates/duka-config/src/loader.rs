use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use duka_core::{DukaError, Result};

use crate::schema::DukaConfig;

/// Loads the Duka configuration from disk.
pub struct ConfigLoader {
    config: Arc<RwLock<DukaConfig>>,
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Resolve the config path: explicit path > DUKA_CONFIG env > ~/.duka/duka.toml
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("DUKA_CONFIG") {
            return PathBuf::from(p);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".duka")
            .join("duka.toml")
    }

    /// Load the config from disk, falling back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = Self::resolve_path(path);
        let config = if config_path.exists() {
            info!(?config_path, "loading configuration");
            let raw = std::fs::read_to_string(&config_path)?;
            toml::from_str::<DukaConfig>(&raw).map_err(|e| {
                DukaError::Config(format!("failed to parse {}: {}", config_path.display(), e))
            })?
        } else {
            warn!(?config_path, "config file not found, using defaults");
            DukaConfig::default()
        };

        let config = Self::apply_env_overrides(config);
        config.validate()?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path,
        })
    }

    /// Get a read snapshot of the current config.
    pub fn get(&self) -> DukaConfig {
        self.config.read().clone()
    }

    /// Get a shared reference for long-lived components.
    pub fn shared(&self) -> Arc<RwLock<DukaConfig>> {
        Arc::clone(&self.config)
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Apply env var overrides (DUKA_AGENT_MODEL, DUKA_LOG_LEVEL, ...).
    fn apply_env_overrides(mut config: DukaConfig) -> DukaConfig {
        if let Ok(v) = std::env::var("DUKA_AGENT_MODEL") {
            config.agent.model = v;
        }
        if let Ok(v) = std::env::var("DUKA_LOG_LEVEL") {
            config.logging.level = v;
        }
        if let Ok(v) = std::env::var("DUKA_PROVIDER_BASE_URL") {
            config.provider.base_url = v;
        }
        // API key: env var fills in when the config file leaves it unset,
        // so the file takes priority and env is the fallback.
        if config.provider.api_key.is_none() {
            if let Ok(v) = std::env::var("OPENAI_API_KEY") {
                config.provider.api_key = Some(v);
            }
        }
        config
    }
}
