use crate::core::quote::MAX_BATCH_SIZE;
use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const TOKEN_ENV_VAR: &str = "IEX_CLOUD_API_TOKEN";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_base_url() -> String {
    "https://sandbox.iexapis.com".to_string()
}

fn default_batch_size() -> usize {
    MAX_BATCH_SIZE
}

fn default_tickers_path() -> PathBuf {
    PathBuf::from("assets/sp_500_stocks.csv")
}

fn default_output_path() -> PathBuf {
    PathBuf::from("recommended_trades.xlsx")
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            base_url: default_base_url(),
            token: None,
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default = "default_tickers_path")]
    pub tickers_path: PathBuf,
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            provider: ProviderConfig::default(),
            tickers_path: default_tickers_path(),
            output_path: default_output_path(),
        }
    }
}

impl AppConfig {
    /// Loads the config at the default location, or built-in defaults if there is none.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(path = %config_path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("", "", "equalweight")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config.validate()?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let size = self.provider.batch_size;
        if size == 0 || size > MAX_BATCH_SIZE {
            bail!(
                "provider.batch_size must be between 1 and {}, got {}",
                MAX_BATCH_SIZE,
                size
            );
        }
        Ok(())
    }

    /// API token from the config file, falling back to the environment.
    pub fn api_token(&self) -> Result<String> {
        self.resolve_token(std::env::var(TOKEN_ENV_VAR).ok())
    }

    fn resolve_token(&self, env_token: Option<String>) -> Result<String> {
        let present = |t: &String| !t.trim().is_empty();
        self.provider
            .token
            .clone()
            .filter(present)
            .or(env_token.filter(present))
            .with_context(|| {
                format!("No API token configured; set provider.token or {TOKEN_ENV_VAR}")
            })
    }
}
