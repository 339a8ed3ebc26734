use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::ai::Tone;
use crate::constants::{DEFAULT_FETCH_LIMIT, DEFAULT_MAX_TOKENS, MAX_FETCH_LIMIT};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gmail: GmailConfig,
    /// Completion backend settings
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

/// Mailbox access (Gmail REST API + Google OAuth2 client)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GmailConfig {
    /// OAuth2 client ID of a "Desktop app" client (or MAILMATE_OAUTH_CLIENT_ID)
    #[serde(default)]
    pub client_id: Option<String>,
    /// Optional client secret (or MAILMATE_OAUTH_CLIENT_SECRET)
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_gmail_api_base")]
    pub api_base: String,
    /// Messages retrieved per fetch
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: usize,
}

impl Default for GmailConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            api_base: default_gmail_api_base(),
            fetch_limit: default_fetch_limit(),
        }
    }
}

impl GmailConfig {
    /// Config value first, then the environment
    pub fn get_client_id(&self) -> Option<String> {
        self.client_id
            .clone()
            .filter(|id| !id.is_empty())
            .or_else(crate::oauth2::env_client_id)
    }

    pub fn get_client_secret(&self) -> Option<String> {
        self.client_secret
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(crate::oauth2::env_client_secret)
    }

    /// Fetch limit clamped to `1..=MAX_FETCH_LIMIT`
    pub fn effective_fetch_limit(&self) -> usize {
        self.fetch_limit.clamp(1, MAX_FETCH_LIMIT)
    }
}

/// Chat-completion backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// API key (or MAILMATE_API_KEY / OPENAI_API_KEY)
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_ai_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_ai_model")]
    pub model: String,
    /// Response length ceiling per completion
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Retries on transport failure (0 = none)
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_ai_endpoint(),
            model: default_ai_model(),
            max_tokens: default_max_tokens(),
            max_retries: 0,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl AiConfig {
    /// Get API key from config or environment variables
    pub fn get_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("MAILMATE_API_KEY").ok())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Tone preselected for "adjust tone"
    #[serde(default)]
    pub default_tone: Tone,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            default_tone: Tone::Professional,
        }
    }
}

fn default_gmail_api_base() -> String {
    "https://gmail.googleapis.com/gmail/v1".to_string()
}

fn default_fetch_limit() -> usize {
    DEFAULT_FETCH_LIMIT
}

fn default_ai_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_ai_model() -> String {
    "gpt-4".to_string()
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Config {
    pub fn config_dir() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .context("Could not find config directory")?
            .join("mailmate");
        Ok(dir)
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load the user config; a missing file means all defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(Self::config_dir()?)?;
        Ok(())
    }
}
