use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app_paths::AppPaths;
use crate::cache::{FailurePolicy, DEFAULT_TTL};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub cache: CacheConfig,
    pub paths: PathsConfig,
    pub recipient: RecipientConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API root without the version segment
    pub base_url: String,

    pub api_version: u32,

    /// File holding the API key (defaults to ~/mercury_data/api_key)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_path: Option<PathBuf>,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How long fetched accounts/recipients are served before a refetch
    pub ttl_secs: u64,

    /// "propagate" or "serve-stale"
    pub on_refresh_failure: FailurePolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_file: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_recipient_file: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipientConfig {
    /// Emails attached to recipients composed interactively
    pub default_emails: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://backend.mercury.com/api".to_string(),
            api_version: 1,
            key_path: None,
            timeout_secs: 30,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_TTL.as_secs(),
            on_refresh_failure: FailurePolicy::Propagate,
        }
    }
}

impl Config {
    /// Load config from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::config_file()?)
    }

    /// Load config from `path`, writing defaults there if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let default_config = Self::default();
            default_config.save_to(path)?;
            return Ok(default_config);
        }

        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::config_file()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;

        Ok(())
    }

    /// Versioned API root, e.g. `https://backend.mercury.com/api/v1/`
    pub fn api_url(&self) -> String {
        format!(
            "{}/v{}/",
            self.api.base_url.trim_end_matches('/'),
            self.api.api_version
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    /// The configured data dir, created on first use.
    fn custom_data_dir(&self) -> Result<Option<PathBuf>> {
        match &self.paths.data_dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                Ok(Some(dir.clone()))
            }
            None => Ok(None),
        }
    }

    pub fn key_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.api.key_path {
            return Ok(path.clone());
        }
        match self.custom_data_dir()? {
            Some(dir) => Ok(dir.join("api_key")),
            None => AppPaths::api_key_file(),
        }
    }

    /// Where the API key is expected, resolved without creating any
    /// directory.
    pub fn key_path_hint(&self) -> Result<PathBuf> {
        if let Some(path) = &self.api.key_path {
            return Ok(path.clone());
        }
        match &self.paths.data_dir {
            Some(dir) => Ok(dir.join("api_key")),
            None => Ok(AppPaths::data_dir_path()?.join("api_key")),
        }
    }

    pub fn memory_file(&self) -> Result<PathBuf> {
        if let Some(path) = &self.paths.memory_file {
            return Ok(path.clone());
        }
        match self.custom_data_dir()? {
            Some(dir) => Ok(dir.join("memory.json")),
            None => AppPaths::memory_file(),
        }
    }

    pub fn last_recipient_file(&self) -> Result<PathBuf> {
        if let Some(path) = &self.paths.last_recipient_file {
            return Ok(path.clone());
        }
        match self.custom_data_dir()? {
            Some(dir) => Ok(dir.join("last_recipient.json")),
            None => AppPaths::last_recipient_file(),
        }
    }

    pub fn log_dir(&self) -> Result<PathBuf> {
        let dir = match (&self.paths.log_dir, self.custom_data_dir()?) {
            (Some(dir), _) => dir.clone(),
            (None, Some(data_dir)) => data_dir.join("logs"),
            (None, None) => return AppPaths::log_dir(),
        };
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Configured emails, or `MERCURY_EMAIL` when none are configured
    pub fn default_emails(&self) -> Vec<String> {
        if !self.recipient.default_emails.is_empty() {
            return self.recipient.default_emails.clone();
        }
        std::env::var("MERCURY_EMAIL")
            .ok()
            .filter(|email| !email.trim().is_empty())
            .into_iter()
            .collect()
    }

    /// Create a default config file with comments
    pub fn create_default_with_comments() -> String {
        r#"# Mercury client configuration
# Location: ~/.config/mercury/config.toml (Linux)
#           ~/Library/Application Support/mercury/config.toml (macOS)

[api]
# API root; the version segment is appended as /v<api_version>/
base_url = "https://backend.mercury.com/api"
api_version = 1

# File containing your API token (defaults to ~/mercury_data/api_key)
# key_path = "/path/to/api_key"

# Per-request timeout in seconds
timeout_secs = 30

[cache]
# Accounts and recipients are refetched when older than this
ttl_secs = 5

# What to do when a refresh fails:
#   "propagate"   - return the error (the old data is kept for later)
#   "serve-stale" - keep serving the old data with a warning
on_refresh_failure = "propagate"

[paths]
# data_dir = "/path/to/mercury_data"
# memory_file = "/path/to/memory.json"
# last_recipient_file = "/path/to/last_recipient.json"
# log_dir = "/path/to/logs"

[recipient]
# Emails attached to recipients created with `mercury add-recipient`
# (falls back to the MERCURY_EMAIL environment variable)
default_emails = []
"#
        .to_string()
    }
}
