use anyhow::Context;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use pagehost_core::preview::DEFAULT_MAX_AGE_SECS;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub database: DatabaseConfig,

    /// Key for signing preview links. A random key is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,

    #[serde(default)]
    pub preview: PreviewConfig,

    #[serde(default)]
    pub admin: AdminConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path, `~` is expanded
    #[serde(default = "default_database_path")]
    pub path: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    #[serde(default = "default_preview_max_age")]
    pub max_age_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Bearer token for `/admin/api`. The admin API refuses every request
    /// while this is unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_false")]
    pub log_sql_queries: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database: DatabaseConfig::default(),
            secret_key: None,
            preview: PreviewConfig::default(),
            admin: AdminConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            max_age_secs: default_preview_max_age(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_sql_queries: false,
        }
    }
}

impl ServerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&contents)
                .with_context(|| format!("Invalid TOML in {}", path.display()))?
        } else {
            // Default to YAML
            serde_yaml::from_str(&contents)
                .with_context(|| format!("Invalid YAML in {}", path.display()))?
        };

        Ok(config)
    }

    /// Merge environment variables into config (env vars take precedence)
    pub fn merge_env(&mut self) {
        // Server settings
        if let Ok(val) = std::env::var("PAGEHOST_HOST") {
            self.host = val;
        }

        if let Ok(val) = std::env::var("PAGEHOST_PORT") {
            match val.parse::<u16>() {
                Ok(port) => self.port = port,
                Err(_) => warn!("Ignoring invalid PAGEHOST_PORT '{}'", val),
            }
        }

        // Database settings
        if let Ok(val) = std::env::var("PAGEHOST_DATABASE_PATH") {
            self.database.path = val;
        }

        if let Ok(val) = std::env::var("PAGEHOST_DATABASE_MAX_CONNECTIONS")
            && let Ok(max) = val.parse::<u32>()
        {
            self.database.max_connections = max;
        }

        // Secrets
        if let Ok(val) = std::env::var("PAGEHOST_SECRET_KEY")
            && !val.is_empty()
        {
            self.secret_key = Some(val);
        }

        if let Ok(val) = std::env::var("PAGEHOST_ADMIN_TOKEN")
            && !val.is_empty()
        {
            self.admin.token = Some(val);
        }

        if let Ok(val) = std::env::var("PAGEHOST_PREVIEW_MAX_AGE_SECS")
            && let Ok(secs) = val.parse::<u64>()
        {
            self.preview.max_age_secs = secs;
        }

        // Logging settings
        if let Ok(val) = std::env::var("PAGEHOST_LOG_LEVEL") {
            self.logging.level = val;
        }

        if let Ok(val) = std::env::var("PAGEHOST_LOG_SQL_QUERIES")
            && let Ok(enabled) = val.parse::<bool>()
        {
            self.logging.log_sql_queries = enabled;
        }
    }

    /// Database path with `~` expanded
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.database.path).to_string())
    }

    /// Preview token lifetime; values chrono cannot represent are a config error
    pub fn preview_max_age(&self) -> anyhow::Result<chrono::Duration> {
        let secs = self.preview.max_age_secs;
        i64::try_from(secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .with_context(|| format!("preview.max_age_secs {} is out of range", secs))
    }

    /// The configured signing key, or a fresh random one for this process
    pub fn signing_key(&self) -> String {
        match self.secret_key.as_deref().filter(|key| !key.is_empty()) {
            Some(key) => key.to_string(),
            None => {
                warn!("No secret_key configured; preview links will not survive a restart");
                let bytes: [u8; 32] = rand::random();
                URL_SAFE_NO_PAD.encode(bytes)
            }
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_database_path() -> String {
    "./data/pagehost.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_preview_max_age() -> u64 {
    DEFAULT_MAX_AGE_SECS.unsigned_abs()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_false() -> bool {
    false
}
