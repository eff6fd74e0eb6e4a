//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MAILSWEEP_CONFIG` (environment variable)
//! 2. `~/.config/mailsweep/config.toml` (Linux/macOS)
//!    `%APPDATA%\mailsweep\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Environment variable holding the API bearer token.
pub const TOKEN_ENV: &str = "FASTMAIL_TOKEN";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// JMAP API settings.
    pub api: ApiConfig,
    /// HTTP settings for unsubscribe actions.
    pub http: HttpConfig,
    /// Daemon (`watch`) settings.
    pub daemon: DaemonConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
}

/// JMAP API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Session discovery endpoint.
    pub session_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Page size for batched `Email/query` calls.
    pub batch_size: usize,
    /// Maximum retries for transient failures during collection.
    pub max_retries: u32,
    /// Initial retry backoff in seconds (doubled each retry).
    pub retry_backoff_secs: u64,
    /// Cap on decoded HTML body bytes fetched per message.
    pub max_body_bytes: usize,
}

/// HTTP settings for unsubscribe actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds for unsubscribe fetches and submissions.
    pub timeout_secs: u64,
    /// User-Agent header sent with unsubscribe requests.
    pub user_agent: String,
}

/// Daemon (`watch`) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Polling interval in seconds.
    pub interval_secs: u64,
    /// Default log file (None = `~/.fastmail.log`).
    pub logfile: Option<PathBuf>,
    /// Number of recent messages written to the log on startup.
    pub backfill: usize,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            cache_dir: None,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            session_url: "https://api.fastmail.com/jmap/session".to_string(),
            timeout_secs: 30,
            batch_size: 50,
            max_retries: 5,
            retry_backoff_secs: 2,
            max_body_bytes: 256_000,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("mailsweep/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            logfile: None,
            backfill: 0,
        }
    }
}

// ── Load / paths ────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    // 1. Environment variable override
    if let Ok(env_path) = std::env::var("MAILSWEEP_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    // 2. Standard config directory
    dirs::config_dir().map(|d| d.join("mailsweep").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailsweep")
}

/// Default log file path for daemon mode.
pub fn daemon_logfile(config: &Config) -> PathBuf {
    if let Some(ref path) = config.daemon.logfile {
        return path.clone();
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".fastmail.log")
}
