//! Configuration for the Telegram API connection
//!
//! Loads configuration from config.yml, with `.env` and environment overrides.
//! `TELEGRAM_API_ID`/`TELEGRAM_API_HASH` (or `APP_ID`/`APP_HASH`) win over the file.

use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Default constants (fallback if config.yml not found)
pub const CONFIG_FILE: &str = "config.yml";
pub const SESSIONS_DIR: &str = "sessions";
pub const DEFAULT_MESSAGE: &str = "Some the string";

/// YAML config structures
#[derive(Debug, Deserialize)]
struct YamlConfig {
    telegram: Option<TelegramConfig>,
    sender: Option<SenderConfig>,
}

#[derive(Debug, Deserialize)]
struct TelegramConfig {
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    api_id: Option<String>,
    api_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SenderConfig {
    sessions_dir: Option<String>,
    message: Option<String>,
}

/// Deserialize a value that can be either a string or a number
fn deserialize_string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<serde_yaml::Value> = Option::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(serde_yaml::Value::String(s)) => Ok(Some(s)),
        Some(serde_yaml::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected string or number, got {:?}",
            other
        ))),
    }
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct Config {
    pub api_id: i32,
    pub api_hash: String,
    pub sessions_dir: PathBuf,
    pub message: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Config {
    /// Load `path`, or the default `config.yml` when no path is given.
    ///
    /// Only a missing default file falls back to environment-only settings; an
    /// explicit path that cannot be read, or YAML that does not parse, is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let explicit = path.is_some();
        let path = path.unwrap_or_else(|| Path::new(CONFIG_FILE));

        match fs::read_to_string(path) {
            Ok(content) => Self::from_yaml(&content)
                .map_err(|e| Error::Config(format!("{}: {}", path.display(), e))),
            Err(e) if e.kind() == ErrorKind::NotFound && !explicit => {
                tracing::debug!(path = %path.display(), "no config file, using environment");
                Ok(Self::from_env())
            }
            Err(e) => Err(Error::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Expand a `${VAR}` placeholder, then let the first set env key override.
    fn resolve_env_string(value: Option<String>, env_keys: &[&str]) -> String {
        if let Some(ref v) = value {
            if v.starts_with("${") && v.ends_with('}') {
                let var_name = &v[2..v.len() - 1];
                if let Ok(env_val) = std::env::var(var_name) {
                    return env_val;
                }
            }
        }
        for key in env_keys {
            if let Ok(env_val) = std::env::var(key) {
                return env_val;
            }
        }
        match value {
            Some(v) if v.starts_with("${") => String::new(),
            Some(v) => v,
            None => String::new(),
        }
    }

    /// Resolve an integer value with the same precedence as strings.
    fn resolve_env_i32(value: Option<String>, env_keys: &[&str]) -> i32 {
        Self::resolve_env_string(value, env_keys)
            .trim()
            .parse()
            .unwrap_or(0)
    }

    /// Load .env file into environment variables using dotenvy
    fn load_dotenv() {
        if dotenvy::dotenv().is_err() {
            let _ = dotenvy::from_filename("../.env");
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load(Some(path.as_ref()))
    }

    fn from_yaml(content: &str) -> std::result::Result<Self, String> {
        Self::load_dotenv();

        let yaml: YamlConfig = serde_yaml::from_str(content)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;

        let telegram = yaml.telegram.unwrap_or(TelegramConfig {
            api_id: None,
            api_hash: None,
        });

        let sender = yaml.sender.unwrap_or(SenderConfig {
            sessions_dir: None,
            message: None,
        });

        Ok(Self {
            api_id: Self::resolve_env_i32(telegram.api_id, &["TELEGRAM_API_ID", "APP_ID"]),
            api_hash: Self::resolve_env_string(
                telegram.api_hash,
                &["TELEGRAM_API_HASH", "APP_HASH"],
            ),
            sessions_dir: sender
                .sessions_dir
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(SESSIONS_DIR)),
            message: sender
                .message
                .unwrap_or_else(|| DEFAULT_MESSAGE.to_string()),
        })
    }

    /// Defaults with API credentials taken from the environment only
    pub fn from_env() -> Self {
        Self::load_dotenv();
        Self {
            api_id: Self::resolve_env_i32(None, &["TELEGRAM_API_ID", "APP_ID"]),
            api_hash: Self::resolve_env_string(None, &["TELEGRAM_API_HASH", "APP_HASH"]),
            ..Self::defaults()
        }
    }

    /// Create config with empty defaults (fallback)
    fn defaults() -> Self {
        Self {
            api_id: 0,
            api_hash: String::new(),
            sessions_dir: PathBuf::from(SESSIONS_DIR),
            message: DEFAULT_MESSAGE.to_string(),
        }
    }

    /// API credentials are required before any connection is attempted.
    pub fn require_api_credentials(&self) -> Result<(i32, &str)> {
        if self.api_id == 0 {
            return Err(Error::Config(
                "api_id is not set (config.yml telegram.api_id or TELEGRAM_API_ID)".to_string(),
            ));
        }
        if self.api_hash.is_empty() {
            return Err(Error::Config(
                "api_hash is not set (config.yml telegram.api_hash or TELEGRAM_API_HASH)"
                    .to_string(),
            ));
        }
        Ok((self.api_id, &self.api_hash))
    }
}
