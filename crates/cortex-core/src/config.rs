//! Application configuration
//!
//! [`load_environment`] merges an env file into the process environment and
//! [`AppConfig::from_env`] reads the typed sections from it.
//!
//! ```rust,no_run
//! use cortex_core::config::{load_environment, AppConfig};
//!
//! let env_file = load_environment();
//! let config = AppConfig::from_env().expect("invalid configuration");
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Names an env file other than `./.env`
pub const ENV_FILE_VAR: &str = "CORTEX_ENV_FILE";

/// Env file read when `CORTEX_ENV_FILE` is unset
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Configuration errors
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Missing required environment variables: {}\nPlease create a .env file based on env.template", .0.join(", "))]
    Missing(Vec<String>),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: String, value: String },

    #[error("Failed to load environment file {path}: {message}")]
    EnvFile { path: PathBuf, message: String },
}

/// Merge the env file into the process environment.
///
/// Reads `$CORTEX_ENV_FILE` when set, otherwise `./.env`. Variables that are
/// already set win over the file. Returns the file that was read, `None`
/// when there was no default file, and an error when the named file is
/// missing or malformed. Nothing is logged here; the caller reports the
/// outcome once tracing is up.
pub fn load_environment() -> Result<Option<PathBuf>, ConfigError> {
    match std::env::var_os(ENV_FILE_VAR) {
        Some(custom) => load_env_file(Path::new(&custom)).map(Some),
        None => {
            let path = Path::new(DEFAULT_ENV_FILE);
            if path.exists() {
                load_env_file(path).map(Some)
            } else {
                Ok(None)
            }
        }
    }
}

fn load_env_file(path: &Path) -> Result<PathBuf, ConfigError> {
    dotenvy::from_path(path).map_err(|e| ConfigError::EnvFile {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(path.to_path_buf())
}

/// Graph store connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neo4jConfig {
    pub uri: String,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub database: String,
    /// Maximum concurrently open sessions
    pub max_sessions: usize,
    /// How long a request waits for a free session
    pub acquire_timeout_secs: u64,
}

/// Language model provider kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    Local,
    Cloud,
}

/// Language model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: LlmProviderKind,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// One of debug, info, warn, error
    pub level: String,
    pub format: LogFormat,
    pub to_console: bool,
    /// Write a daily file under `output_path`
    pub to_file: bool,
    pub output_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub conversations_path: PathBuf,
}

/// Full application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub neo4j: Neo4jConfig,
    pub llm: LlmConfig,
    pub logging: LoggingConfig,
    pub server: ServerConfig,
    pub storage: StorageConfig,
}

pub const DEFAULT_NEO4J_URI: &str = "http://localhost:7474";
pub const DEFAULT_LLM_ENDPOINT: &str = "http://localhost:11434";
pub const DEFAULT_LLM_MODEL: &str = "llama3.1:8b";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 2000;
pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_LOG_OUTPUT_PATH: &str = "./logs";

impl AppConfig {
    /// Build the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| get_config_opt(key))
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let mut missing = Vec::new();
        let password = lookup("NEO4J_PASSWORD");
        if password.is_none() {
            missing.push("NEO4J_PASSWORD".to_string());
        }
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let provider = match get("LLM_PROVIDER", "local").to_lowercase().as_str() {
            "local" => LlmProviderKind::Local,
            "cloud" => LlmProviderKind::Cloud,
            other => {
                return Err(ConfigError::Invalid {
                    key: "LLM_PROVIDER".to_string(),
                    value: other.to_string(),
                })
            }
        };

        let level = get("LOG_LEVEL", "info").to_lowercase();
        if !matches!(level.as_str(), "debug" | "info" | "warn" | "error") {
            return Err(ConfigError::Invalid {
                key: "LOG_LEVEL".to_string(),
                value: level,
            });
        }

        let format = match get("LOG_FORMAT", "text").to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };

        let to_console = parse_flag(&lookup, "LOG_TO_CONSOLE", true)?;
        let to_file = parse_flag(&lookup, "LOG_TO_FILE", true)?;
        let output_path = PathBuf::from(get("LOG_OUTPUT_PATH", DEFAULT_LOG_OUTPUT_PATH));

        let conversations_path = lookup("CONVERSATIONS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(default_conversations_path);

        Ok(Self {
            neo4j: Neo4jConfig {
                uri: get("NEO4J_URI", DEFAULT_NEO4J_URI),
                user: get("NEO4J_USER", "neo4j"),
                password: password.unwrap_or_default(),
                database: get("NEO4J_DATABASE", "neo4j"),
                max_sessions: parse_number(&lookup, "NEO4J_MAX_SESSIONS", 50)?,
                acquire_timeout_secs: parse_number(&lookup, "NEO4J_ACQUIRE_TIMEOUT_SECS", 120)?,
            },
            llm: LlmConfig {
                provider,
                api_key: lookup("LLM_API_KEY"),
                endpoint: get("LLM_ENDPOINT", DEFAULT_LLM_ENDPOINT),
                model: get("LLM_MODEL", DEFAULT_LLM_MODEL),
                temperature: DEFAULT_TEMPERATURE,
                max_tokens: DEFAULT_MAX_TOKENS,
            },
            logging: LoggingConfig {
                level,
                format,
                to_console,
                to_file,
                output_path,
            },
            server: ServerConfig {
                host: get("BIND_HOST", "0.0.0.0"),
                port: parse_number(&lookup, "PORT", DEFAULT_PORT)?,
            },
            storage: StorageConfig { conversations_path },
        })
    }
}

fn parse_number<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            value: raw,
        }),
    }
}

fn parse_flag<F>(lookup: &F, key: &str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                key: key.to_string(),
                value: raw,
            }),
        },
    }
}

/// OS-specific application data directory
///
/// - macOS: ~/Library/Application Support/cortex
/// - Linux: ~/.local/share/cortex
/// - Windows: %APPDATA%\cortex
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("cortex"))
        .or_else(|| dirs::home_dir().map(|home| home.join(".cortex")))
        .unwrap_or_else(|| PathBuf::from("./data"))
}

pub fn default_conversations_path() -> PathBuf {
    app_data_dir().join("conversations")
}

/// Get an optional configuration value.
pub fn get_config_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
