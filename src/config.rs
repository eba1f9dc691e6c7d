use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_path: PathBuf,

    // Web Server
    pub web_host: String,
    pub web_port: u16,

    // Sessions
    pub session_ttl: Duration,
    pub session_cleanup_interval: Duration,

    // Board listing
    pub default_page_limit: i64,
    pub max_page_limit: i64,
    pub orphan_policy: OrphanPolicy,
}

/// What happens to the replies of a top-level post when it is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrphanPolicy {
    /// Only the named row is removed; replies keep their now-dangling `parent_ref`.
    #[default]
    Keep,
    /// Deleting a root also deletes every reply filed under it.
    Cascade,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("./data/board.sqlite"),
            web_host: "0.0.0.0".to_string(),
            web_port: 8080,
            session_ttl: Duration::from_secs(86_400),
            session_cleanup_interval: Duration::from_secs(3600),
            default_page_limit: 10,
            max_page_limit: 100,
            orphan_policy: OrphanPolicy::Keep,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Database
            database_path: PathBuf::from(env_or_default("DATABASE_PATH", "./data/board.sqlite")),

            // Web Server
            web_host: env_or_default("WEB_HOST", "0.0.0.0"),
            web_port: parse_env_u16("WEB_PORT", 8080)?,

            // Sessions
            session_ttl: Duration::from_secs(parse_env_u64("SESSION_TTL_SECS", 86_400)?),
            session_cleanup_interval: Duration::from_secs(parse_env_u64(
                "SESSION_CLEANUP_INTERVAL_SECS",
                3600,
            )?),

            // Board listing
            default_page_limit: parse_env_i64("DEFAULT_PAGE_LIMIT", 10)?,
            max_page_limit: parse_env_i64("MAX_PAGE_LIMIT", 100)?,
            orphan_policy: parse_orphan_policy(&env_or_default("ORPHAN_POLICY", "keep"))?,
        })
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_page_limit < 1 {
            return Err(ConfigError::InvalidValue {
                name: "DEFAULT_PAGE_LIMIT".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.max_page_limit < self.default_page_limit {
            return Err(ConfigError::InvalidValue {
                name: "MAX_PAGE_LIMIT".to_string(),
                message: format!(
                    "must be at least DEFAULT_PAGE_LIMIT ({})",
                    self.default_page_limit
                ),
            });
        }
        if self.session_ttl.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "SESSION_TTL_SECS".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if self.session_cleanup_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "SESSION_CLEANUP_INTERVAL_SECS".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_i64(name: &str, default: i64) -> Result<i64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u16(name: &str, default: u16) -> Result<u16, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_orphan_policy(value: &str) -> Result<OrphanPolicy, ConfigError> {
    match value.to_lowercase().as_str() {
        "keep" => Ok(OrphanPolicy::Keep),
        "cascade" => Ok(OrphanPolicy::Cascade),
        _ => Err(ConfigError::InvalidValue {
            name: "ORPHAN_POLICY".to_string(),
            message: format!("must be 'keep' or 'cascade', got '{value}'"),
        }),
    }
}
