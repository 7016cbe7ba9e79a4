use crate::record::{Level, ParseLevelError, DEFAULT_SERVICE_NAME};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Address the HTTP listener binds, e.g. `0.0.0.0:3000`.
pub const BIND_ADDR_ENV: &str = "DUAL_LOG_BIND_ADDR";

/// Directory holding `text.log` and `json.log`.
pub const LOG_DIR_ENV: &str = "DUAL_LOG_DIR";

/// Service name stamped on every record.
pub const SERVICE_NAME_ENV: &str = "DUAL_LOG_SERVICE_NAME";

/// Static threshold shared by both pipelines.
pub const LEVEL_ENV: &str = "DUAL_LOG_LEVEL";

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_LOG_DIR: &str = "logs";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("invalid DUAL_LOG_BIND_ADDR `{value}`: {source}")]
    BindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("invalid DUAL_LOG_LEVEL: {0}")]
    Level(#[from] ParseLevelError),

    #[error("DUAL_LOG_SERVICE_NAME must not be empty")]
    EmptyServiceName,
}

/// Process configuration. The defaults are the service's fixed contract;
/// environment variables only override them.
#[derive(Clone, Debug, PartialEq)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub log_dir: PathBuf,
    pub service_name: String,
    pub level: Level,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            level: Level::Info,
        }
    }
}

impl ServiceConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup; unset keys fall
    /// back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let bind = env_or(BIND_ADDR_ENV, DEFAULT_BIND_ADDR);
        let bind_addr = bind
            .parse::<SocketAddr>()
            .map_err(|source| ConfigError::BindAddr { value: bind.clone(), source })?;

        let service_name = env_or(SERVICE_NAME_ENV, DEFAULT_SERVICE_NAME);
        if service_name.trim().is_empty() {
            return Err(ConfigError::EmptyServiceName);
        }

        Ok(Self {
            bind_addr,
            log_dir: PathBuf::from(env_or(LOG_DIR_ENV, DEFAULT_LOG_DIR)),
            service_name,
            level: env_or(LEVEL_ENV, "info").parse::<Level>()?,
        })
    }
}
