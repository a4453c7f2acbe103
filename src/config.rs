use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Runtime configuration, sourced from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// When unset the service runs with in-memory repositories.
    pub database_url: Option<String>,
    /// How often the auto-start poller scans for eligible battles.
    pub auto_start_poll: Duration,
    /// How long a full lobby may sit before being force-started.
    pub auto_start_grace: Duration,
    pub box_cache_ttl: Duration,
    pub box_cache_capacity: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("3000")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_url = env_map.get("DATABASE_URL").cloned();

        let auto_start_poll = parse_secs(&env_map, "AUTO_START_POLL_SECS", 60)?;
        let auto_start_grace = parse_secs(&env_map, "AUTO_START_GRACE_SECS", 30 * 60)?;
        let box_cache_ttl = parse_secs(&env_map, "BOX_CACHE_TTL_SECS", 60)?;

        let box_cache_capacity = env_map
            .get("BOX_CACHE_CAPACITY")
            .map(|s| s.as_str())
            .unwrap_or("256")
            .parse::<usize>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "BOX_CACHE_CAPACITY".to_string(),
                    "must be a valid usize".to_string(),
                )
            })?;

        Ok(Config {
            port,
            database_url,
            auto_start_poll,
            auto_start_grace,
            box_cache_ttl,
            box_cache_capacity,
        })
    }
}

fn parse_secs(
    env_map: &HashMap<String, String>,
    key: &str,
    default_secs: u64,
) -> Result<Duration, ConfigError> {
    match env_map.get(key) {
        None => Ok(Duration::from_secs(default_secs)),
        Some(raw) => raw
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| {
                ConfigError::InvalidValue(key.to_string(), "must be a number of seconds".to_string())
            }),
    }
}
