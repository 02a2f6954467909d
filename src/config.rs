//! Runtime settings read from the environment.

use crate::models::ConfigError;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Engine behavior shared by every tournament.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EngineConfig {
    /// Matches per knockout pairing. Odd, at least 1.
    pub best_of: u32,
    /// Fixed seed for group draws and knockout pairing; `None` uses entropy.
    pub rng_seed: Option<u64>,
    /// Failed pushes after which a sync entry is dropped.
    pub max_sync_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            best_of: 1,
            rng_seed: None,
            max_sync_attempts: 5,
        }
    }
}

impl EngineConfig {
    /// Override defaults with TOURNAMENT_BEST_OF, TOURNAMENT_RNG_SEED and
    /// TOURNAMENT_SYNC_ATTEMPTS. Unparsable values fall back to the default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            best_of: env_or("TOURNAMENT_BEST_OF", defaults.best_of),
            rng_seed: env_parse("TOURNAMENT_RNG_SEED"),
            max_sync_attempts: env_or("TOURNAMENT_SYNC_ATTEMPTS", defaults.max_sync_attempts),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.best_of == 0 || self.best_of % 2 == 0 {
            return Err(ConfigError::InvalidBestOf(self.best_of));
        }
        Ok(())
    }
}

/// Where the web binary listens and how often it flushes the sync queue.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub sync_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            sync_interval: Duration::from_secs(60),
        }
    }
}

impl ServerConfig {
    /// HOST, PORT and SYNC_INTERVAL_SECS.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: env_or("PORT", defaults.port),
            sync_interval: env_parse("SYNC_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.sync_interval),
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env_parse(key).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_of_must_be_odd() {
        for best_of in [1, 3, 5] {
            let config = EngineConfig {
                best_of,
                ..EngineConfig::default()
            };
            assert_eq!(config.validate(), Ok(()));
        }
        for best_of in [0, 2, 4] {
            let config = EngineConfig {
                best_of,
                ..EngineConfig::default()
            };
            assert_eq!(config.validate(), Err(ConfigError::InvalidBestOf(best_of)));
        }
    }

    #[test]
    fn server_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.sync_interval, Duration::from_secs(60));
    }
}
