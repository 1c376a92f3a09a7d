#[cfg(feature = "config")]
use core_config::{ConfigError, FromEnv, env_or_default, env_parse_optional};

/// Default Redis endpoint for local development
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Redis connection configuration
///
/// ```ignore
/// use database::redis::RedisConfig;
///
/// let config = RedisConfig::new("redis://127.0.0.1:6379").with_database(2);
/// assert_eq!(config.build_url(), "redis://127.0.0.1:6379/2");
/// ```
#[derive(Clone, Debug)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: String,

    /// Optional logical database number, appended to the URL when the URL has none
    pub database: Option<u8>,
}

impl RedisConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: None,
        }
    }

    pub fn with_database(mut self, database: u8) -> Self {
        self.database = Some(database);
        self
    }

    /// Build the URL actually used to connect.
    ///
    /// An explicit path in `url` (e.g. `redis://host:6379/0`) wins over `database`.
    pub fn build_url(&self) -> String {
        let Some(database) = self.database else {
            return self.url.clone();
        };

        let trimmed = self.url.trim_end_matches('/');
        let has_path = trimmed
            .split_once("://")
            .map(|(_, rest)| rest.contains('/'))
            .unwrap_or(false);

        if has_path {
            self.url.clone()
        } else {
            format!("{}/{}", trimmed, database)
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self::new(DEFAULT_REDIS_URL)
    }
}

/// Load RedisConfig from environment variables
///
/// - `REDIS_URL` (default `redis://127.0.0.1:6379`)
/// - `REDIS_DATABASE` (optional, 0-15)
#[cfg(feature = "config")]
impl FromEnv for RedisConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: env_or_default("REDIS_URL", DEFAULT_REDIS_URL),
            database: env_parse_optional("REDIS_DATABASE")?,
        })
    }
}
