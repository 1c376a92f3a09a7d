#[cfg(feature = "config")]
use core_config::{ConfigError, FromEnv, env_or_default, env_parse_or};

/// Default MongoDB endpoint for local development
pub const DEFAULT_MONGO_URI: &str = "mongodb://127.0.0.1:27017";

/// Default database name
pub const DEFAULT_MONGO_DB: &str = "transflow";

/// MongoDB connection configuration
///
/// ```ignore
/// use database::mongodb::MongoConfig;
///
/// let config = MongoConfig::with_database("mongodb://localhost:27017", "transflow")
///     .with_app_name("settlement-worker");
/// ```
#[derive(Clone, Debug)]
pub struct MongoConfig {
    /// Format: mongodb://[username:password@]host[:port][/?options]
    pub url: String,

    /// Database name to use
    pub database: String,

    /// Optional application name for server logs
    pub app_name: Option<String>,

    pub max_pool_size: u32,
    pub min_pool_size: u32,
    pub connect_timeout_secs: u64,
    pub server_selection_timeout_secs: u64,
}

impl MongoConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_database(url, DEFAULT_MONGO_DB)
    }

    pub fn with_database(url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: database.into(),
            app_name: None,
            max_pool_size: 20,
            min_pool_size: 1,
            connect_timeout_secs: 10,
            server_selection_timeout_secs: 30,
        }
    }

    /// Set the application name for server logs
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MONGO_URI)
    }
}

/// Load MongoConfig from environment variables
///
/// - `MONGO_URI` (default `mongodb://127.0.0.1:27017`)
/// - `MONGO_DB` (default `transflow`)
/// - `MONGO_APP_NAME` (optional)
/// - `MONGO_MAX_POOL_SIZE` (default 20)
/// - `MONGO_SERVER_SELECTION_TIMEOUT_SECS` (default 30)
#[cfg(feature = "config")]
impl FromEnv for MongoConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::with_database(
            env_or_default("MONGO_URI", DEFAULT_MONGO_URI),
            env_or_default("MONGO_DB", DEFAULT_MONGO_DB),
        );

        config.app_name = std::env::var("MONGO_APP_NAME").ok();
        config.max_pool_size = env_parse_or("MONGO_MAX_POOL_SIZE", config.max_pool_size)?;
        config.server_selection_timeout_secs = env_parse_or(
            "MONGO_SERVER_SELECTION_TIMEOUT_SECS",
            config.server_selection_timeout_secs,
        )?;

        Ok(config)
    }
}
