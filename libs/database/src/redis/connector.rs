use redis::Client;
use redis::aio::ConnectionManager;
use tracing::info;

use super::RedisConfig;
use crate::common::{RetryConfig, retry_with_backoff};

/// Connect to Redis and return a ConnectionManager
///
/// The connection is verified with `PING` before it is handed out.
pub async fn connect(url: &str) -> redis::RedisResult<ConnectionManager> {
    info!(url = %url, "Connecting to Redis");

    let client = Client::open(url)?;
    let manager = ConnectionManager::new(client).await?;

    let mut conn = manager.clone();
    let _: String = redis::cmd("PING").query_async(&mut conn).await?;

    info!("Connected to Redis");
    Ok(manager)
}

/// Connect using a RedisConfig
pub async fn connect_from_config(config: &RedisConfig) -> redis::RedisResult<ConnectionManager> {
    connect(&config.build_url()).await
}

/// Connect from config, retrying with backoff on failure
///
/// ```ignore
/// use database::redis::{RedisConfig, connect_from_config_with_retry};
///
/// let config = RedisConfig::from_env()?;
/// let conn = connect_from_config_with_retry(&config, None).await?;
/// ```
pub async fn connect_from_config_with_retry(
    config: &RedisConfig,
    retry_config: Option<RetryConfig>,
) -> redis::RedisResult<ConnectionManager> {
    let url = config.build_url();
    retry_with_backoff(|| connect(&url), retry_config.unwrap_or_default()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_rejects_malformed_url() {
        let result = connect("not-a-redis-url").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    #[ignore] // Requires actual Redis
    async fn test_connect() {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

        assert!(connect(&redis_url).await.is_ok());
    }
}
