use mongodb::bson::doc;
use mongodb::{Client, Database, options::ClientOptions};
use std::time::Duration;
use tracing::info;

use super::MongoConfig;
use crate::common::{DatabaseError, DatabaseResult, RetryConfig, retry_with_backoff};

/// Connect to MongoDB with default pool settings
///
/// ```ignore
/// let client = database::mongodb::connect("mongodb://localhost:27017").await?;
/// ```
pub async fn connect(url: &str) -> DatabaseResult<Client> {
    let client = build_client(&MongoConfig::new(url)).await?;
    ping(&client.database("admin")).await?;
    Ok(client)
}

/// Connect using a MongoConfig and return the configured database handle
pub async fn connect_from_config(config: &MongoConfig) -> DatabaseResult<Database> {
    let client = build_client(config).await?;
    let db = client.database(&config.database);
    ping(&db).await?;

    info!(database = %config.database, "Connected to MongoDB");
    Ok(db)
}

/// Connect from config, retrying with backoff on failure
pub async fn connect_from_config_with_retry(
    config: &MongoConfig,
    retry_config: Option<RetryConfig>,
) -> DatabaseResult<Database> {
    retry_with_backoff(|| connect_from_config(config), retry_config.unwrap_or_default()).await
}

async fn build_client(config: &MongoConfig) -> DatabaseResult<Client> {
    info!(url = %config.url, "Connecting to MongoDB");

    let mut options = ClientOptions::parse(&config.url).await?;
    options.max_pool_size = Some(config.max_pool_size);
    options.min_pool_size = Some(config.min_pool_size);
    options.connect_timeout = Some(Duration::from_secs(config.connect_timeout_secs));
    options.server_selection_timeout =
        Some(Duration::from_secs(config.server_selection_timeout_secs));

    if let Some(ref app_name) = config.app_name {
        options.app_name = Some(app_name.clone());
    }

    Ok(Client::with_options(options)?)
}

/// The driver connects lazily; `ping` forces server selection.
async fn ping(db: &Database) -> DatabaseResult<()> {
    db.run_command(doc! { "ping": 1 })
        .await
        .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
    Ok(())
}
