//! Settlement Worker Service
//!
//! A background worker that settles completed trips from a RabbitMQ queue.
//!
//! ## Architecture
//!
//! ```text
//! RabbitMQ queue (corrida_finalizada)
//!   ↓ (prefetch 10, process-then-ack)
//! QueueWorker<AmqpTransport, TripProcessor>
//!   ├─▶ Redis    INCRBYFLOAT balance:<driver>
//!   └─▶ MongoDB  upsert corridas by id_corrida
//! ```
//!
//! ## Features
//!
//! - Reconnects forever with exponential backoff (1s doubling to 30s)
//! - Configurable ack policy (`ack_always`, `ack_on_success`, `dead_letter`)
//! - Graceful shutdown: in-flight trips finish and are settled before exit
//! - Optional Prometheus endpoint (`METRICS_PORT`)

use amqp_worker::{AmqpTransport, QueueWorker, WorkerConfig, init_metrics, redact_url};
use core_config::{ConfigError, Environment, FromEnv, env_parse_optional};
use database::{mongodb::MongoConfig, redis::RedisConfig};
use domain_trips::{MongoTripStore, RedisBalanceStore, TripCompletedQueue, TripProcessor};
use eyre::{Result, WrapErr};
use std::net::{Ipv4Addr, SocketAddr};
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

/// Process-level settings not owned by any library config
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementConfig {
    /// Serve Prometheus metrics on `0.0.0.0:<port>` when set
    pub metrics_port: Option<u16>,
}

impl SettlementConfig {
    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        self.metrics_port
            .map(|port| SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
    }
}

impl FromEnv for SettlementConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            metrics_port: env_parse_optional("METRICS_PORT")?,
        })
    }
}

/// Run the settlement worker
///
/// This is the main entry point for the worker. It:
/// 1. Sets up error reports and structured logging (JSON for prod, pretty for dev)
/// 2. Connects to Redis and MongoDB, retrying with backoff
/// 3. Runs the queue consumer until SIGINT/SIGTERM
///
/// The broker is not contacted here; the consumer owns that connection and
/// keeps retrying it for as long as the process runs.
///
/// # Errors
///
/// Returns an error if configuration is invalid or a store cannot be reached
/// at startup.
pub async fn run() -> Result<()> {
    core_config::tracing::install_color_eyre();
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    info!(
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        "Starting settlement worker"
    );
    info!("Environment: {:?}", environment);

    let settings = SettlementConfig::from_env().wrap_err("Failed to load worker settings")?;
    init_metrics(settings.metrics_addr()).wrap_err("Failed to initialize metrics")?;

    let redis_config = RedisConfig::from_env().wrap_err("Failed to load Redis configuration")?;
    info!("Connecting to Redis...");
    let redis = database::redis::connect_from_config_with_retry(&redis_config, None)
        .await
        .wrap_err("Failed to connect to Redis")?;
    info!("Connected to Redis successfully");

    let mongo_config = MongoConfig::from_env()
        .wrap_err("Failed to load MongoDB configuration")?
        .with_app_name(env!("CARGO_PKG_NAME"));
    info!(database = %mongo_config.database, "Connecting to MongoDB...");
    let db = database::mongodb::connect_from_config_with_retry(&mongo_config, None)
        .await
        .wrap_err("Failed to connect to MongoDB")?;
    info!("Connected to MongoDB successfully");

    let documents = MongoTripStore::new(db);
    documents
        .create_indexes()
        .await
        .wrap_err("Failed to create trip indexes")?;

    let worker_config = WorkerConfig::from_env::<TripCompletedQueue>()
        .wrap_err("Failed to load worker configuration")?;
    info!(
        broker = %redact_url(&worker_config.url),
        queue = %worker_config.queue_name,
        consumer_tag = %worker_config.consumer_tag,
        prefetch = worker_config.prefetch_count,
        max_backoff_secs = worker_config.max_backoff_secs,
        ack_policy = %worker_config.ack_policy,
        "Worker configuration loaded"
    );

    let processor = TripProcessor::new(RedisBalanceStore::new(redis), documents);
    let worker = QueueWorker::new(
        AmqpTransport::new(worker_config.clone()),
        processor,
        worker_config,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = shutdown_signal().await {
            error!("Error waiting for shutdown signal: {}", e);
        }
        shutdown_tx.send_replace(true);
    });

    worker
        .run(shutdown_rx)
        .await
        .map_err(|e| eyre::eyre!("{}", e))?;

    info!("Settlement worker stopped");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() -> Result<()> {
    let ctrl_c = async { signal::ctrl_c().await.wrap_err("Failed to listen for Ctrl+C") };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .wrap_err("Failed to install SIGTERM handler")?
            .recv()
            .await;
        Ok::<(), eyre::Report>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        result = ctrl_c => {
            result?;
            info!("Received Ctrl+C, initiating shutdown...");
        },
        result = terminate => {
            result?;
            info!("Received SIGTERM, initiating shutdown...");
        },
    }

    Ok(())
}
