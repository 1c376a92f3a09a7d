//! Trips Domain
//!
//! Settlement of completed trips: every "trip completed" event credits the
//! driver's balance and stores the trip document.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │ TripService  │  ← validate, store, publish
//! └──────┬───────┘
//!        │ corrida_finalizada
//! ┌──────▼───────┐
//! │TripProcessor │  ← one TripReport per delivery
//! └──┬────────┬──┘
//!    │        │
//! ┌──▼─────┐ ┌▼──────────────────┐
//! │Balance │ │ TripDocumentStore │
//! │ Store  │ │    (MongoDB)      │
//! │(Redis) │ └───────────────────┘
//! └────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use amqp_worker::{AmqpTransport, QueueWorker, WorkerConfig};
//! use domain_trips::{MongoTripStore, RedisBalanceStore, TripCompletedQueue, TripProcessor};
//!
//! let processor = TripProcessor::new(RedisBalanceStore::new(redis), MongoTripStore::new(db));
//! let config = WorkerConfig::from_env::<TripCompletedQueue>()?;
//! let worker = QueueWorker::new(AmqpTransport::new(config.clone()), processor, config);
//! worker.run(shutdown_rx).await?;
//! ```

pub mod error;
pub mod models;
pub mod mongodb;
pub mod processor;
pub mod publisher;
pub mod queue;
pub mod redis;
pub mod repository;
pub mod service;

#[cfg(test)]
mod memory;

pub use error::{PayloadError, TripError, TripResult};
pub use models::{DriverBalance, DriverKey, NewTrip, TripDocument, TripEvent, coerce_fare};
pub use mongodb::MongoTripStore;
pub use processor::{ProcessedTrip, SkipReason, StepError, StepOutcome, TripProcessor, TripReport};
pub use publisher::TripPublisher;
pub use queue::TripCompletedQueue;
pub use redis::RedisBalanceStore;
pub use repository::{BalanceStore, TripDocumentStore};
pub use service::TripService;
