//! AMQP Worker Framework
//!
//! A RabbitMQ consumer and producer for at-least-once message processing.
//!
//! ## Features
//!
//! - **Generic worker**: `QueueWorker<T, P>` feeds any queue transport to any processor
//! - **Reconnect backoff**: 1, 2, 4, ... capped seconds between cycles, reset after a clean close
//! - **Bounded concurrency**: prefetch limit doubles as the in-flight cap
//! - **Ack strategies**: `ack_always`, `ack_on_success`, `dead_letter`
//! - **Persistent publishing**: publisher confirms, connection reuse, sync wrapper
//! - **Prometheus metrics**: built-in observability
//!
//! ## Example
//!
//! ```ignore
//! use amqp_worker::{AmqpTransport, QueueDef, QueueWorker, WorkerConfig};
//!
//! struct MyQueue;
//! impl QueueDef for MyQueue {
//!     const QUEUE_NAME: &'static str = "my_jobs";
//! }
//!
//! let config = WorkerConfig::from_env::<MyQueue>()?;
//! let worker = QueueWorker::new(AmqpTransport::new(config.clone()), processor, config);
//! worker.run(shutdown_rx).await?;
//! ```

mod ack;
mod amqp;
mod backoff;
mod config;
mod error;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod metrics;
mod processor;
mod producer;
mod registry;
mod transport;
mod worker;

// Re-export main types
pub use ack::{AckDecision, AckPolicy};
pub use amqp::{AmqpMessage, AmqpSession, AmqpTransport, QueueDeclaration, redact_url};
pub use backoff::{Backoff, BackoffPolicy, BackoffStep};
pub use config::{DEFAULT_RABBIT_URL, WorkerConfig};
pub use error::{ErrorCategory, WorkerError};
pub use metrics::{WorkerMetrics, init_metrics};
pub use processor::{MessageProcessor, Outcome, ProcessingReport};
pub use producer::{PublishDispatch, QueueProducer};
pub use registry::{QueueDef, dead_letter_queue_name};
pub use transport::{ConsumerSession, InboundMessage, QueueTransport};
pub use worker::{ConsumerState, QueueWorker};
