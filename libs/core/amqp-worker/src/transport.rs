//! Transport seam between the worker loop and a concrete broker client.
//!
//! [`AmqpTransport`](crate::AmqpTransport) is the production implementation;
//! `memory::InMemoryTransport`, behind the `testing` feature, scripts
//! sessions for tests.

use crate::error::WorkerError;
use async_trait::async_trait;

/// A delivery that must be settled exactly once.
#[async_trait]
pub trait InboundMessage: Send + Sync + 'static {
    fn body(&self) -> &[u8];

    fn delivery_tag(&self) -> u64;

    /// Whether the broker has delivered this message before
    fn redelivered(&self) -> bool;

    async fn ack(&self) -> Result<(), WorkerError>;

    /// Return the message to the queue
    async fn requeue(&self) -> Result<(), WorkerError>;

    /// Drop the message, dead-lettering it if the queue has a DLX
    async fn reject(&self) -> Result<(), WorkerError>;
}

/// One live connection plus consumer.
#[async_trait]
pub trait ConsumerSession: Send {
    type Message: InboundMessage;

    /// Next delivery, `Some(Err)` on a broken connection, `None` when the
    /// broker ended the consumer cleanly.
    ///
    /// Must be cancel safe: it is raced against shutdown and task completion.
    async fn next_delivery(&mut self) -> Option<Result<Self::Message, WorkerError>>;

    /// Close the channel and connection, ignoring errors.
    async fn close(&mut self);
}

/// Opens consumer sessions.
#[async_trait]
pub trait QueueTransport: Send + Sync {
    type Session: ConsumerSession;

    /// Connect, apply prefetch, declare the queue, and start consuming.
    async fn open(&self) -> Result<Self::Session, WorkerError>;

    /// Endpoint description for logs, without credentials
    fn endpoint(&self) -> String;
}
