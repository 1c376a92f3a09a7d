use amqp_worker::QueueProducer;
use async_trait::async_trait;

use crate::error::TripResult;
use crate::models::TripDocument;

/// Publishes "trip completed" events for the settlement worker
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TripPublisher: Send + Sync {
    /// Returns once the broker has confirmed the event
    async fn publish_trip(&self, trip: &TripDocument) -> TripResult<()>;
}

#[async_trait]
impl TripPublisher for QueueProducer {
    async fn publish_trip(&self, trip: &TripDocument) -> TripResult<()> {
        self.publish(trip).await?;
        Ok(())
    }
}
