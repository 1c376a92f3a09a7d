use amqp_worker::QueueDef;

/// Durable queue carrying "trip completed" events
pub struct TripCompletedQueue;

impl QueueDef for TripCompletedQueue {
    const QUEUE_NAME: &'static str = "corrida_finalizada";
    const QUEUE_ENV_VAR: &'static str = "TRIP_QUEUE";
}
