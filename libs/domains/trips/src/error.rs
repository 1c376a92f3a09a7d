use amqp_worker::WorkerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TripError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Trip event has no usable 'id_corrida'")]
    MissingTripId,

    #[error("Counter store error: {0}")]
    CounterStore(String),

    #[error("Document store error: {0}")]
    DocumentStore(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type TripResult<T> = Result<T, TripError>;

impl From<redis::RedisError> for TripError {
    fn from(err: redis::RedisError) -> Self {
        TripError::CounterStore(err.to_string())
    }
}

impl From<mongodb::error::Error> for TripError {
    fn from(err: mongodb::error::Error) -> Self {
        TripError::DocumentStore(err.to_string())
    }
}

impl From<WorkerError> for TripError {
    fn from(err: WorkerError) -> Self {
        TripError::Publish(err.to_string())
    }
}

impl From<validator::ValidationErrors> for TripError {
    fn from(err: validator::ValidationErrors) -> Self {
        TripError::Validation(err.to_string())
    }
}

/// Why a message body could not be turned into a trip event
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("body is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("body is JSON {0}, expected an object")]
    NotAnObject(&'static str),
}
