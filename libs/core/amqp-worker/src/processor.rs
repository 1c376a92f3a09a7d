//! Message processor trait and processing outcomes.

use async_trait::async_trait;
use std::fmt;

/// Overall result of processing one delivery, used to pick the ack decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Every step applied (or was legitimately skipped)
    Success,
    /// Payload was understood but at least one step failed
    Partial(String),
    /// Payload can never be processed (malformed, wrong shape)
    Poison(String),
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Partial(_) => "partial",
            Outcome::Poison(_) => "poison",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => write!(f, "success"),
            Outcome::Partial(reason) => write!(f, "partial: {reason}"),
            Outcome::Poison(reason) => write!(f, "poison: {reason}"),
        }
    }
}

/// A processor's structured per-delivery report.
pub trait ProcessingReport: fmt::Debug + Send {
    /// Collapse the report into the outcome the ack policy decides on.
    fn outcome(&self) -> Outcome;
}

impl ProcessingReport for Outcome {
    fn outcome(&self) -> Outcome {
        self.clone()
    }
}

/// Trait for message processors.
///
/// Processors never fail: every failure is captured in the returned report so
/// the worker can settle the delivery and keep consuming.
///
/// # Example
///
/// ```rust,ignore
/// use amqp_worker::{MessageProcessor, Outcome};
///
/// struct AuditProcessor;
///
/// #[async_trait]
/// impl MessageProcessor for AuditProcessor {
///     type Report = Outcome;
///
///     async fn process(&self, body: &[u8]) -> Outcome {
///         match serde_json::from_slice::<serde_json::Value>(body) {
///             Ok(_) => Outcome::Success,
///             Err(e) => Outcome::Poison(e.to_string()),
///         }
///     }
///
///     fn name(&self) -> &'static str {
///         "AuditProcessor"
///     }
/// }
/// ```
#[async_trait]
pub trait MessageProcessor: Send + Sync {
    type Report: ProcessingReport + 'static;

    /// Process one message body.
    async fn process(&self, body: &[u8]) -> Self::Report;

    /// Processor name for logging and metric labels.
    fn name(&self) -> &'static str;
}
