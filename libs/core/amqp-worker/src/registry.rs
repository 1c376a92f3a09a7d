//! Queue definitions.
//!
//! Each domain implements [`QueueDef`] once for every queue it produces to or
//! consumes from, so producer and consumer agree on names and defaults.

/// Queue definition trait.
///
/// # Example
///
/// ```rust,ignore
/// use amqp_worker::QueueDef;
///
/// pub struct InvoiceQueue;
///
/// impl QueueDef for InvoiceQueue {
///     const QUEUE_NAME: &'static str = "invoice_issued";
///     const QUEUE_ENV_VAR: &'static str = "INVOICE_QUEUE";
/// }
/// ```
pub trait QueueDef: Send + Sync {
    /// Durable queue name
    const QUEUE_NAME: &'static str;

    /// Environment variable that overrides the queue name
    const QUEUE_ENV_VAR: &'static str = "QUEUE_NAME";

    /// Maximum number of unacknowledged deliveries per consumer
    const PREFETCH_COUNT: u16 = 10;

    /// Name of the queue that receives rejected deliveries
    fn dead_letter_queue() -> String {
        dead_letter_queue_name(Self::QUEUE_NAME)
    }
}

/// Dead-letter queue naming convention: `<queue>.dlq`
pub fn dead_letter_queue_name(queue: &str) -> String {
    format!("{queue}.dlq")
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PaymentsQueue;

    impl QueueDef for PaymentsQueue {
        const QUEUE_NAME: &'static str = "payments";
    }

    #[test]
    fn test_queue_def_defaults() {
        assert_eq!(PaymentsQueue::QUEUE_ENV_VAR, "QUEUE_NAME");
        assert_eq!(PaymentsQueue::PREFETCH_COUNT, 10);
        assert_eq!(PaymentsQueue::dead_letter_queue(), "payments.dlq");
    }
}
