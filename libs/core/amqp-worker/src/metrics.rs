//! Prometheus metrics for queue workers
//!
//! Metrics are recorded through the `metrics` facade and are no-ops until a
//! recorder is installed with [`init_metrics`].

use crate::ack::AckDecision;
use crate::error::WorkerError;
use crate::processor::Outcome;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{error, info};

static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder.
///
/// With `listen` set, the exporter also serves `/metrics` on that address,
/// which requires a running Tokio runtime. Subsequent calls are no-ops.
pub fn init_metrics(listen: Option<SocketAddr>) -> Result<(), WorkerError> {
    PROMETHEUS_HANDLE
        .get_or_try_init(|| match listen {
            Some(addr) => {
                let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
                    WorkerError::Config(format!("metrics listener needs a runtime: {e}"))
                })?;

                let (recorder, exporter) = PrometheusBuilder::new()
                    .with_http_listener(addr)
                    .build()
                    .map_err(|e| WorkerError::Config(format!("metrics exporter: {e}")))?;
                let handle = recorder.handle();

                metrics::set_global_recorder(recorder)
                    .map_err(|e| WorkerError::Internal(format!("metrics recorder: {e}")))?;

                runtime.spawn(async move {
                    if let Err(e) = exporter.await {
                        error!(error = ?e, "Prometheus exporter stopped");
                    }
                });

                info!(%addr, "Prometheus metrics listener started");
                Ok(handle)
            }
            None => {
                let handle = PrometheusBuilder::new()
                    .install_recorder()
                    .map_err(|e| WorkerError::Internal(format!("metrics recorder: {e}")))?;
                info!("Prometheus metrics initialized");
                Ok(handle)
            }
        })
        .map(|_| ())
}

/// Get the Prometheus handle for rendering metrics
pub fn prometheus_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

/// Render metrics in Prometheus format
pub fn render_metrics() -> String {
    prometheus_handle().map(|h| h.render()).unwrap_or_default()
}

/// Queue worker metrics helper
#[derive(Clone, Debug)]
pub struct WorkerMetrics {
    queue: String,
    processor: String,
}

impl WorkerMetrics {
    pub fn new(queue: impl Into<String>, processor: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            processor: processor.into(),
        }
    }

    pub fn message_received(&self) {
        counter!(
            "amqp_worker_messages_received_total",
            "queue" => self.queue.clone(),
            "processor" => self.processor.clone()
        )
        .increment(1);
    }

    /// Record a processed message with its outcome and handler latency
    pub fn message_processed(&self, outcome: &Outcome, duration: Duration) {
        counter!(
            "amqp_worker_messages_processed_total",
            "queue" => self.queue.clone(),
            "processor" => self.processor.clone(),
            "outcome" => outcome.label()
        )
        .increment(1);

        histogram!(
            "amqp_worker_processing_duration_seconds",
            "queue" => self.queue.clone(),
            "processor" => self.processor.clone()
        )
        .record(duration.as_secs_f64());
    }

    pub fn message_settled(&self, decision: AckDecision) {
        counter!(
            "amqp_worker_settlements_total",
            "queue" => self.queue.clone(),
            "decision" => decision.to_string()
        )
        .increment(1);
    }

    pub fn settle_failed(&self) {
        counter!(
            "amqp_worker_settle_failures_total",
            "queue" => self.queue.clone()
        )
        .increment(1);
    }

    pub fn set_in_flight(&self, count: usize) {
        gauge!(
            "amqp_worker_in_flight",
            "queue" => self.queue.clone()
        )
        .set(count as f64);
    }

    /// Record a reconnect and the delay before it
    pub fn reconnect_scheduled(&self, delay: Duration) {
        counter!(
            "amqp_worker_reconnects_total",
            "queue" => self.queue.clone()
        )
        .increment(1);

        gauge!(
            "amqp_worker_backoff_seconds",
            "queue" => self.queue.clone()
        )
        .set(delay.as_secs_f64());
    }

    pub fn set_consuming(&self, consuming: bool) {
        gauge!(
            "amqp_worker_consuming",
            "queue" => self.queue.clone()
        )
        .set(if consuming { 1.0 } else { 0.0 });
    }
}
