//! The generic `QueueWorker` consume loop.
//!
//! One *cycle* is connect → consume until the session ends → close. Cycles
//! repeat forever with [`Backoff`] sleeps in between, so broker outages never
//! terminate the process. Only the shutdown signal ends [`QueueWorker::run`].

use crate::ack::{AckDecision, AckPolicy};
use crate::backoff::Backoff;
use crate::config::WorkerConfig;
use crate::error::{ErrorCategory, WorkerError};
use crate::metrics::WorkerMetrics;
use crate::processor::{MessageProcessor, ProcessingReport};
use crate::transport::{ConsumerSession, InboundMessage, QueueTransport};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Connection lifecycle of the consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Disconnected,
    Connecting,
    Consuming,
    /// Shutdown completed, in-flight messages drained
    Stopped,
}

#[derive(Debug)]
enum CycleOutcome {
    /// Broker ended the consumer without an error
    Closed,
    Failed(WorkerError),
    Shutdown,
}

/// Generic queue worker that feeds deliveries to a processor.
///
/// Up to `prefetch_count` deliveries are processed concurrently; each one is
/// settled according to the configured [`AckPolicy`] only after processing
/// completes.
///
/// ```rust,ignore
/// let config = WorkerConfig::from_env::<TripCompletedQueue>()?;
/// let worker = QueueWorker::new(AmqpTransport::new(config.clone()), processor, config);
/// worker.run(shutdown_rx).await?;
/// ```
pub struct QueueWorker<T, P>
where
    T: QueueTransport,
    P: MessageProcessor,
{
    transport: T,
    processor: Arc<P>,
    config: WorkerConfig,
    metrics: WorkerMetrics,
    state: watch::Sender<ConsumerState>,
}

impl<T, P> QueueWorker<T, P>
where
    T: QueueTransport,
    P: MessageProcessor + 'static,
{
    pub fn new(transport: T, processor: P, config: WorkerConfig) -> Self {
        Self::with_arc_processor(transport, Arc::new(processor), config)
    }

    /// Create a worker sharing an existing processor
    pub fn with_arc_processor(transport: T, processor: Arc<P>, config: WorkerConfig) -> Self {
        let metrics = WorkerMetrics::new(&config.queue_name, processor.name());
        let (state, _) = watch::channel(ConsumerState::Disconnected);

        Self {
            transport,
            processor,
            config,
            metrics,
            state,
        }
    }

    pub fn state(&self) -> ConsumerState {
        *self.state.borrow()
    }

    /// Subscribe to state transitions
    pub fn watch_state(&self) -> watch::Receiver<ConsumerState> {
        self.state.subscribe()
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Run the consume loop until `shutdown` becomes true.
    ///
    /// Connection failures and unexpected errors are logged and retried after
    /// backoff. On shutdown, in-flight messages are processed and settled
    /// before the connection is closed.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), WorkerError> {
        info!(
            endpoint = %self.transport.endpoint(),
            queue = %self.config.queue_name,
            consumer_tag = %self.config.consumer_tag,
            prefetch = self.config.prefetch_count,
            ack_policy = %self.config.ack_policy,
            processor = %self.processor.name(),
            "Starting queue worker"
        );

        let mut backoff = Backoff::new(self.config.backoff_policy());

        loop {
            if *shutdown.borrow() {
                break;
            }

            let outcome = self.run_cycle(&mut shutdown).await;
            self.set_state(ConsumerState::Disconnected);

            let delay = match outcome {
                CycleOutcome::Shutdown => break,
                CycleOutcome::Closed => {
                    let delay = backoff.next_delay(true);
                    info!(
                        backoff_secs = delay.as_secs_f64(),
                        "Consumer closed by broker, reconnecting"
                    );
                    delay
                }
                CycleOutcome::Failed(e) => {
                    let delay = backoff.next_delay(false);
                    if e.category() == ErrorCategory::Transport {
                        warn!(
                            error = %e,
                            backoff_secs = delay.as_secs_f64(),
                            "Broker connection failed, reconnecting after backoff"
                        );
                    } else {
                        error!(
                            error = %e,
                            category = %e.category(),
                            backoff_secs = delay.as_secs_f64(),
                            "Unexpected consumer error, reconnecting after backoff"
                        );
                    }
                    delay
                }
            };
            self.metrics.reconnect_scheduled(delay);

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = wait_for_shutdown(&mut shutdown) => break,
            }
        }

        self.set_state(ConsumerState::Stopped);
        info!(queue = %self.config.queue_name, "Queue worker stopped");
        Ok(())
    }

    async fn run_cycle(&self, shutdown: &mut watch::Receiver<bool>) -> CycleOutcome {
        self.set_state(ConsumerState::Connecting);

        let mut session = tokio::select! {
            opened = self.transport.open() => match opened {
                Ok(session) => session,
                Err(e) => return CycleOutcome::Failed(e),
            },
            _ = wait_for_shutdown(shutdown) => return CycleOutcome::Shutdown,
        };

        self.set_state(ConsumerState::Consuming);
        info!(queue = %self.config.queue_name, "Waiting for messages");

        let outcome = self.consume(&mut session, shutdown).await;
        session.close().await;
        outcome
    }

    /// Pull deliveries while fewer than `prefetch_count` are in flight.
    ///
    /// Every exit path drains the in-flight set before returning.
    async fn consume(
        &self,
        session: &mut T::Session,
        shutdown: &mut watch::Receiver<bool>,
    ) -> CycleOutcome {
        let limit = usize::from(self.config.prefetch_count.max(1));
        let policy = self.config.ack_policy;
        let requeue_delay = Duration::from_millis(self.config.requeue_delay_ms);
        let mut in_flight: JoinSet<()> = JoinSet::new();

        let outcome = loop {
            tokio::select! {
                biased;

                _ = wait_for_shutdown(shutdown) => {
                    info!(in_flight = in_flight.len(), "Shutdown requested, draining in-flight messages");
                    break CycleOutcome::Shutdown;
                }

                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    log_join_result(joined);
                    self.metrics.set_in_flight(in_flight.len());
                }

                next = session.next_delivery(), if in_flight.len() < limit => match next {
                    Some(Ok(message)) => {
                        self.metrics.message_received();
                        in_flight.spawn(handle_delivery(
                            Arc::clone(&self.processor),
                            message,
                            policy,
                            requeue_delay,
                            self.metrics.clone(),
                        ));
                        self.metrics.set_in_flight(in_flight.len());
                    }
                    Some(Err(e)) => break CycleOutcome::Failed(e),
                    None => break CycleOutcome::Closed,
                },
            }
        };

        while let Some(joined) = in_flight.join_next().await {
            log_join_result(joined);
        }
        self.metrics.set_in_flight(0);

        outcome
    }

    fn set_state(&self, state: ConsumerState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(from = ?previous, to = ?state, "Consumer state changed");
            self.metrics.set_consuming(state == ConsumerState::Consuming);
        }
    }
}

/// Process one delivery, then settle it exactly once.
async fn handle_delivery<P, M>(
    processor: Arc<P>,
    message: M,
    policy: AckPolicy,
    requeue_delay: Duration,
    metrics: WorkerMetrics,
) where
    P: MessageProcessor,
    M: InboundMessage,
{
    let delivery_tag = message.delivery_tag();
    let start = Instant::now();

    let outcome = processor.process(message.body()).await.outcome();
    metrics.message_processed(&outcome, start.elapsed());

    let decision = policy.decide(&outcome);
    debug!(
        delivery_tag,
        redelivered = message.redelivered(),
        outcome = %outcome,
        decision = %decision,
        "Message processed"
    );

    let settled = match decision {
        AckDecision::Ack => message.ack().await,
        AckDecision::Requeue => {
            tokio::time::sleep(requeue_delay).await;
            message.requeue().await
        }
        AckDecision::Reject => message.reject().await,
    };

    match settled {
        Ok(()) => metrics.message_settled(decision),
        Err(e) => {
            metrics.settle_failed();
            warn!(
                delivery_tag,
                decision = %decision,
                error = %e,
                "Failed to settle message, broker will redeliver it"
            );
        }
    }
}

fn log_join_result(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        error!(error = %e, "Message handler task panicked, message left unsettled");
    }
}

/// Resolve once shutdown is requested.
///
/// A dropped sender can never request shutdown, so this then never resolves.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
