//! Trip settlement processor.
//!
//! Applies the two effects of a "trip completed" event: the driver balance
//! increment and the trip document upsert. Each step has its own failure
//! domain and its own entry in the returned [`TripReport`].

use amqp_worker::{MessageProcessor, Outcome, ProcessingReport};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

use crate::error::PayloadError;
use crate::models::{DriverKey, TRIP_ID_FIELD, TripEvent};
use crate::repository::{BalanceStore, TripDocumentStore};

/// Why a step was not attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// `motorista.nome` missing, not a string, or empty
    NoDriver,
}

/// Why a step failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    /// `id_corrida` missing or not a string/number
    MissingTripId,
    /// The store rejected the operation or was unreachable
    Store(String),
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepError::MissingTripId => write!(f, "missing trip id"),
            StepError::Store(e) => write!(f, "{e}"),
        }
    }
}

/// Result of one effect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Applied,
    Skipped(SkipReason),
    Failed(StepError),
}

impl StepOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, StepOutcome::Failed(_))
    }
}

/// Effects applied for a well-formed event
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedTrip {
    pub trip_id: Option<Value>,
    pub driver: Option<DriverKey>,
    pub fare: f64,
    /// Balance after the increment, when it was applied
    pub new_balance: Option<f64>,
    pub balance: StepOutcome,
    pub document: StepOutcome,
}

/// Per-delivery report of the trip processor
#[derive(Debug, Clone, PartialEq)]
pub enum TripReport {
    /// Body could not be decoded; no store was touched
    Malformed(PayloadError),
    Processed(ProcessedTrip),
}

impl TripReport {
    pub fn processed(&self) -> Option<&ProcessedTrip> {
        match self {
            TripReport::Processed(trip) => Some(trip),
            TripReport::Malformed(_) => None,
        }
    }
}

impl ProcessingReport for TripReport {
    fn outcome(&self) -> Outcome {
        match self {
            TripReport::Malformed(e) => Outcome::Poison(e.to_string()),
            TripReport::Processed(trip) => {
                let failures: Vec<String> = [("balance", &trip.balance), ("document", &trip.document)]
                    .into_iter()
                    .filter_map(|(step, outcome)| match outcome {
                        StepOutcome::Failed(e) => Some(format!("{step}: {e}")),
                        _ => None,
                    })
                    .collect();

                if failures.is_empty() {
                    Outcome::Success
                } else {
                    Outcome::Partial(failures.join("; "))
                }
            }
        }
    }
}

/// Message processor for the trip completed queue.
///
/// Stores are shared with the rest of the process and must tolerate
/// concurrent calls from every in-flight delivery.
pub struct TripProcessor<B: BalanceStore, D: TripDocumentStore> {
    balances: Arc<B>,
    documents: Arc<D>,
}

impl<B: BalanceStore, D: TripDocumentStore> TripProcessor<B, D> {
    pub fn new(balances: B, documents: D) -> Self {
        Self::from_arcs(Arc::new(balances), Arc::new(documents))
    }

    pub fn from_arcs(balances: Arc<B>, documents: Arc<D>) -> Self {
        Self {
            balances,
            documents,
        }
    }

    /// Process one raw message body.
    pub async fn handle(&self, body: &[u8]) -> TripReport {
        let event = match TripEvent::parse(body) {
            Ok(event) => event,
            Err(e) => {
                error!(error = %e, bytes = body.len(), "Discarding malformed trip event");
                return TripReport::Malformed(e);
            }
        };

        let trip_id = event.trip_id_label();
        let driver = event.driver_key();
        let fare = event.fare();

        let (balance, new_balance) = self.apply_balance(&trip_id, driver.as_ref(), fare).await;
        let document = self.apply_document(&trip_id, &event).await;

        TripReport::Processed(ProcessedTrip {
            trip_id: event.trip_id().cloned(),
            driver,
            fare,
            new_balance,
            balance,
            document,
        })
    }

    async fn apply_balance(
        &self,
        trip_id: &str,
        driver: Option<&DriverKey>,
        fare: f64,
    ) -> (StepOutcome, Option<f64>) {
        let Some(driver) = driver else {
            info!(trip_id = %trip_id, "No driver on trip, balance untouched");
            return (StepOutcome::Skipped(SkipReason::NoDriver), None);
        };

        match self.balances.increment_balance(driver, fare).await {
            Ok(total) => {
                info!(trip_id = %trip_id, driver = %driver, fare, balance = total, "Driver balance updated");
                (StepOutcome::Applied, Some(total))
            }
            Err(e) => {
                error!(trip_id = %trip_id, driver = %driver, fare, error = %e, "Failed to update driver balance");
                (StepOutcome::Failed(StepError::Store(e.to_string())), None)
            }
        }
    }

    async fn apply_document(&self, trip_id: &str, event: &TripEvent) -> StepOutcome {
        let Some(id) = event.trip_id() else {
            error!(trip_id = %trip_id, "Trip has no usable id, document not stored");
            return StepOutcome::Failed(StepError::MissingTripId);
        };

        match self
            .documents
            .upsert(TRIP_ID_FIELD, id, event.payload())
            .await
        {
            Ok(()) => {
                info!(trip_id = %trip_id, "Trip document stored");
                StepOutcome::Applied
            }
            Err(e) => {
                error!(trip_id = %trip_id, error = %e, "Failed to store trip document");
                StepOutcome::Failed(StepError::Store(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl<B, D> MessageProcessor for TripProcessor<B, D>
where
    B: BalanceStore + 'static,
    D: TripDocumentStore + 'static,
{
    type Report = TripReport;

    async fn process(&self, body: &[u8]) -> TripReport {
        self.handle(body).await
    }

    fn name(&self) -> &'static str {
        "TripProcessor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TripError;
    use crate::memory::{InMemoryBalanceStore, InMemoryTripStore};
    use crate::repository::{MockBalanceStore, MockTripDocumentStore};
    use amqp_worker::memory::{InMemoryTransport, SessionEnd, Settlement};
    use amqp_worker::{AckPolicy, QueueWorker, WorkerConfig};
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::watch;

    fn body(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    fn trip(id: &str, driver: &str, fare: Value) -> Vec<u8> {
        body(json!({
            "id_corrida": id,
            "passageiro": {"nome": "Bia", "telefone": "11 90000-0000"},
            "motorista": {"nome": driver, "nota": 4.8},
            "origem": "Centro",
            "destino": "Aeroporto",
            "valor_corrida": fare,
            "forma_pagamento": "pix"
        }))
    }

    fn memory_processor() -> (
        TripProcessor<InMemoryBalanceStore, InMemoryTripStore>,
        Arc<InMemoryBalanceStore>,
        Arc<InMemoryTripStore>,
    ) {
        let balances = Arc::new(InMemoryBalanceStore::new());
        let documents = Arc::new(InMemoryTripStore::new());
        let processor = TripProcessor::from_arcs(balances.clone(), documents.clone());
        (processor, balances, documents)
    }

    #[tokio::test]
    async fn test_well_formed_event_applies_both_effects() {
        let (processor, balances, documents) = memory_processor();
        balances.set("balance:carla", 10.0);

        let report = processor.handle(&trip("c-1", "Carla", json!(35.5))).await;

        let processed = report.processed().unwrap();
        assert_eq!(processed.balance, StepOutcome::Applied);
        assert_eq!(processed.document, StepOutcome::Applied);
        assert_eq!(processed.new_balance, Some(45.5));
        assert_eq!(report.outcome(), Outcome::Success);

        assert_eq!(balances.value("balance:carla"), Some(45.5));
        let stored = documents.get(&json!("c-1")).unwrap();
        let published: Value = serde_json::from_slice(&trip("c-1", "Carla", json!(35.5))).unwrap();
        assert_eq!(Value::Object(stored), published);
    }

    #[tokio::test]
    async fn test_driver_name_is_case_folded() {
        let (processor, balances, _) = memory_processor();

        processor.handle(&trip("c-1", "CARLA", json!(10))).await;
        processor.handle(&trip("c-2", "carla", json!(5))).await;

        assert_eq!(balances.value("balance:carla"), Some(15.0));
    }

    #[tokio::test]
    async fn test_document_upsert_is_idempotent() {
        let (processor, _, documents) = memory_processor();
        let event = trip("c-7", "Carla", json!(20));

        processor.handle(&event).await;
        let once = documents.snapshot();

        for _ in 0..4 {
            processor.handle(&event).await;
        }

        assert_eq!(documents.snapshot(), once);
        assert_eq!(documents.len(), 1);
    }

    #[tokio::test]
    async fn test_balance_increment_is_not_idempotent() {
        let (processor, balances, _) = memory_processor();
        let event = trip("c-7", "Carla", json!(20));

        for _ in 0..3 {
            processor.handle(&event).await;
        }

        // Redelivery double-counts: no deduplication by trip id.
        assert_eq!(balances.value("balance:carla"), Some(60.0));
    }

    #[tokio::test]
    async fn test_malformed_body_touches_no_store() {
        let mut balances = MockBalanceStore::new();
        balances.expect_increment_balance().never();
        let mut documents = MockTripDocumentStore::new();
        documents.expect_upsert().never();

        let processor = TripProcessor::new(balances, documents);
        let report = processor.handle(b"{not json").await;

        assert!(matches!(report, TripReport::Malformed(PayloadError::InvalidJson(_))));
        assert!(matches!(report.outcome(), Outcome::Poison(_)));
    }

    #[tokio::test]
    async fn test_non_object_body_is_malformed() {
        let (processor, balances, documents) = memory_processor();

        let report = processor.handle(b"[\"c-1\"]").await;

        assert_eq!(report, TripReport::Malformed(PayloadError::NotAnObject("array")));
        assert!(balances.is_empty());
        assert_eq!(documents.len(), 0);
    }

    #[tokio::test]
    async fn test_missing_driver_skips_balance_but_stores_document() {
        let mut balances = MockBalanceStore::new();
        balances.expect_increment_balance().never();
        let mut documents = MockTripDocumentStore::new();
        documents
            .expect_upsert()
            .times(1)
            .returning(|_, _, _| Ok(()));

        let processor = TripProcessor::new(balances, documents);
        let report = processor
            .handle(&body(json!({"id_corrida": "c-3", "valor_corrida": 12})))
            .await;

        let processed = report.processed().unwrap();
        assert_eq!(processed.balance, StepOutcome::Skipped(SkipReason::NoDriver));
        assert_eq!(processed.document, StepOutcome::Applied);
        assert_eq!(report.outcome(), Outcome::Success);
    }

    #[tokio::test]
    async fn test_unparsable_fare_counts_as_zero_and_keeps_raw_value() {
        let (processor, balances, documents) = memory_processor();

        let report = processor.handle(&trip("c-4", "Carla", json!("abc"))).await;

        assert_eq!(report.processed().unwrap().fare, 0.0);
        assert_eq!(balances.value("balance:carla"), Some(0.0));
        assert_eq!(documents.get(&json!("c-4")).unwrap()["valor_corrida"], json!("abc"));
    }

    #[tokio::test]
    async fn test_balance_failure_does_not_block_document() {
        let mut balances = MockBalanceStore::new();
        balances
            .expect_increment_balance()
            .returning(|_, _| Err(TripError::CounterStore("connection refused".into())));
        let mut documents = MockTripDocumentStore::new();
        documents
            .expect_upsert()
            .withf(|key, value, _| key == "id_corrida" && *value == json!("c-5"))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let processor = TripProcessor::new(balances, documents);
        let report = processor.handle(&trip("c-5", "Carla", json!(9.9))).await;

        let processed = report.processed().unwrap();
        assert!(processed.balance.is_failed());
        assert_eq!(processed.document, StepOutcome::Applied);
        assert_eq!(processed.new_balance, None);
        assert!(matches!(report.outcome(), Outcome::Partial(reason) if reason.starts_with("balance")));
    }

    #[tokio::test]
    async fn test_document_failure_keeps_balance() {
        let mut balances = MockBalanceStore::new();
        balances
            .expect_increment_balance()
            .times(1)
            .returning(|_, delta| Ok(delta));
        let mut documents = MockTripDocumentStore::new();
        documents
            .expect_upsert()
            .returning(|_, _, _| Err(TripError::DocumentStore("not primary".into())));

        let processor = TripProcessor::new(balances, documents);
        let report = processor.handle(&trip("c-6", "Carla", json!(9.9))).await;

        let processed = report.processed().unwrap();
        assert_eq!(processed.balance, StepOutcome::Applied);
        assert_eq!(
            processed.document,
            StepOutcome::Failed(StepError::Store("Document store error: not primary".into()))
        );
        assert!(matches!(report.outcome(), Outcome::Partial(reason) if reason.starts_with("document")));
    }

    #[tokio::test]
    async fn test_missing_trip_id_fails_document_step() {
        let (processor, balances, documents) = memory_processor();

        let report = processor
            .handle(&body(json!({"motorista": {"nome": "Carla"}, "valor_corrida": 5})))
            .await;

        let processed = report.processed().unwrap();
        assert_eq!(processed.balance, StepOutcome::Applied);
        assert_eq!(processed.document, StepOutcome::Failed(StepError::MissingTripId));
        assert_eq!(balances.value("balance:carla"), Some(5.0));
        assert_eq!(documents.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pipeline_settles_every_delivery() {
        let (processor, balances, documents) = memory_processor();

        let mut messages: Vec<Vec<u8>> = (0..15)
            .map(|i| trip(&format!("c-{i}"), "Carla", json!(2.0)))
            .collect();
        messages.push(b"garbage".to_vec());
        messages.push(body(json!({"id_corrida": "c-99", "valor_corrida": 1})));

        let transport = InMemoryTransport::new().session(messages, SessionEnd::Hold);
        let config = WorkerConfig::new("memory://", "corrida_finalizada");
        let worker = QueueWorker::new(transport.clone(), processor, config);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let run = tokio::spawn(async move { worker.run(shutdown_rx).await });

        tokio::time::sleep(Duration::from_secs(1)).await;
        shutdown_tx.send_replace(true);
        run.await.unwrap().unwrap();

        assert_eq!(transport.count(Settlement::Acked), 17);
        assert_eq!(balances.value("balance:carla"), Some(30.0));
        assert_eq!(documents.len(), 16);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pipeline_requeues_partial_failures_on_success_policy() {
        let mut balances = MockBalanceStore::new();
        balances
            .expect_increment_balance()
            .returning(|_, _| Err(TripError::CounterStore("down".into())));
        let (_, _, documents) = memory_processor();
        let processor = TripProcessor::from_arcs(Arc::new(balances), documents);

        let transport = InMemoryTransport::new()
            .session([trip("c-1", "Carla", json!(1)), b"{".to_vec()], SessionEnd::Hold);
        let config = WorkerConfig::new("memory://", "corrida_finalizada")
            .with_ack_policy(AckPolicy::AckOnSuccess)
            .with_requeue_delay_ms(10);
        let worker = QueueWorker::new(transport.clone(), processor, config);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let run = tokio::spawn(async move { worker.run(shutdown_rx).await });

        tokio::time::sleep(Duration::from_secs(1)).await;
        shutdown_tx.send_replace(true);
        run.await.unwrap().unwrap();

        assert_eq!(transport.count(Settlement::Requeued), 1);
        assert_eq!(transport.count(Settlement::Acked), 1);
    }
}
