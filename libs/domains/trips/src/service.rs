//! Trip Service - submission and read side

use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;
use validator::Validate;

use crate::error::{TripError, TripResult};
use crate::models::{
    DriverBalance, DriverKey, NewTrip, PAYMENT_METHOD_FIELD, TRIP_ID_FIELD, TripDocument,
};
use crate::publisher::TripPublisher;
use crate::repository::{BalanceStore, TripDocumentStore};

/// Maximum number of trips returned by list queries
pub const LIST_LIMIT: i64 = 1000;

/// Trip service
///
/// Submissions are stored first and then published for settlement. The
/// balance is only ever changed by the settlement worker.
pub struct TripService<D, B, P>
where
    D: TripDocumentStore,
    B: BalanceStore,
    P: TripPublisher,
{
    documents: Arc<D>,
    balances: Arc<B>,
    publisher: Arc<P>,
}

impl<D, B, P> TripService<D, B, P>
where
    D: TripDocumentStore,
    B: BalanceStore,
    P: TripPublisher,
{
    pub fn new(documents: D, balances: B, publisher: P) -> Self {
        Self::from_arcs(Arc::new(documents), Arc::new(balances), Arc::new(publisher))
    }

    pub fn from_arcs(documents: Arc<D>, balances: Arc<B>, publisher: Arc<P>) -> Self {
        Self {
            documents,
            balances,
            publisher,
        }
    }

    /// Validate, store and publish a completed trip
    #[instrument(skip(self, input), fields(trip_id = %input.trip_id))]
    pub async fn submit_trip(&self, input: NewTrip) -> TripResult<TripDocument> {
        input
            .validate()
            .map_err(|e| TripError::Validation(e.to_string()))?;

        let document = match serde_json::to_value(&input)? {
            Value::Object(document) => document,
            _ => return Err(TripError::Validation("trip must be an object".into())),
        };
        let trip_id = Value::String(input.trip_id);

        self.documents
            .upsert(TRIP_ID_FIELD, &trip_id, &document)
            .await?;
        self.publisher.publish_trip(&document).await?;

        tracing::info!("Trip submitted for settlement");
        Ok(document)
    }

    /// Current balance of a driver, matched case-insensitively
    #[instrument(skip(self))]
    pub async fn driver_balance(&self, name: &str) -> TripResult<DriverBalance> {
        if name.trim().is_empty() {
            return Err(TripError::Validation("driver name must not be empty".into()));
        }

        let key = DriverKey::new(name);
        let balance = self.balances.get_balance(&key).await?;

        Ok(DriverBalance {
            driver: key.as_str().to_string(),
            balance,
        })
    }

    /// Get one trip by id
    #[instrument(skip(self))]
    pub async fn get_trip(&self, trip_id: &str) -> TripResult<Option<TripDocument>> {
        self.documents
            .find(&Value::String(trip_id.to_string()))
            .await
    }

    #[instrument(skip(self))]
    pub async fn list_trips(&self) -> TripResult<Vec<TripDocument>> {
        self.documents.list(LIST_LIMIT).await
    }

    #[instrument(skip(self))]
    pub async fn trips_by_payment_method(&self, method: &str) -> TripResult<Vec<TripDocument>> {
        self.documents
            .list_by_field(
                PAYMENT_METHOD_FIELD,
                &Value::String(method.to_string()),
                LIST_LIMIT,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryBalanceStore, InMemoryTripStore};
    use crate::models::{Driver, Passenger};
    use crate::publisher::MockTripPublisher;
    use crate::repository::{MockBalanceStore, MockTripDocumentStore};
    use serde_json::json;

    fn new_trip(id: &str, payment: &str) -> NewTrip {
        NewTrip {
            trip_id: id.to_string(),
            passenger: Passenger {
                name: "Bia".into(),
                phone: "11 90000-0000".into(),
            },
            driver: Driver {
                name: "Carla".into(),
                rating: Some(4.9),
            },
            origin: "Centro".into(),
            destination: "Aeroporto".into(),
            fare: 35.5,
            payment_method: payment.to_string(),
        }
    }

    #[tokio::test]
    async fn test_submit_trip_stores_then_publishes() {
        let documents = InMemoryTripStore::new();
        let mut publisher = MockTripPublisher::new();
        publisher
            .expect_publish_trip()
            .withf(|trip| trip["id_corrida"] == json!("c-1") && trip["valor_corrida"] == json!(35.5))
            .times(1)
            .returning(|_| Ok(()));

        let service = TripService::new(documents, InMemoryBalanceStore::new(), publisher);
        let document = service.submit_trip(new_trip("c-1", "pix")).await.unwrap();

        assert_eq!(document["motorista"]["nome"], json!("Carla"));
        assert_eq!(service.get_trip("c-1").await.unwrap(), Some(document));
    }

    #[tokio::test]
    async fn test_submit_trip_rejects_invalid_input() {
        let mut documents = MockTripDocumentStore::new();
        documents.expect_upsert().never();
        let mut publisher = MockTripPublisher::new();
        publisher.expect_publish_trip().never();

        let service = TripService::new(documents, MockBalanceStore::new(), publisher);

        let mut trip = new_trip("", "pix");
        let result = service.submit_trip(trip.clone()).await;
        assert!(matches!(result, Err(TripError::Validation(_))));

        trip.trip_id = "c-2".into();
        trip.fare = -3.0;
        let result = service.submit_trip(trip).await;
        assert!(matches!(result, Err(TripError::Validation(_))));
    }

    #[tokio::test]
    async fn test_submit_trip_propagates_publish_failure() {
        let mut documents = MockTripDocumentStore::new();
        documents.expect_upsert().times(1).returning(|_, _, _| Ok(()));
        let mut publisher = MockTripPublisher::new();
        publisher
            .expect_publish_trip()
            .returning(|_| Err(TripError::Publish("Broker connection error: refused".into())));

        let service = TripService::new(documents, MockBalanceStore::new(), publisher);
        let result = service.submit_trip(new_trip("c-3", "pix")).await;

        assert!(matches!(result, Err(TripError::Publish(_))));
    }

    #[tokio::test]
    async fn test_driver_balance_normalizes_name() {
        let mut balances = MockBalanceStore::new();
        balances
            .expect_get_balance()
            .withf(|key| key.storage_key() == "balance:carla")
            .returning(|_| Ok(71.0));

        let service = TripService::new(
            MockTripDocumentStore::new(),
            balances,
            MockTripPublisher::new(),
        );
        let balance = service.driver_balance("Carla").await.unwrap();

        assert_eq!(balance.driver, "carla");
        assert_eq!(balance.balance, 71.0);
    }

    #[tokio::test]
    async fn test_driver_balance_defaults_to_zero() {
        let service = TripService::new(
            InMemoryTripStore::new(),
            InMemoryBalanceStore::new(),
            MockTripPublisher::new(),
        );

        let balance = service.driver_balance("nobody").await.unwrap();
        assert_eq!(balance.balance, 0.0);
    }

    #[tokio::test]
    async fn test_driver_balance_rejects_empty_name() {
        let service = TripService::new(
            MockTripDocumentStore::new(),
            MockBalanceStore::new(),
            MockTripPublisher::new(),
        );

        let result = service.driver_balance("  ").await;
        assert!(matches!(result, Err(TripError::Validation(_))));
    }

    #[tokio::test]
    async fn test_trips_by_payment_method() {
        let mut publisher = MockTripPublisher::new();
        publisher.expect_publish_trip().returning(|_| Ok(()));
        let service = TripService::new(
            InMemoryTripStore::new(),
            InMemoryBalanceStore::new(),
            publisher,
        );

        service.submit_trip(new_trip("c-1", "pix")).await.unwrap();
        service.submit_trip(new_trip("c-2", "cartao")).await.unwrap();
        service.submit_trip(new_trip("c-3", "pix")).await.unwrap();

        let pix = service.trips_by_payment_method("pix").await.unwrap();
        assert_eq!(pix.len(), 2);
        assert!(pix.iter().all(|trip| trip["forma_pagamento"] == json!("pix")));
        assert_eq!(service.list_trips().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_list_trips_uses_limit() {
        let mut documents = MockTripDocumentStore::new();
        documents
            .expect_list()
            .withf(|limit| *limit == LIST_LIMIT)
            .returning(|_| Ok(vec![]));

        let service = TripService::new(documents, MockBalanceStore::new(), MockTripPublisher::new());
        assert!(service.list_trips().await.unwrap().is_empty());
    }
}
