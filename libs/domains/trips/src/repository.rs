use async_trait::async_trait;
use serde_json::Value;

use crate::error::TripResult;
use crate::models::{DriverKey, TripDocument};

/// Counter store for driver balances
///
/// Implementations must be safe to call concurrently; every operation is a
/// single atomic store command with no client-side locking.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BalanceStore: Send + Sync {
    /// Current balance, 0.0 when the driver has none yet
    async fn get_balance(&self, driver: &DriverKey) -> TripResult<f64>;

    /// Atomically add `delta` and return the new total
    async fn increment_balance(&self, driver: &DriverKey, delta: f64) -> TripResult<f64>;
}

/// Document store for trip documents
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TripDocumentStore: Send + Sync {
    /// Insert or merge `document` into the record whose `match_key` equals `match_value`
    async fn upsert(
        &self,
        match_key: &str,
        match_value: &Value,
        document: &TripDocument,
    ) -> TripResult<()>;

    /// Get a trip by `id_corrida`
    async fn find(&self, trip_id: &Value) -> TripResult<Option<TripDocument>>;

    /// List up to `limit` trips
    async fn list(&self, limit: i64) -> TripResult<Vec<TripDocument>>;

    /// List up to `limit` trips whose `field` equals `value`
    async fn list_by_field(
        &self,
        field: &str,
        value: &Value,
        limit: i64,
    ) -> TripResult<Vec<TripDocument>>;
}
