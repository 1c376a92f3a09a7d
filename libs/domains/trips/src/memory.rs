//! In-memory stores for exercising the processor and service.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use crate::error::TripResult;
use crate::models::{DriverKey, TRIP_ID_FIELD, TripDocument};
use crate::repository::{BalanceStore, TripDocumentStore};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
pub struct InMemoryBalanceStore {
    counters: Mutex<HashMap<String, f64>>,
}

impl InMemoryBalanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: &str, value: f64) {
        lock(&self.counters).insert(key.to_string(), value);
    }

    pub fn value(&self, key: &str) -> Option<f64> {
        lock(&self.counters).get(key).copied()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.counters).is_empty()
    }
}

#[async_trait]
impl BalanceStore for InMemoryBalanceStore {
    async fn get_balance(&self, driver: &DriverKey) -> TripResult<f64> {
        Ok(self.value(&driver.storage_key()).unwrap_or(0.0))
    }

    async fn increment_balance(&self, driver: &DriverKey, delta: f64) -> TripResult<f64> {
        let mut counters = lock(&self.counters);
        let total = counters.entry(driver.storage_key()).or_insert(0.0);
        *total += delta;
        Ok(*total)
    }
}

/// Documents keyed by the JSON text of their match value
#[derive(Debug, Default)]
pub struct InMemoryTripStore {
    documents: Mutex<BTreeMap<String, TripDocument>>,
}

impl InMemoryTripStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, trip_id: &Value) -> Option<TripDocument> {
        lock(&self.documents).get(&trip_id.to_string()).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.documents).len()
    }

    pub fn snapshot(&self) -> BTreeMap<String, TripDocument> {
        lock(&self.documents).clone()
    }
}

#[async_trait]
impl TripDocumentStore for InMemoryTripStore {
    async fn upsert(
        &self,
        match_key: &str,
        match_value: &Value,
        document: &TripDocument,
    ) -> TripResult<()> {
        let mut documents = lock(&self.documents);
        let stored = documents.entry(match_value.to_string()).or_insert_with(|| {
            let mut fresh = TripDocument::new();
            fresh.insert(match_key.to_string(), match_value.clone());
            fresh
        });
        // $set semantics: top-level fields replaced, others kept
        for (field, value) in document {
            stored.insert(field.clone(), value.clone());
        }
        Ok(())
    }

    async fn find(&self, trip_id: &Value) -> TripResult<Option<TripDocument>> {
        Ok(self.get(trip_id))
    }

    async fn list(&self, limit: i64) -> TripResult<Vec<TripDocument>> {
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(lock(&self.documents).values().take(limit).cloned().collect())
    }

    async fn list_by_field(
        &self,
        field: &str,
        value: &Value,
        limit: i64,
    ) -> TripResult<Vec<TripDocument>> {
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(lock(&self.documents)
            .values()
            .filter(|doc| doc.get(field) == Some(value))
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_upsert_merges_top_level_fields() {
        let store = InMemoryTripStore::new();
        let Value::Object(first) = json!({"id_corrida": "c-1", "valor_corrida": 10, "origem": "A"}) else {
            unreachable!()
        };
        let Value::Object(second) = json!({"id_corrida": "c-1", "valor_corrida": 12}) else {
            unreachable!()
        };

        store.upsert(TRIP_ID_FIELD, &json!("c-1"), &first).await.unwrap();
        store.upsert(TRIP_ID_FIELD, &json!("c-1"), &second).await.unwrap();

        let stored = store.find(&json!("c-1")).await.unwrap().unwrap();
        assert_eq!(stored["valor_corrida"], json!(12));
        assert_eq!(stored["origem"], json!("A"));
        assert_eq!(store.len(), 1);
    }
}
