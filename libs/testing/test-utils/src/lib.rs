//! Shared test utilities for domain testing
//!
//! This crate provides reusable test infrastructure for all domain crates:
//! - `TestRedis`: Redis container with automatic cleanup (feature: "redis")
//! - `TestMongo`: MongoDB container with automatic cleanup (feature: "mongo")
//! - `TestRabbit`: RabbitMQ container with automatic cleanup (feature: "rabbitmq")
//! - `TestDataBuilder`: Deterministic test data generation (always available)
//! - `assertions`: Custom assertion helpers (always available)
//!
//! Container-backed tests need Docker and are marked `#[ignore]`; run them with
//! `cargo test -- --ignored`.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { workspace = true, features = ["redis", "mongo"] }
//! ```
//!
//! ```rust,ignore
//! use test_utils::{TestDataBuilder, TestRedis};
//!
//! #[tokio::test]
//! #[ignore = "requires Docker"]
//! async fn my_redis_test() {
//!     let redis = TestRedis::new().await;
//!     let builder = TestDataBuilder::from_test_name("my_redis_test");
//!     let event = builder.trip_event(builder.trip_id("1"), &builder.driver_name("main"), 25.0);
//! }
//! ```

use serde_json::{Value, json};
use uuid::Uuid;

#[cfg(feature = "mongo")]
mod mongo;

#[cfg(feature = "rabbitmq")]
mod rabbitmq;

#[cfg(feature = "redis")]
mod redis;

#[cfg(feature = "mongo")]
pub use mongo::TestMongo;

#[cfg(feature = "rabbitmq")]
pub use rabbitmq::TestRabbit;

#[cfg(feature = "redis")]
pub use redis::TestRedis;

/// Builder for test data with deterministic randomization
///
/// This ensures tests are reproducible by using seeded random data.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    /// Create a new builder with a seed (for deterministic tests)
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_balance_accumulates");
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Deterministic UUID derived from the seed
    pub fn uuid(&self) -> Uuid {
        let bytes = self.seed.to_le_bytes();
        let mut uuid_bytes = [0u8; 16];
        uuid_bytes[..8].copy_from_slice(&bytes);
        uuid_bytes[8..16].copy_from_slice(&bytes);
        Uuid::from_bytes(uuid_bytes)
    }

    /// Trip id unique to this test, distinguished by `suffix`
    pub fn trip_id(&self, suffix: &str) -> String {
        format!("trip-{}-{}", self.seed, suffix)
    }

    /// Driver name unique to this test, so balances never collide across tests
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::new(7);
    /// assert_eq!(builder.driver_name("Ana"), "Driver-7-Ana");
    /// ```
    pub fn driver_name(&self, suffix: &str) -> String {
        format!("Driver-{}-{}", self.seed, suffix)
    }

    /// Trip-completed event in wire format
    pub fn trip_event(&self, trip_id: impl Into<String>, driver: &str, fare: f64) -> Value {
        json!({
            "id_corrida": trip_id.into(),
            "passageiro": { "nome": "Passenger", "telefone": "+55 11 90000-0000" },
            "motorista": { "nome": driver, "nota": 4.8 },
            "origem": "Centro",
            "destino": "Aeroporto",
            "valor_corrida": fare,
            "forma_pagamento": "pix"
        })
    }

    /// Generate a unique name for testing
    pub fn name(&self, prefix: &str, suffix: &str) -> String {
        format!("test-{}-{}-{}", prefix, self.seed, suffix)
    }
}

/// Test assertion helpers
pub mod assertions {
    /// Assert that two floats are equal within a small tolerance
    pub fn assert_close(actual: f64, expected: f64, context: &str) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "{}: expected {}, got {}",
            context,
            expected,
            actual
        );
    }

    /// Assert that an optional value is Some
    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_builder_deterministic() {
        let builder1 = TestDataBuilder::new(42);
        let builder2 = TestDataBuilder::new(42);

        assert_eq!(builder1.uuid(), builder2.uuid());
        assert_eq!(builder1.trip_id("a"), builder2.trip_id("a"));
    }

    #[test]
    fn test_data_builder_different_names() {
        let builder1 = TestDataBuilder::from_test_name("test1");
        let builder2 = TestDataBuilder::from_test_name("test2");

        assert_ne!(builder1.driver_name("x"), builder2.driver_name("x"));
    }

    #[test]
    fn test_trip_event_shape() {
        let builder = TestDataBuilder::new(1);
        let event = builder.trip_event(builder.trip_id("1"), "Ana", 30.5);

        assert_eq!(event["id_corrida"], "trip-1-1");
        assert_eq!(event["motorista"]["nome"], "Ana");
        assert_eq!(event["valor_corrida"], 30.5);
    }

    #[test]
    fn test_assert_close() {
        assertions::assert_close(0.1 + 0.2, 0.3, "sum");
        assert_eq!(assertions::assert_some(Some(3), "value"), 3);
    }
}
