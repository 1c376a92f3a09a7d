//! Redis implementation of BalanceStore

use async_trait::async_trait;
use database::redis::{AsyncCommands, ConnectionManager};
use tracing::instrument;

use crate::error::TripResult;
use crate::models::DriverKey;
use crate::repository::BalanceStore;

/// Driver balances stored as float counters under `balance:<driver>`
#[derive(Clone)]
pub struct RedisBalanceStore {
    conn: ConnectionManager,
}

impl RedisBalanceStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl BalanceStore for RedisBalanceStore {
    #[instrument(skip(self), fields(driver = %driver))]
    async fn get_balance(&self, driver: &DriverKey) -> TripResult<f64> {
        let mut conn = self.conn.clone();
        let balance: Option<f64> = conn.get(driver.storage_key()).await?;
        Ok(balance.unwrap_or(0.0))
    }

    #[instrument(skip(self), fields(driver = %driver))]
    async fn increment_balance(&self, driver: &DriverKey, delta: f64) -> TripResult<f64> {
        let mut conn = self.conn.clone();
        // INCRBYFLOAT for float deltas
        let total: f64 = conn.incr(driver.storage_key(), delta).await?;
        Ok(total)
    }
}
