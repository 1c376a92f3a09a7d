//! Settlement Worker - Entry Point
//!
//! Consumes "trip completed" events and settles driver balances.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    transflow_settlement_worker::run().await
}
