//! Redis connector and configuration
//!
//! The returned `ConnectionManager` reconnects transparently and is cheap to clone,
//! so one instance is built at startup and shared by every caller.

mod config;
mod connector;

pub use config::RedisConfig;
pub use connector::{connect, connect_from_config, connect_from_config_with_retry};

// Re-export redis types for convenience
pub use redis::aio::ConnectionManager;
pub use redis::{AsyncCommands, RedisResult};
