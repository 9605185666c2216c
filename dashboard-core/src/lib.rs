//! dashboard-core: Shared infrastructure for the reconciliation dashboard.
pub mod config;
pub mod error;
pub mod observability;
pub mod retry;

pub use async_trait;
pub use reqwest;
pub use serde;
pub use serde_json;
pub use tokio;
pub use tracing;
