//! Reconciliation Dashboard - client-side orchestration for the invoice and
//! bank statement reconciliation gateway.

pub mod actions;
pub mod aggregate;
pub mod config;
pub mod gateway;
pub mod models;
pub mod poller;
pub mod services;
pub mod session;
pub mod state;

pub use actions::DashboardActions;
pub use config::DashboardConfig;
pub use poller::UploadStatusPoller;
pub use session::{SessionController, SessionError, SessionEvent, SessionPhase};
pub use state::{ActionKey, DashboardState, StatusMessage};
