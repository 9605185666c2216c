//! Remote gateway: the reconciliation backend's HTTP surface.
//!
//! The controller and poller only see the [`Gateway`] trait; [`HttpGateway`]
//! is the reqwest-backed implementation.

pub mod client;
pub mod error;
pub mod models;

use crate::models::{MatchRecord, UploadStatus};
use async_trait::async_trait;

pub use client::HttpGateway;
pub use error::GatewayError;
pub use models::{
    ExportFormat, FetchInvoicesRequest, FetchInvoicesResult, HealthReport, ReconcileRequest,
    ReconcileResult, ServiceStatus, Stats, UploadOptions, UploadResult,
};

pub const HEALTH: &str = "health";
pub const STATS: &str = "stats";
pub const UPLOAD_STATUS: &str = "upload-status";
pub const FETCH_INVOICES: &str = "fetch-invoices";
pub const UPLOAD_BANK_STATEMENT: &str = "upload-bank-statement";
pub const RECONCILE: &str = "reconcile";
pub const RECONCILIATION_RESULTS: &str = "reconciliation-results";
pub const EXPORT: &str = "export";

/// Operations the dashboard needs from the reconciliation backend.
///
/// Implementations must not assume read-after-write consistency: a result
/// written by `reconcile` may not be visible to the next `reconciliation_results`.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn health(&self) -> Result<HealthReport, GatewayError>;

    async fn stats(&self) -> Result<Stats, GatewayError>;

    /// Must defeat intermediate caches.
    async fn upload_status(&self) -> Result<UploadStatus, GatewayError>;

    async fn fetch_invoices(
        &self,
        request: &FetchInvoicesRequest,
    ) -> Result<FetchInvoicesResult, GatewayError>;

    async fn upload_bank_statement(
        &self,
        file_name: &str,
        contents: Vec<u8>,
        options: UploadOptions,
    ) -> Result<UploadResult, GatewayError>;

    async fn reconcile(&self, request: &ReconcileRequest) -> Result<ReconcileResult, GatewayError>;

    async fn reconciliation_results(&self, limit: u32) -> Result<Vec<MatchRecord>, GatewayError>;

    /// Best-effort; backends without delete support answer with an error.
    async fn delete_reconciliation_results(&self) -> Result<(), GatewayError>;

    async fn export(&self, format: ExportFormat) -> Result<Vec<u8>, GatewayError>;

    /// Human-readable target used in "unreachable" messages.
    fn target(&self) -> &str;
}
