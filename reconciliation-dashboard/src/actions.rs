//! User-triggered dashboard actions other than the reconciliation run.
//!
//! Each action owns one [`ActionKey`]: it marks the key busy while running
//! and leaves exactly one message under it afterwards. Actions that change
//! how much data the backend holds finish with a delayed status re-poll.

use crate::config::SessionSettings;
use crate::gateway::{ExportFormat, FetchInvoicesRequest, Gateway, GatewayError, UploadOptions};
use crate::poller::UploadStatusPoller;
use crate::state::{ActionKey, DashboardState, StatusMessage};
use chrono::NaiveDate;
use std::path::Path;
use std::sync::Arc;

pub const DEFAULT_INVOICE_LIMIT: u32 = 1000;
pub const SUPPORTED_STATEMENT_EXTENSIONS: [&str; 4] = ["csv", "xlsx", "xls", "pdf"];

pub struct DashboardActions {
    gateway: Arc<dyn Gateway>,
    poller: UploadStatusPoller,
    results_limit: u32,
}

impl DashboardActions {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        poller: UploadStatusPoller,
        session: &SessionSettings,
    ) -> Self {
        Self {
            gateway,
            poller,
            results_limit: session.results_limit,
        }
    }

    pub async fn check_health(&self, state: &mut DashboardState) -> bool {
        state.set_busy(ActionKey::Health, true);
        let ok = match self.gateway.health().await {
            Ok(report) => {
                let unhealthy = report.unhealthy_services().join(", ");
                let message = if unhealthy.is_empty() {
                    StatusMessage::success("System health check completed successfully!")
                } else {
                    StatusMessage::info(format!(
                        "System status {}: degraded services: {}",
                        report.status, unhealthy
                    ))
                };
                state.set_health(report);
                state.set_message(ActionKey::Health, message);
                true
            }
            Err(e) => {
                state.set_message(
                    ActionKey::Health,
                    StatusMessage::error(format!("Health check failed: {}", e)),
                );
                false
            }
        };
        state.set_busy(ActionKey::Health, false);
        ok
    }

    /// Stats are optional on a fresh system, so failure only logs.
    pub async fn load_stats(&self, state: &mut DashboardState) {
        match self.gateway.stats().await {
            Ok(stats) => state.set_stats(stats),
            Err(e) => tracing::debug!(error = %e, "Stats not available"),
        }
    }

    pub async fn fetch_invoices(
        &self,
        state: &mut DashboardState,
        date_from: NaiveDate,
        date_to: NaiveDate,
        limit: Option<u32>,
    ) -> bool {
        if date_from > date_to {
            state.set_message(
                ActionKey::Fetch,
                StatusMessage::error(format!(
                    "Invalid date range: {} is after {}",
                    date_from, date_to
                )),
            );
            return false;
        }

        let request = FetchInvoicesRequest {
            date_from: date_from.format("%Y-%m-%d").to_string(),
            date_to: date_to.format("%Y-%m-%d").to_string(),
            limit: limit.filter(|l| *l > 0).unwrap_or(DEFAULT_INVOICE_LIMIT),
        };

        state.set_busy(ActionKey::Fetch, true);
        let result = self.gateway.fetch_invoices(&request).await;
        state.set_busy(ActionKey::Fetch, false);

        match result {
            Ok(fetched) => {
                state.set_message(
                    ActionKey::Fetch,
                    StatusMessage::success(format!(
                        "Successfully fetched {} invoices!",
                        fetched.fetched_count
                    )),
                );
                self.after_data_change(state).await;
                true
            }
            Err(e) => {
                let text = match &e {
                    GatewayError::Http { status: 500, .. } => {
                        "Backend processing issue detected while fetching invoices (HTTP 500). Invoice import may be incomplete.".to_string()
                    }
                    GatewayError::Application { message, .. } => {
                        format!("Failed to fetch invoices: {}", message)
                    }
                    other => format!("Error fetching invoices: {}", other),
                };
                state.set_message(ActionKey::Fetch, StatusMessage::error(text));
                false
            }
        }
    }

    pub async fn upload_bank_statement(
        &self,
        state: &mut DashboardState,
        path: &Path,
        options: UploadOptions,
    ) -> bool {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            state.set_message(
                ActionKey::Upload,
                StatusMessage::error("Please select a file first"),
            );
            return false;
        };

        if !is_supported_statement(path) {
            state.set_message(
                ActionKey::Upload,
                StatusMessage::error(format!(
                    "Unsupported file type for {}. Supported: .csv, .xlsx, .xls, .pdf",
                    file_name
                )),
            );
            return false;
        }

        let contents = match tokio::fs::read(path).await {
            Ok(contents) => contents,
            Err(e) => {
                state.set_message(
                    ActionKey::Upload,
                    StatusMessage::error(format!("Cannot read {}: {}", path.display(), e)),
                );
                return false;
            }
        };

        state.set_busy(ActionKey::Upload, true);
        let result = self
            .gateway
            .upload_bank_statement(file_name, contents, options)
            .await;
        state.set_busy(ActionKey::Upload, false);

        match result {
            Ok(uploaded) => {
                state.set_message(
                    ActionKey::Upload,
                    StatusMessage::success(format!(
                        "File processed successfully! {} transactions processed.",
                        uploaded.processed_rows
                    )),
                );
                self.after_data_change(state).await;
                true
            }
            Err(e) => {
                let text = match &e {
                    GatewayError::Http { status: 500, .. } => {
                        "Backend processing issue detected: the file was received but could not be ingested (HTTP 500).".to_string()
                    }
                    GatewayError::Application { message, .. } => {
                        format!("Upload failed: {}", message)
                    }
                    other => format!("Error uploading file: {}", other),
                };
                state.set_message(ActionKey::Upload, StatusMessage::error(text));
                false
            }
        }
    }

    /// Manual refresh of the result set. Replaces, never merges.
    pub async fn refresh_results(&self, state: &mut DashboardState) -> bool {
        state.set_busy(ActionKey::Results, true);
        let result = self.gateway.reconciliation_results(self.results_limit).await;
        state.set_busy(ActionKey::Results, false);

        match result {
            Ok(records) => {
                let count = records.len();
                state.replace_records(records);
                let message = if count == 0 {
                    StatusMessage::info("No reconciliation results available yet.")
                } else {
                    StatusMessage::success(format!("Loaded {} reconciliation results.", count))
                };
                state.set_message(ActionKey::Results, message);
                true
            }
            Err(e) => {
                state.set_message(
                    ActionKey::Results,
                    StatusMessage::error(format!("Could not load results: {}", e)),
                );
                false
            }
        }
    }

    /// Explicit delete requested by the user. Unlike the pre-run cleanup,
    /// failure here is reported.
    pub async fn clear_results(&self, state: &mut DashboardState) -> bool {
        state.set_busy(ActionKey::Clear, true);
        let result = self.gateway.delete_reconciliation_results().await;
        state.set_busy(ActionKey::Clear, false);

        match result {
            Ok(()) => {
                let previous = state.clear_records();
                state.set_message(
                    ActionKey::Clear,
                    StatusMessage::success(format!(
                        "Cleared previous reconciliation results ({} shown locally).",
                        previous
                    )),
                );
                self.after_data_change(state).await;
                true
            }
            Err(e) => {
                state.set_message(
                    ActionKey::Clear,
                    StatusMessage::error(format!("Could not clear results: {}", e)),
                );
                false
            }
        }
    }

    pub async fn export(
        &self,
        state: &mut DashboardState,
        format: ExportFormat,
        destination: &Path,
    ) -> bool {
        state.set_busy(ActionKey::Export, true);
        let result = self.gateway.export(format).await;
        state.set_busy(ActionKey::Export, false);

        let bytes = match result {
            Ok(bytes) => bytes,
            Err(e) => {
                state.set_message(
                    ActionKey::Export,
                    StatusMessage::error(format!("{} export failed: {}", format.as_str().to_uppercase(), e)),
                );
                return false;
            }
        };

        match tokio::fs::write(destination, &bytes).await {
            Ok(()) => {
                state.set_message(
                    ActionKey::Export,
                    StatusMessage::success(format!(
                        "{} export saved to {} ({} bytes).",
                        format.as_str().to_uppercase(),
                        destination.display(),
                        bytes.len()
                    )),
                );
                true
            }
            Err(e) => {
                state.set_message(
                    ActionKey::Export,
                    StatusMessage::error(format!(
                        "Cannot write {}: {}",
                        destination.display(),
                        e
                    )),
                );
                false
            }
        }
    }

    async fn after_data_change(&self, state: &mut DashboardState) {
        self.load_stats(state).await;
        self.poller.recheck_after_change(state).await;
    }
}

pub fn is_supported_statement(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_STATEMENT_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}
