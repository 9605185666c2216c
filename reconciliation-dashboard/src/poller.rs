//! Upload status poller.
//!
//! Asks the gateway which datasets exist. Never fails towards the caller:
//! after the retry budget is spent the state settles to "nothing uploaded".

use crate::config::PollerSettings;
use crate::gateway::Gateway;
use crate::models::UploadStatus;
use crate::services::record_status_poll_failure;
use crate::state::{ActionKey, DashboardState, StatusMessage};
use dashboard_core::retry::Delay;
use std::sync::Arc;

#[derive(Clone)]
pub struct UploadStatusPoller {
    gateway: Arc<dyn Gateway>,
    delay: Arc<dyn Delay>,
    settings: PollerSettings,
}

impl UploadStatusPoller {
    pub fn new(gateway: Arc<dyn Gateway>, delay: Arc<dyn Delay>, settings: PollerSettings) -> Self {
        Self {
            gateway,
            delay,
            settings,
        }
    }

    /// Query upload status, retrying with linear backoff from `retry_count`.
    ///
    /// A failure at retry `n` (while `n < max_retries`) waits `(n + 1) * step`
    /// before the next query.
    #[tracing::instrument(skip(self, state))]
    pub async fn check_status(&self, state: &mut DashboardState, retry_count: u32) -> UploadStatus {
        let mut retry_count = retry_count;
        loop {
            match self.gateway.upload_status().await {
                Ok(status) => {
                    tracing::debug!(
                        has_invoices = status.has_invoices,
                        has_bank_statements = status.has_bank_statements,
                        invoice_count = status.invoice_count,
                        bank_count = status.bank_count,
                        "Upload status refreshed"
                    );
                    state.set_upload_status(status);
                    state.clear_message(ActionKey::UploadStatus);
                    return status;
                }
                Err(e) => {
                    record_status_poll_failure(&e);

                    if retry_count >= self.settings.max_retries {
                        tracing::error!(
                            attempts = retry_count + 1,
                            error = %e,
                            "Upload status unavailable, assuming no uploaded data"
                        );
                        let status = UploadStatus::conservative();
                        state.set_upload_status(status);
                        state.set_message(
                            ActionKey::UploadStatus,
                            StatusMessage::error(format!(
                                "Could not determine upload status: {}",
                                e
                            )),
                        );
                        return status;
                    }

                    let backoff = self.settings.backoff().delay_for(retry_count + 1);
                    tracing::warn!(
                        attempt = retry_count + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Upload status check failed, retrying after backoff"
                    );
                    self.delay.sleep(backoff).await;
                    retry_count += 1;
                }
            }
        }
    }

    /// Single query without retries. Keeps the cached status on failure.
    pub async fn refresh(&self, state: &mut DashboardState) -> Option<UploadStatus> {
        match self.gateway.upload_status().await {
            Ok(status) => {
                state.set_upload_status(status);
                Some(status)
            }
            Err(e) => {
                record_status_poll_failure(&e);
                tracing::warn!(error = %e, "Upload status refresh failed, using cached status");
                None
            }
        }
    }

    /// Re-poll after an action that changed server-side data, giving the
    /// backend time to ingest first.
    pub async fn recheck_after_change(&self, state: &mut DashboardState) -> UploadStatus {
        self.delay.sleep(self.settings.refresh_delay()).await;
        self.check_status(state, 0).await
    }
}
