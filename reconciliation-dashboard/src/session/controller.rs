//! Session controller: drives one reconciliation attempt from validation
//! through result retrieval.
//!
//! Not re-entrant. The `&mut DashboardState` parameter is the guard: a second
//! run cannot start while the first still holds the state.

use super::error::SessionError;
use super::progress::{self, Progress, COMPLETION_STAGE};
use super::{SessionEvent, SessionPhase};
use crate::config::SessionSettings;
use crate::gateway::{Gateway, GatewayError, ReconcileRequest, ReconcileResult};
use crate::models::{MatchRecord, ReconcileParams, ReconciliationSession};
use crate::poller::UploadStatusPoller;
use crate::services::{
    record_cleanup_failure, record_reconciliation_run, record_result_fetch_attempts,
};
use crate::state::{ActionKey, DashboardState, StatusMessage};
use dashboard_core::retry::Delay;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub session_id: String,
    /// Count reported by the reconcile call itself.
    pub reconciliation_count: u64,
    /// Records actually retrieved afterwards.
    pub records: usize,
    pub fetch_attempts: u32,
}

pub struct SessionController {
    gateway: Arc<dyn Gateway>,
    poller: UploadStatusPoller,
    delay: Arc<dyn Delay>,
    settings: SessionSettings,
    events: Option<UnboundedSender<SessionEvent>>,
}

impl SessionController {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        poller: UploadStatusPoller,
        delay: Arc<dyn Delay>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            gateway,
            poller,
            delay,
            settings,
            events: None,
        }
    }

    /// Also push [`SessionEvent`]s to `sender` as the run advances.
    pub fn with_events(mut self, sender: UnboundedSender<SessionEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Run one reconciliation attempt.
    ///
    /// Always leaves `state` in a stable phase with exactly one message under
    /// [`ActionKey::Reconcile`] describing the outcome.
    pub async fn run_reconciliation(
        &self,
        state: &mut DashboardState,
        params: ReconcileParams,
    ) -> Result<SessionSummary, SessionError> {
        state.set_busy(ActionKey::Reconcile, true);
        let result = self.run_phases(state, params).await;
        state.set_busy(ActionKey::Reconcile, false);

        match &result {
            Ok(summary) => {
                tracing::info!(
                    session_id = %summary.session_id,
                    records = summary.records,
                    fetch_attempts = summary.fetch_attempts,
                    "Reconciliation results ready"
                );
                record_reconciliation_run(SessionPhase::ResultsReady.as_str());
                match self.gateway.stats().await {
                    Ok(stats) => state.set_stats(stats),
                    Err(e) => tracing::debug!(error = %e, "Stats refresh after run failed"),
                }
                state.set_message(
                    ActionKey::Reconcile,
                    StatusMessage::success(format!(
                        "Reconciliation completed! Loaded {} matches.",
                        summary.records
                    )),
                );
            }
            Err(e) => {
                tracing::warn!(outcome = e.outcome(), error = %e, "Reconciliation run did not produce results");
                record_reconciliation_run(e.outcome());
                state.set_message(ActionKey::Reconcile, StatusMessage::error(e.user_message()));
            }
        }
        result
    }

    async fn run_phases(
        &self,
        state: &mut DashboardState,
        params: ReconcileParams,
    ) -> Result<SessionSummary, SessionError> {
        self.transition(state, SessionPhase::Validating);

        if let Some(field) = params.zero_field() {
            self.transition(state, SessionPhase::FailedPrecondition);
            return Err(SessionError::InvalidParams { field });
        }

        if params.upload_batch_only {
            self.poller.refresh(state).await;
            let missing = state.upload_status().missing_datasets();
            if !missing.is_empty() {
                self.transition(state, SessionPhase::FailedPrecondition);
                return Err(SessionError::PreconditionFailure { missing });
            }

            self.transition(state, SessionPhase::Clearing);
            self.clear_previous_results(state).await;
        }

        let session = ReconciliationSession::start(params);
        tracing::info!(
            session_id = %session.session_id,
            limit = params.limit,
            days_back = params.days_back,
            latest_only = params.latest_only,
            upload_batch_only = params.upload_batch_only,
            "Starting reconciliation"
        );
        state.begin_session(session.clone());
        self.transition(state, SessionPhase::Running);
        state.set_message(
            ActionKey::Reconcile,
            StatusMessage::info("Reconciliation started..."),
        );

        let request = ReconcileRequest {
            limit: params.limit,
            days_back: params.days_back,
            latest_only: params.latest_only,
            upload_batch_only: params.upload_batch_only,
            session_id: session.session_id.clone(),
        };

        let reconciled = match self.reconcile_with_progress(state, &request).await {
            Ok(result) => result,
            Err(e) => {
                state.set_progress(None);
                self.transition(state, SessionPhase::FailedRemote);
                return Err(e.into());
            }
        };

        self.report_progress(state, Progress::from(&COMPLETION_STAGE));
        self.transition(state, SessionPhase::AwaitingResults);
        state.set_message(
            ActionKey::Reconcile,
            StatusMessage::info(format!(
                "Reconciliation completed! Found {} matches. Loading results...",
                reconciled.reconciliation_count
            )),
        );

        match self.await_results(&session).await {
            Ok((records, attempts)) => {
                let count = records.len();
                state.replace_records(records);
                self.transition(state, SessionPhase::ResultsReady);
                state.request_focus();
                self.emit(SessionEvent::FocusResults);
                Ok(SessionSummary {
                    session_id: session.session_id,
                    reconciliation_count: reconciled.reconciliation_count,
                    records: count,
                    fetch_attempts: attempts,
                })
            }
            Err(e) => {
                state.replace_records(Vec::new());
                self.transition(state, SessionPhase::NoResults);
                Err(e)
            }
        }
    }

    /// Best-effort delete of the previous result set. Never fails the run.
    async fn clear_previous_results(&self, state: &mut DashboardState) {
        let previous = state.clear_records();
        self.emit(SessionEvent::ResultsCleared { previous });

        if let Err(e) = self.gateway.delete_reconciliation_results().await {
            record_cleanup_failure(&e);
            tracing::warn!(error = %e, "Could not clear previous results, continuing");
        }
    }

    /// Race the reconcile call against the decorative progress ticker. The
    /// call always wins; dropping the ticker stops it.
    async fn reconcile_with_progress(
        &self,
        state: &mut DashboardState,
        request: &ReconcileRequest,
    ) -> Result<ReconcileResult, GatewayError> {
        let events = self.events.as_ref();
        let ticker = progress::simulate(
            self.delay.as_ref(),
            self.settings.progress_interval(),
            |stage| {
                let progress = Progress::from(stage);
                state.set_progress(Some(progress.clone()));
                if let Some(tx) = events {
                    let _ = tx.send(SessionEvent::Progress(progress));
                }
            },
        );

        tokio::select! {
            biased;
            result = self.gateway.reconcile(request) => result,
            never = ticker => match never {},
        }
    }

    /// Fetch results until a non-empty set arrives or attempts run out.
    ///
    /// Attempt 1 waits the settle delay; attempt `k > 1` waits `k * step`.
    async fn await_results(
        &self,
        session: &ReconciliationSession,
    ) -> Result<(Vec<MatchRecord>, u32), SessionError> {
        let attempts = self.settings.result_attempts;
        let backoff = self.settings.result_backoff();
        let mut last_error = None;

        for attempt in 1..=attempts {
            let wait = if attempt == 1 {
                self.settings.settle_delay()
            } else {
                backoff.delay_for(attempt)
            };
            self.delay.sleep(wait).await;

            match self
                .gateway
                .reconciliation_results(self.settings.results_limit)
                .await
            {
                Ok(records) => {
                    let records = self.correlate(records, &session.session_id);
                    if !records.is_empty() {
                        record_result_fetch_attempts(attempt);
                        return Ok((records, attempt));
                    }
                    tracing::debug!(attempt, attempts, "No results visible yet");
                }
                Err(e) => {
                    tracing::warn!(attempt, attempts, error = %e, "Result fetch failed");
                    last_error = Some(e);
                }
            }
        }

        record_result_fetch_attempts(attempts);
        Err(SessionError::EmptyResultTimeout {
            attempts,
            last_error,
        })
    }

    /// Drop records tagged with another session. Untagged records pass.
    fn correlate(&self, records: Vec<MatchRecord>, session_id: &str) -> Vec<MatchRecord> {
        if !self.settings.enforce_session_id {
            return records;
        }
        let total = records.len();
        let kept: Vec<MatchRecord> = records
            .into_iter()
            .filter(|r| r.session_id.as_deref().map_or(true, |id| id == session_id))
            .collect();
        if kept.len() < total {
            tracing::info!(
                dropped = total - kept.len(),
                "Ignored records belonging to another session"
            );
        }
        kept
    }

    fn transition(&self, state: &mut DashboardState, phase: SessionPhase) {
        tracing::debug!(from = %state.phase(), to = %phase, "Session phase change");
        state.set_phase(phase);
        self.emit(SessionEvent::PhaseChanged(phase));
    }

    fn report_progress(&self, state: &mut DashboardState, progress: Progress) {
        state.set_progress(Some(progress.clone()));
        self.emit(SessionEvent::Progress(progress));
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(tx) = &self.events {
            // A closed receiver just means nobody is watching.
            let _ = tx.send(event);
        }
    }
}
