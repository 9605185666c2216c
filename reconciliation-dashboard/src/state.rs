//! Single-owner dashboard state.
//!
//! Only the session controller, the upload status poller and the dashboard
//! actions write here; the presentation layer reads through the accessors.
//! Everything is passed as `&mut DashboardState`, so two overlapping runs
//! cannot borrow it at the same time.

use crate::aggregate::{aggregate, AggregateView};
use crate::gateway::{HealthReport, Stats};
use crate::models::{MatchRecord, ReconciliationSession, UploadStatus};
use crate::session::{Progress, SessionPhase};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Identifies the user action a status message or busy flag belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKey {
    Health,
    Stats,
    Fetch,
    Upload,
    Reconcile,
    Results,
    Clear,
    Export,
    UploadStatus,
}

impl ActionKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Health => "health",
            Self::Stats => "stats",
            Self::Fetch => "fetch",
            Self::Upload => "upload",
            Self::Reconcile => "reconcile",
            Self::Results => "results",
            Self::Clear => "clear",
            Self::Export => "export",
            Self::UploadStatus => "upload_status",
        }
    }
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub kind: MessageKind,
}

impl StatusMessage {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: MessageKind::Success,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: MessageKind::Error,
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: MessageKind::Info,
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == MessageKind::Error
    }
}

#[derive(Debug, Default)]
pub struct DashboardState {
    upload_status: UploadStatus,
    records: Vec<MatchRecord>,
    active_session: Option<ReconciliationSession>,
    phase: SessionPhase,
    progress: Option<Progress>,
    focus_results: bool,
    messages: HashMap<ActionKey, StatusMessage>,
    busy: HashSet<ActionKey>,
    health: Option<HealthReport>,
    stats: Option<Stats>,
}

impl DashboardState {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Read side
    // ------------------------------------------------------------------

    pub fn upload_status(&self) -> UploadStatus {
        self.upload_status
    }

    pub fn records(&self) -> &[MatchRecord] {
        &self.records
    }

    /// Derived view, recomputed from the current record set on every call.
    pub fn aggregate(&self) -> AggregateView {
        aggregate(&self.records)
    }

    pub fn active_session(&self) -> Option<&ReconciliationSession> {
        self.active_session.as_ref()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn progress(&self) -> Option<&Progress> {
        self.progress.as_ref()
    }

    /// Set once results arrive; the presentation layer scrolls to them and
    /// acknowledges with [`DashboardState::take_focus_request`].
    pub fn focus_requested(&self) -> bool {
        self.focus_results
    }

    pub fn take_focus_request(&mut self) -> bool {
        std::mem::take(&mut self.focus_results)
    }

    pub fn message(&self, key: ActionKey) -> Option<&StatusMessage> {
        self.messages.get(&key)
    }

    pub fn messages(&self) -> impl Iterator<Item = (ActionKey, &StatusMessage)> {
        self.messages.iter().map(|(k, m)| (*k, m))
    }

    pub fn is_busy(&self, key: ActionKey) -> bool {
        self.busy.contains(&key)
    }

    pub fn health(&self) -> Option<&HealthReport> {
        self.health.as_ref()
    }

    pub fn stats(&self) -> Option<&Stats> {
        self.stats.as_ref()
    }

    // ------------------------------------------------------------------
    // Write side
    // ------------------------------------------------------------------

    /// Replaces whatever message `key` had.
    pub(crate) fn set_message(&mut self, key: ActionKey, message: StatusMessage) {
        self.messages.insert(key, message);
    }

    pub(crate) fn clear_message(&mut self, key: ActionKey) {
        self.messages.remove(&key);
    }

    pub(crate) fn set_busy(&mut self, key: ActionKey, busy: bool) {
        if busy {
            self.busy.insert(key);
        } else {
            self.busy.remove(&key);
        }
    }

    pub(crate) fn set_upload_status(&mut self, status: UploadStatus) {
        self.upload_status = status;
    }

    /// Full replacement, never a merge.
    pub(crate) fn replace_records(&mut self, records: Vec<MatchRecord>) {
        self.records = records;
    }

    /// Drops the current record set and returns how many were dropped.
    pub(crate) fn clear_records(&mut self) -> usize {
        let previous = self.records.len();
        self.records.clear();
        self.focus_results = false;
        previous
    }

    pub(crate) fn begin_session(&mut self, session: ReconciliationSession) {
        self.active_session = Some(session);
        self.progress = None;
        self.focus_results = false;
    }

    pub(crate) fn set_phase(&mut self, phase: SessionPhase) {
        self.phase = phase;
    }

    pub(crate) fn set_progress(&mut self, progress: Option<Progress>) {
        self.progress = progress;
    }

    pub(crate) fn request_focus(&mut self) {
        self.focus_results = true;
    }

    pub(crate) fn set_health(&mut self, health: HealthReport) {
        self.health = Some(health);
    }

    pub(crate) fn set_stats(&mut self, stats: Stats) {
        self.stats = Some(stats);
    }
}
