//! Reconciliation session orchestration.

pub mod controller;
pub mod error;
pub mod progress;

pub use controller::{SessionController, SessionSummary};
pub use error::SessionError;
pub use progress::{Progress, ProgressStage, COMPLETION_STAGE, PROGRESS_STAGES};

use std::fmt;

/// Where the controller is in one reconciliation attempt.
///
/// ```text
/// Idle -> Validating -> (FailedPrecondition | Clearing) -> Running
///      -> (FailedRemote | AwaitingResults) -> (NoResults | ResultsReady)
/// ```
/// `Clearing` is skipped when the run is not restricted to the upload batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    #[default]
    Idle,
    Validating,
    FailedPrecondition,
    Clearing,
    Running,
    FailedRemote,
    AwaitingResults,
    NoResults,
    ResultsReady,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::FailedPrecondition => "failed_precondition",
            Self::Clearing => "clearing",
            Self::Running => "running",
            Self::FailedRemote => "failed_remote",
            Self::AwaitingResults => "awaiting_results",
            Self::NoResults => "no_results",
            Self::ResultsReady => "results_ready",
        }
    }

    /// True for phases a run can end in.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::FailedPrecondition | Self::FailedRemote | Self::NoResults | Self::ResultsReady
        )
    }

    /// True when no run is in flight.
    pub fn is_stable(&self) -> bool {
        *self == Self::Idle || self.is_terminal()
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pushed to the presentation layer as a run advances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    PhaseChanged(SessionPhase),
    Progress(Progress),
    /// The previous record set was dropped before a batch-only run.
    ResultsCleared { previous: usize },
    /// New results are in; bring them into view.
    FocusResults,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_idle_and_terminal_phases_are_stable() {
        let in_flight = [
            SessionPhase::Validating,
            SessionPhase::Clearing,
            SessionPhase::Running,
            SessionPhase::AwaitingResults,
        ];
        assert!(in_flight.iter().all(|p| !p.is_stable()));
        assert!(SessionPhase::Idle.is_stable());
        assert!(SessionPhase::NoResults.is_stable());
        assert!(!SessionPhase::Idle.is_terminal());
    }
}
