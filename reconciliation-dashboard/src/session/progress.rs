//! Simulated progress shown while the reconcile call is in flight.
//!
//! Purely decorative: the real call does not report progress. The ticker
//! stops at the last stage and waits there until the caller drops it.

use dashboard_core::retry::Delay;
use std::convert::Infallible;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressStage {
    pub percent: u8,
    pub label: &'static str,
}

pub const PROGRESS_STAGES: [ProgressStage; 8] = [
    ProgressStage { percent: 10, label: "Initializing reconciliation engine" },
    ProgressStage { percent: 20, label: "Loading invoices" },
    ProgressStage { percent: 35, label: "Loading bank transactions" },
    ProgressStage { percent: 45, label: "Analyzing transaction patterns" },
    ProgressStage { percent: 60, label: "Matching invoices to transactions" },
    ProgressStage { percent: 75, label: "Scoring match confidence" },
    ProgressStage { percent: 85, label: "Validating matches" },
    ProgressStage { percent: 95, label: "Finalizing results" },
];

pub const COMPLETION_STAGE: ProgressStage = ProgressStage {
    percent: 100,
    label: "Reconciliation complete",
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub percent: u8,
    pub stage: String,
}

impl From<&ProgressStage> for Progress {
    fn from(stage: &ProgressStage) -> Self {
        Self {
            percent: stage.percent,
            stage: stage.label.to_string(),
        }
    }
}

/// Walk the stages one `interval` apart, calling `on_tick` for each, then park.
///
/// Never returns; race it against the real work and drop it when that work
/// finishes.
pub async fn simulate<F>(delay: &dyn Delay, interval: Duration, mut on_tick: F) -> Infallible
where
    F: FnMut(&ProgressStage) + Send,
{
    for stage in PROGRESS_STAGES.iter() {
        delay.sleep(interval).await;
        on_tick(stage);
    }
    std::future::pending::<Infallible>().await
}
