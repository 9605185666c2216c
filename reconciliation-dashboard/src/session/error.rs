use crate::gateway::GatewayError;
use crate::models::Dataset;
use thiserror::Error;

/// Why a reconciliation run ended without results.
///
/// Every variant leaves the controller in a stable phase; none is fatal to
/// the dashboard.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Batch-only run requested but the gateway lacks a required dataset.
    #[error("Missing required data: no {} found. Upload the missing data before running an upload-batch reconciliation.", join_datasets(.missing))]
    PreconditionFailure { missing: Vec<Dataset> },

    #[error("Invalid reconciliation parameters: {field} must be greater than 0")]
    InvalidParams { field: &'static str },

    #[error(transparent)]
    Remote(#[from] GatewayError),

    /// Reconcile succeeded but no records became visible in time.
    #[error("Reconciliation finished but no results were returned after {attempts} attempts. Possible causes: results are still being written (refresh in a few seconds), the uploaded invoices and bank statements did not match, or the backend is slow to synchronize.{}", last_error_suffix(.last_error))]
    EmptyResultTimeout {
        attempts: u32,
        last_error: Option<GatewayError>,
    },
}

fn join_datasets(missing: &[Dataset]) -> String {
    missing
        .iter()
        .map(|d| d.as_str())
        .collect::<Vec<_>>()
        .join(" or ")
}

fn last_error_suffix(last_error: &Option<GatewayError>) -> String {
    match last_error {
        Some(e) => format!(" Last error: {}", e),
        None => String::new(),
    }
}

impl SessionError {
    /// Message shown to the user for this outcome.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Remote(GatewayError::Application { message, .. }) => {
                format!("Reconciliation failed: {}", message)
            }
            SessionError::Remote(GatewayError::Http {
                status, message, ..
            }) => format!("Reconciliation failed with HTTP {}: {}", status, message),
            SessionError::Remote(GatewayError::Request { reason, .. }) => {
                format!("Could not start reconciliation: {}", reason)
            }
            other => other.to_string(),
        }
    }

    /// Stable label for metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            SessionError::PreconditionFailure { .. } | SessionError::InvalidParams { .. } => {
                "failed_precondition"
            }
            SessionError::Remote(_) => "failed_remote",
            SessionError::EmptyResultTimeout { .. } => "no_results",
        }
    }
}
