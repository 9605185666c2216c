//! Failure taxonomy for gateway calls.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The gateway answered with a structured `success: false` body.
    #[error("{message}")]
    Application {
        endpoint: &'static str,
        message: String,
    },

    /// The gateway answered with a non-2xx status.
    #[error("HTTP {status} from {endpoint}: {message}")]
    Http {
        endpoint: &'static str,
        status: u16,
        message: String,
    },

    /// No response arrived at all.
    #[error("Cannot reach the reconciliation gateway at {target} ({reason}). Check that the backend is running and reachable.")]
    Unreachable { target: String, reason: String },

    /// The request could not be built locally.
    #[error("Could not build {endpoint} request: {reason}")]
    Request {
        endpoint: &'static str,
        reason: String,
    },

    /// A response arrived but its body did not have the expected shape.
    #[error("Unexpected response from {endpoint}: {reason}")]
    InvalidResponse {
        endpoint: &'static str,
        reason: String,
    },
}

impl GatewayError {
    /// Classify a transport-level failure from reqwest.
    pub fn from_reqwest(endpoint: &'static str, target: &str, err: reqwest::Error) -> Self {
        if err.is_builder() {
            return GatewayError::Request {
                endpoint,
                reason: err.to_string(),
            };
        }
        if let Some(status) = err.status() {
            return GatewayError::Http {
                endpoint,
                status: status.as_u16(),
                message: err.to_string(),
            };
        }
        if err.is_decode() {
            return GatewayError::InvalidResponse {
                endpoint,
                reason: err.to_string(),
            };
        }
        GatewayError::Unreachable {
            target: target.to_string(),
            reason: if err.is_timeout() {
                "request timed out".to_string()
            } else if err.is_connect() {
                "connection failed".to_string()
            } else {
                err.to_string()
            },
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            GatewayError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, GatewayError::Unreachable { .. })
    }

    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Application { .. } => "application",
            GatewayError::Http { .. } => "http",
            GatewayError::Unreachable { .. } => "unreachable",
            GatewayError::Request { .. } => "request",
            GatewayError::InvalidResponse { .. } => "invalid_response",
        }
    }
}
