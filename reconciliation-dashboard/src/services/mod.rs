//! Services module for the reconciliation dashboard.

pub mod metrics;

pub use metrics::{
    get_metrics, init_metrics, record_cleanup_failure, record_gateway_request,
    record_reconciliation_run, record_result_fetch_attempts, record_status_poll_failure,
};
