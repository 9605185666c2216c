//! Common test utilities for dashboard integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use dashboard_core::retry::RecordingDelay;
use reconciliation_dashboard::config::{PollerSettings, SessionSettings};
use reconciliation_dashboard::gateway::{
    ExportFormat, FetchInvoicesRequest, FetchInvoicesResult, Gateway, GatewayError, HealthReport,
    ReconcileRequest, ReconcileResult, Stats, UploadOptions, UploadResult,
};
use reconciliation_dashboard::models::{records_from_value, MatchRecord, UploadStatus};
use reconciliation_dashboard::session::{SessionController, SessionEvent};
use reconciliation_dashboard::{DashboardActions, UploadStatusPoller};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Once};
use tokio::sync::mpsc::{self, UnboundedReceiver};

static TRACING: Once = Once::new();

/// Install a test subscriber once per binary. `RUST_LOG` controls verbosity.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

pub fn ready_status() -> UploadStatus {
    UploadStatus {
        has_invoices: true,
        has_bank_statements: true,
        invoice_count: 12,
        bank_count: 40,
    }
}

pub fn unreachable() -> GatewayError {
    GatewayError::Unreachable {
        target: "http://fake-gateway/api".to_string(),
        reason: "connection failed".to_string(),
    }
}

pub fn http_error(endpoint: &'static str, status: u16) -> GatewayError {
    GatewayError::Http {
        endpoint,
        status,
        message: "Internal Server Error".to_string(),
    }
}

/// Build a record the way the gateway would send it.
pub fn record(id: &str, confidence: f64, match_type: &str, session_id: Option<&str>) -> MatchRecord {
    let mut value = json!({
        "id": id,
        "invoice_number": format!("INV-{}", id),
        "invoice_amount": 1200.0,
        "bank_amount": 1200.0,
        "match_confidence": confidence,
        "match_type": match_type,
        "status": "matched",
    });
    if let Some(session_id) = session_id {
        value["session_id"] = json!(session_id);
    }
    serde_json::from_value(value).expect("test record must deserialize")
}

/// Decode a raw results payload the same way the HTTP gateway does.
pub fn raw_records(payload: serde_json::Value) -> Vec<MatchRecord> {
    records_from_value(payload)
}

/// Scripted in-memory gateway.
///
/// Queued responses are consumed in order; once a queue runs dry the
/// fallback answer is used. Every call is appended to [`FakeGateway::calls`].
pub struct FakeGateway {
    upload_statuses: Mutex<VecDeque<Result<UploadStatus, GatewayError>>>,
    upload_status_fallback: Mutex<Result<UploadStatus, GatewayError>>,
    results: Mutex<VecDeque<Result<Vec<MatchRecord>, GatewayError>>>,
    reconcile_result: Mutex<Result<ReconcileResult, GatewayError>>,
    delete_result: Mutex<Result<(), GatewayError>>,
    fetch_result: Mutex<Result<FetchInvoicesResult, GatewayError>>,
    upload_result: Mutex<Result<UploadResult, GatewayError>>,
    export_result: Mutex<Result<Vec<u8>, GatewayError>>,
    reconcile_yields: Mutex<usize>,
    calls: Mutex<Vec<&'static str>>,
    reconcile_requests: Mutex<Vec<ReconcileRequest>>,
    fetch_requests: Mutex<Vec<FetchInvoicesRequest>>,
    uploads: Mutex<Vec<(String, usize, UploadOptions)>>,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self {
            upload_statuses: Mutex::new(VecDeque::new()),
            upload_status_fallback: Mutex::new(Ok(ready_status())),
            results: Mutex::new(VecDeque::new()),
            reconcile_result: Mutex::new(Ok(ReconcileResult {
                reconciliation_count: 3,
            })),
            delete_result: Mutex::new(Ok(())),
            fetch_result: Mutex::new(Ok(FetchInvoicesResult { fetched_count: 12 })),
            upload_result: Mutex::new(Ok(UploadResult { processed_rows: 40 })),
            export_result: Mutex::new(Ok(b"id,confidence\n1,0.97\n".to_vec())),
            reconcile_yields: Mutex::new(0),
            calls: Mutex::new(Vec::new()),
            reconcile_requests: Mutex::new(Vec::new()),
            fetch_requests: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
        }
    }
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_upload_status(&self, status: Result<UploadStatus, GatewayError>) -> &Self {
        self.upload_statuses.lock().unwrap().push_back(status);
        self
    }

    pub fn set_upload_status_fallback(&self, status: Result<UploadStatus, GatewayError>) -> &Self {
        *self.upload_status_fallback.lock().unwrap() = status;
        self
    }

    pub fn push_results(&self, results: Result<Vec<MatchRecord>, GatewayError>) -> &Self {
        self.results.lock().unwrap().push_back(results);
        self
    }

    pub fn set_reconcile_result(&self, result: Result<ReconcileResult, GatewayError>) -> &Self {
        *self.reconcile_result.lock().unwrap() = result;
        self
    }

    pub fn set_delete_result(&self, result: Result<(), GatewayError>) -> &Self {
        *self.delete_result.lock().unwrap() = result;
        self
    }

    pub fn set_fetch_result(&self, result: Result<FetchInvoicesResult, GatewayError>) -> &Self {
        *self.fetch_result.lock().unwrap() = result;
        self
    }

    pub fn set_upload_result(&self, result: Result<UploadResult, GatewayError>) -> &Self {
        *self.upload_result.lock().unwrap() = result;
        self
    }

    pub fn set_export_result(&self, result: Result<Vec<u8>, GatewayError>) -> &Self {
        *self.export_result.lock().unwrap() = result;
        self
    }

    /// Make `reconcile` yield to the scheduler this many times before
    /// answering, so a concurrent progress ticker gets to run.
    pub fn set_reconcile_yields(&self, yields: usize) -> &Self {
        *self.reconcile_yields.lock().unwrap() = yields;
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| **c == call).count()
    }

    pub fn reconcile_requests(&self) -> Vec<ReconcileRequest> {
        self.reconcile_requests.lock().unwrap().clone()
    }

    pub fn fetch_requests(&self) -> Vec<FetchInvoicesRequest> {
        self.fetch_requests.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<(String, usize, UploadOptions)> {
        self.uploads.lock().unwrap().clone()
    }

    fn log(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn health(&self) -> Result<HealthReport, GatewayError> {
        self.log("health");
        Ok(serde_json::from_value(json!({
            "status": "degraded",
            "services": {
                "bigquery": { "success": true, "message": "ok" },
                "matcher": { "success": false, "message": "timeout" }
            }
        }))
        .unwrap())
    }

    async fn stats(&self) -> Result<Stats, GatewayError> {
        self.log("stats");
        Ok(Stats {
            total_reconciliations: 7,
            matched: 5,
            pending: 2,
            avg_confidence: 0.88,
        })
    }

    async fn upload_status(&self) -> Result<UploadStatus, GatewayError> {
        self.log("upload_status");
        let queued = self.upload_statuses.lock().unwrap().pop_front();
        match queued {
            Some(status) => status,
            None => self.upload_status_fallback.lock().unwrap().clone(),
        }
    }

    async fn fetch_invoices(
        &self,
        request: &FetchInvoicesRequest,
    ) -> Result<FetchInvoicesResult, GatewayError> {
        self.log("fetch_invoices");
        self.fetch_requests.lock().unwrap().push(request.clone());
        self.fetch_result.lock().unwrap().clone()
    }

    async fn upload_bank_statement(
        &self,
        file_name: &str,
        contents: Vec<u8>,
        options: UploadOptions,
    ) -> Result<UploadResult, GatewayError> {
        self.log("upload_bank_statement");
        self.uploads
            .lock()
            .unwrap()
            .push((file_name.to_string(), contents.len(), options));
        self.upload_result.lock().unwrap().clone()
    }

    async fn reconcile(&self, request: &ReconcileRequest) -> Result<ReconcileResult, GatewayError> {
        self.log("reconcile");
        self.reconcile_requests.lock().unwrap().push(request.clone());
        let yields = *self.reconcile_yields.lock().unwrap();
        for _ in 0..yields {
            tokio::task::yield_now().await;
        }
        self.reconcile_result.lock().unwrap().clone()
    }

    async fn reconciliation_results(&self, _limit: u32) -> Result<Vec<MatchRecord>, GatewayError> {
        self.log("reconciliation_results");
        let queued = self.results.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn delete_reconciliation_results(&self) -> Result<(), GatewayError> {
        self.log("delete_reconciliation_results");
        self.delete_result.lock().unwrap().clone()
    }

    async fn export(&self, _format: ExportFormat) -> Result<Vec<u8>, GatewayError> {
        self.log("export");
        self.export_result.lock().unwrap().clone()
    }

    fn target(&self) -> &str {
        "http://fake-gateway/api"
    }
}

/// Everything a test needs to drive the dashboard against a [`FakeGateway`].
pub struct Harness {
    pub gateway: Arc<FakeGateway>,
    pub delay: RecordingDelay,
    pub poller: UploadStatusPoller,
}

impl Harness {
    pub fn new(gateway: FakeGateway) -> Self {
        init_tracing();
        let gateway = Arc::new(gateway);
        let delay = RecordingDelay::new();
        let poller = UploadStatusPoller::new(
            gateway.clone(),
            Arc::new(delay.clone()),
            PollerSettings::default(),
        );
        Self {
            gateway,
            delay,
            poller,
        }
    }

    pub fn controller(&self) -> SessionController {
        self.controller_with(SessionSettings::default())
    }

    pub fn controller_with(&self, settings: SessionSettings) -> SessionController {
        SessionController::new(
            self.gateway.clone(),
            self.poller.clone(),
            Arc::new(self.delay.clone()),
            settings,
        )
    }

    pub fn controller_with_events(&self) -> (SessionController, UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (self.controller().with_events(tx), rx)
    }

    pub fn actions(&self) -> DashboardActions {
        DashboardActions::new(
            self.gateway.clone(),
            self.poller.clone(),
            &SessionSettings::default(),
        )
    }
}

/// Drain whatever events are already buffered.
pub fn drain(rx: &mut UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
