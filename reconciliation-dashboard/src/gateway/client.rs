//! reqwest-backed gateway client.

use super::error::GatewayError;
use super::models::{
    Envelope, ExportFormat, FetchInvoicesRequest, FetchInvoicesResult, HealthReport,
    ReconcileRequest, ReconcileResult, Stats, UploadOptions, UploadResult,
};
use super::{
    EXPORT, FETCH_INVOICES, Gateway, HEALTH, RECONCILE, RECONCILIATION_RESULTS, STATS,
    UPLOAD_BANK_STATEMENT, UPLOAD_STATUS,
};
use crate::config::GatewaySettings;
use crate::models::{records_from_value, MatchRecord, UploadStatus};
use crate::services::metrics::record_gateway_request;
use async_trait::async_trait;
use chrono::Utc;
use dashboard_core::observability::{TracedClientExt, TracedRequest};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Instant;

/// HTTP client for the reconciliation gateway.
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    settings: GatewaySettings,
}

impl HttpGateway {
    pub fn new(settings: GatewaySettings) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .connect_timeout(settings.connect_timeout())
            .build()
            .map_err(|e| GatewayError::Request {
                endpoint: "client",
                reason: e.to_string(),
            })?;

        Ok(Self { client, settings })
    }

    pub fn base_url(&self) -> &str {
        self.settings.base_url.trim_end_matches('/')
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url(), path)
    }

    /// Direct download link, for handing to a browser.
    pub fn export_url(&self, format: ExportFormat) -> String {
        self.url(&format!("{}/{}", EXPORT, format))
    }

    async fn send(
        &self,
        endpoint: &'static str,
        request: TracedRequest,
    ) -> Result<Response, GatewayError> {
        request
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| GatewayError::from_reqwest(endpoint, self.base_url(), e))
    }

    /// Send, check status, and read the body as text.
    async fn send_for_body(
        &self,
        endpoint: &'static str,
        request: TracedRequest,
    ) -> Result<String, GatewayError> {
        let started = Instant::now();
        let result = async {
            let response = self.send(endpoint, request).await?;
            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| GatewayError::from_reqwest(endpoint, self.base_url(), e))?;

            tracing::debug!(endpoint, status = %status, body_len = body.len(), "Gateway response");

            if !status.is_success() {
                return Err(GatewayError::Http {
                    endpoint,
                    status: status.as_u16(),
                    message: error_message_from_body(&body).unwrap_or_else(|| {
                        status
                            .canonical_reason()
                            .unwrap_or("request failed")
                            .to_string()
                    }),
                });
            }
            Ok(body)
        }
        .await;

        record_gateway_request(endpoint, &result, started.elapsed().as_secs_f64());
        result
    }

    async fn envelope<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        request: TracedRequest,
    ) -> Result<Envelope<T>, GatewayError> {
        let body = self.send_for_body(endpoint, request).await?;
        let envelope: Envelope<T> =
            serde_json::from_str(&body).map_err(|e| GatewayError::InvalidResponse {
                endpoint,
                reason: e.to_string(),
            })?;
        envelope.into_result(endpoint)
    }
}

/// Pull a human message out of an error body, if it is JSON with one.
fn error_message_from_body(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error", "detail"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .map(str::to_string)
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn health(&self) -> Result<HealthReport, GatewayError> {
        let body = self
            .send_for_body(HEALTH, self.client.traced_get(&self.url(HEALTH)))
            .await?;
        serde_json::from_str(&body).map_err(|e| GatewayError::InvalidResponse {
            endpoint: HEALTH,
            reason: e.to_string(),
        })
    }

    async fn stats(&self) -> Result<Stats, GatewayError> {
        let envelope: Envelope<Stats> = self
            .envelope(STATS, self.client.traced_get(&self.url(STATS)))
            .await?;
        Ok(envelope.data.unwrap_or_default())
    }

    async fn upload_status(&self) -> Result<UploadStatus, GatewayError> {
        let cache_buster = Utc::now().timestamp_millis().to_string();
        let request = self
            .client
            .traced_get(&self.url(UPLOAD_STATUS))
            .query(&[("_t", cache_buster.as_str())])
            .header("Cache-Control", "no-cache");

        self.envelope::<UploadStatus>(UPLOAD_STATUS, request)
            .await?
            .require_data(UPLOAD_STATUS)
    }

    async fn fetch_invoices(
        &self,
        request: &FetchInvoicesRequest,
    ) -> Result<FetchInvoicesResult, GatewayError> {
        let envelope: Envelope<FetchInvoicesResult> = self
            .envelope(
                FETCH_INVOICES,
                self.client.traced_post(&self.url(FETCH_INVOICES)).json(request),
            )
            .await?;
        Ok(envelope.data.unwrap_or_default())
    }

    async fn upload_bank_statement(
        &self,
        file_name: &str,
        contents: Vec<u8>,
        options: UploadOptions,
    ) -> Result<UploadResult, GatewayError> {
        let part = Part::bytes(contents).file_name(file_name.to_string());
        let form = Form::new()
            .part("file", part)
            .text("uploadBatchOnly", options.upload_batch_only.to_string())
            .text("clearPrevious", options.clear_previous.to_string());

        let envelope: Envelope<UploadResult> = self
            .envelope(
                UPLOAD_BANK_STATEMENT,
                self.client
                    .traced_post(&self.url(UPLOAD_BANK_STATEMENT))
                    .multipart(form),
            )
            .await?;
        Ok(envelope.data.unwrap_or_default())
    }

    async fn reconcile(&self, request: &ReconcileRequest) -> Result<ReconcileResult, GatewayError> {
        let envelope: Envelope<ReconcileResult> = self
            .envelope(
                RECONCILE,
                self.client
                    .traced_post(&self.url(RECONCILE))
                    .request_id(request.session_id.as_str())
                    .json(request),
            )
            .await?;
        Ok(envelope.data.unwrap_or_default())
    }

    async fn reconciliation_results(&self, limit: u32) -> Result<Vec<MatchRecord>, GatewayError> {
        let envelope: Envelope<serde_json::Value> = self
            .envelope(
                RECONCILIATION_RESULTS,
                self.client
                    .traced_get(&self.url(RECONCILIATION_RESULTS))
                    .query(&[("limit", limit)]),
            )
            .await?;
        Ok(envelope.data.map(records_from_value).unwrap_or_default())
    }

    async fn delete_reconciliation_results(&self) -> Result<(), GatewayError> {
        self.envelope::<serde_json::Value>(
            RECONCILIATION_RESULTS,
            self.client.traced_delete(&self.url(RECONCILIATION_RESULTS)),
        )
        .await
        .map(|_| ())
    }

    async fn export(&self, format: ExportFormat) -> Result<Vec<u8>, GatewayError> {
        let started = Instant::now();
        let result = async {
            let response = self
                .send(EXPORT, self.client.traced_get(&self.export_url(format)))
                .await?;
            let status = response.status();
            if !status.is_success() {
                return Err(GatewayError::Http {
                    endpoint: EXPORT,
                    status: status.as_u16(),
                    message: status.canonical_reason().unwrap_or("export failed").to_string(),
                });
            }
            let bytes = response
                .bytes()
                .await
                .map_err(|e| GatewayError::from_reqwest(EXPORT, self.base_url(), e))?;
            Ok(bytes.to_vec())
        }
        .await;

        record_gateway_request(EXPORT, &result, started.elapsed().as_secs_f64());
        result
    }

    fn target(&self) -> &str {
        self.base_url()
    }
}
