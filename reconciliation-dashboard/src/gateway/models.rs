//! Wire shapes for the gateway's JSON endpoints.

use super::error::GatewayError;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// `{ success, data, message }` wrapper used by every JSON endpoint except health.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    /// Turn `success: false` into [`GatewayError::Application`].
    pub fn into_result(self, endpoint: &'static str) -> Result<Envelope<T>, GatewayError> {
        if self.success {
            return Ok(self);
        }
        let message = self
            .message
            .or(self.error)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("{} reported failure without a message", endpoint));
        Err(GatewayError::Application { endpoint, message })
    }

    pub fn require_data(self, endpoint: &'static str) -> Result<T, GatewayError> {
        self.data.ok_or(GatewayError::InvalidResponse {
            endpoint,
            reason: "missing data".to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(default)]
    pub services: BTreeMap<String, ServiceStatus>,
}

impl HealthReport {
    pub fn unhealthy_services(&self) -> Vec<&str> {
        self.services
            .iter()
            .filter(|(_, s)| !s.success)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Aggregate counters. Fields the gateway has no value for yet (`null` or
/// absent) read as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    #[serde(deserialize_with = "null_as_default")]
    pub total_reconciliations: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub matched: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub pending: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub avg_confidence: f64,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchInvoicesRequest {
    pub date_from: String,
    pub date_to: String,
    pub limit: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FetchInvoicesResult {
    #[serde(alias = "fetched_count")]
    pub fetched_count: u64,
}

/// Flags sent as extra multipart fields alongside a statement upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadOptions {
    pub upload_batch_only: bool,
    pub clear_previous: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadResult {
    #[serde(alias = "processed_rows")]
    pub processed_rows: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileRequest {
    pub limit: u32,
    pub days_back: u32,
    pub latest_only: bool,
    pub upload_batch_only: bool,
    pub session_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReconcileResult {
    #[serde(alias = "reconciliation_count")]
    pub reconciliation_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stats_tolerate_null_counters() {
        let stats: Stats = serde_json::from_value(json!({
            "total_reconciliations": 0,
            "matched": 0,
            "pending": null,
            "avg_confidence": null
        }))
        .unwrap();
        assert_eq!(stats, Stats::default());

        let stats: Stats =
            serde_json::from_value(json!({"matched": 4, "avg_confidence": 0.91})).unwrap();
        assert_eq!(stats.matched, 4);
        assert_eq!(stats.avg_confidence, 0.91);
        assert_eq!(stats.total_reconciliations, 0);
    }

    #[test]
    fn failed_envelope_prefers_message_then_error() {
        let env: Envelope<serde_json::Value> =
            serde_json::from_value(json!({"success": false, "error": "ERP offline"})).unwrap();
        let err = env.into_result("fetch-invoices").unwrap_err();
        assert_eq!(err.to_string(), "ERP offline");

        let env: Envelope<serde_json::Value> =
            serde_json::from_value(json!({"success": false})).unwrap();
        let err = env.into_result("reconcile").unwrap_err();
        assert!(err.to_string().contains("reconcile"));
    }

    #[test]
    fn reconcile_request_uses_camel_case_keys() {
        let body = serde_json::to_value(ReconcileRequest {
            limit: 500,
            days_back: 14,
            latest_only: true,
            upload_batch_only: true,
            session_id: "session_1_abcd1234".to_string(),
        })
        .unwrap();
        assert_eq!(
            body,
            json!({
                "limit": 500,
                "daysBack": 14,
                "latestOnly": true,
                "uploadBatchOnly": true,
                "sessionId": "session_1_abcd1234"
            })
        );
    }

    #[test]
    fn health_lists_failing_services() {
        let report: HealthReport = serde_json::from_value(json!({
            "status": "degraded",
            "services": {
                "bigquery": {"success": true, "message": "ok"},
                "odoo": {"success": false, "message": "auth failed"}
            }
        }))
        .unwrap();
        assert_eq!(report.unhealthy_services(), vec!["odoo"]);
    }
}
