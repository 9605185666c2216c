//! Domain models for the reconciliation dashboard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Upload Status
// ============================================================================

/// Which input datasets the gateway currently holds.
///
/// Goes stale as soon as anything uploads, fetches or clears data, so every
/// mutating action is followed by a re-poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadStatus {
    #[serde(alias = "has_invoices")]
    pub has_invoices: bool,
    #[serde(alias = "has_bank_statements")]
    pub has_bank_statements: bool,
    #[serde(alias = "invoice_count")]
    pub invoice_count: u64,
    #[serde(alias = "bank_count")]
    pub bank_count: u64,
}

impl UploadStatus {
    /// The value assumed when the gateway cannot be asked.
    pub fn conservative() -> Self {
        Self::default()
    }

    /// Datasets a batch-only run needs but the gateway does not have.
    pub fn missing_datasets(&self) -> Vec<Dataset> {
        let mut missing = Vec::new();
        if !self.has_invoices {
            missing.push(Dataset::Invoices);
        }
        if !self.has_bank_statements {
            missing.push(Dataset::BankStatements);
        }
        missing
    }

    pub fn is_ready(&self) -> bool {
        self.has_invoices && self.has_bank_statements
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    Invoices,
    BankStatements,
}

impl Dataset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invoices => "invoices",
            Self::BankStatements => "bank statements",
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Reconciliation Session
// ============================================================================

/// User-chosen knobs for one reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileParams {
    pub limit: u32,
    pub days_back: u32,
    pub latest_only: bool,
    pub upload_batch_only: bool,
}

impl Default for ReconcileParams {
    fn default() -> Self {
        Self {
            limit: 1000,
            days_back: 30,
            latest_only: false,
            upload_batch_only: false,
        }
    }
}

impl ReconcileParams {
    /// Name of the first field that must be positive but is zero.
    pub fn zero_field(&self) -> Option<&'static str> {
        if self.limit == 0 {
            Some("limit")
        } else if self.days_back == 0 {
            Some("days_back")
        } else {
            None
        }
    }
}

/// One reconciliation attempt. Created per run, never reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationSession {
    pub session_id: String,
    pub params: ReconcileParams,
    pub started_at: DateTime<Utc>,
}

impl ReconciliationSession {
    pub fn start(params: ReconcileParams) -> Self {
        let started_at = Utc::now();
        Self {
            session_id: new_session_id(started_at),
            params,
            started_at,
        }
    }
}

/// Time-derived session token: `session_<epoch-ms>_<8 hex>`.
///
/// The random suffix keeps two runs started in the same millisecond apart.
pub fn new_session_id(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("session_{}_{}", now.timestamp_millis(), &suffix[..8])
}

// ============================================================================
// Match Records
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MatchType {
    ExactMatch,
    AiMatch,
    PartialMatch,
    ReferenceBased,
    Other(String),
}

impl MatchType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::ExactMatch => "EXACT_MATCH",
            Self::AiMatch => "AI_MATCH",
            Self::PartialMatch => "PARTIAL_MATCH",
            Self::ReferenceBased => "REFERENCE_BASED",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for MatchType {
    fn from(s: String) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "EXACT_MATCH" => Self::ExactMatch,
            "AI_MATCH" => Self::AiMatch,
            "PARTIAL_MATCH" => Self::PartialMatch,
            "REFERENCE_BASED" => Self::ReferenceBased,
            _ => Self::Other(s),
        }
    }
}

impl From<MatchType> for String {
    fn from(t: MatchType) -> Self {
        t.as_str().to_string()
    }
}

impl Default for MatchType {
    fn default() -> Self {
        Self::Other("UNKNOWN".to_string())
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Matched,
    #[default]
    Pending,
    ReviewRequired,
    Rejected,
    #[serde(other)]
    Unknown,
}

/// One reconciled invoice/bank-transaction pairing as returned by the gateway.
///
/// Decoding is lenient field by field: ERP ids may arrive as numbers,
/// numeric fields as strings, and any optional field as `null`. Only an
/// unusable `id` rejects the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    #[serde(default, alias = "invoiceId", deserialize_with = "opt_string_or_number")]
    pub invoice_id: Option<String>,
    #[serde(default, alias = "invoiceNumber", deserialize_with = "opt_string_or_number")]
    pub invoice_number: Option<String>,
    #[serde(default, alias = "invoiceAmount", deserialize_with = "opt_lenient_f64")]
    pub invoice_amount: Option<f64>,
    #[serde(default, alias = "invoiceDate", deserialize_with = "opt_string_or_number")]
    pub invoice_date: Option<String>,
    #[serde(default, alias = "customerName", deserialize_with = "opt_string_or_number")]
    pub customer_name: Option<String>,

    #[serde(default, alias = "bankTransactionId", deserialize_with = "opt_string_or_number")]
    pub bank_transaction_id: Option<String>,
    #[serde(default, alias = "bankAmount", deserialize_with = "opt_lenient_f64")]
    pub bank_amount: Option<f64>,
    #[serde(default, alias = "bankDate", deserialize_with = "opt_string_or_number")]
    pub bank_date: Option<String>,
    #[serde(default, alias = "bankDescription", deserialize_with = "opt_string_or_number")]
    pub bank_description: Option<String>,
    #[serde(default, alias = "bankReference", deserialize_with = "opt_string_or_number")]
    pub bank_reference: Option<String>,

    #[serde(default, alias = "matchConfidence", deserialize_with = "lenient_f64")]
    pub match_confidence: f64,
    #[serde(default, alias = "matchType", deserialize_with = "null_as_default")]
    pub match_type: MatchType,
    #[serde(default, alias = "matchReasons", deserialize_with = "null_as_default")]
    pub match_reasons: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: MatchStatus,
    #[serde(default, alias = "amountDifference", deserialize_with = "lenient_f64")]
    pub amount_difference: f64,
    #[serde(default, alias = "dateDifferenceDays", deserialize_with = "lenient_u32")]
    pub date_difference_days: u32,
    #[serde(default, alias = "sessionId", deserialize_with = "opt_string_or_number")]
    pub session_id: Option<String>,
    #[serde(default, alias = "createdAt", deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

/// Strings pass through, numbers are rendered, `null` and anything else is absent.
fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Number or numeric string. `null`, empty and unparseable values are absent.
fn opt_lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(number_from_value(&serde_json::Value::deserialize(deserializer)?))
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_lenient_f64(deserializer)?.unwrap_or_default())
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_lenient_f64(deserializer)?
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n.min(f64::from(u32::MAX)) as u32)
        .unwrap_or_default())
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn number_from_value(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(raw.as_str().and_then(|s| {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    }))
}

/// Parse the `data` member of a results response.
///
/// Anything that is not an array yields an empty set. Array elements that do
/// not parse as a record are skipped.
pub fn records_from_value(value: serde_json::Value) -> Vec<MatchRecord> {
    let serde_json::Value::Array(items) = value else {
        if !value.is_null() {
            tracing::warn!("Results payload is not an array, treating as empty");
        }
        return Vec::new();
    };

    let total = items.len();
    let mut first_error = None;
    let records: Vec<MatchRecord> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(e) => {
                first_error.get_or_insert_with(|| e.to_string());
                None
            }
        })
        .collect();

    if let Some(error) = first_error {
        tracing::warn!(
            skipped = total - records.len(),
            total,
            first_error = %error,
            "Skipped malformed match records"
        );
    }
    records
}
