//! Configuration module for the reconciliation dashboard.

use dashboard_core::config::{self as core_config, ConfigSource};
use dashboard_core::error::AppError;
use dashboard_core::retry::LinearBackoff;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
    #[serde(default)]
    pub gateway: GatewaySettings,
    #[serde(default)]
    pub poller: PollerSettings,
    #[serde(default)]
    pub session: SessionSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySettings {
    /// Root of the gateway API, e.g. `https://recon.example.com/api`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollerSettings {
    #[serde(default = "default_poll_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_poll_backoff_step_ms")]
    pub backoff_step_ms: u64,
    /// Wait between a mutating action and the follow-up status poll, giving
    /// the backend time to ingest.
    #[serde(default = "default_refresh_delay_ms")]
    pub refresh_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_result_attempts")]
    pub result_attempts: u32,
    #[serde(default = "default_result_backoff_step_ms")]
    pub result_backoff_step_ms: u64,
    #[serde(default = "default_results_limit")]
    pub results_limit: u32,
    #[serde(default = "default_enforce_session_id")]
    pub enforce_session_id: bool,
}

fn default_service_name() -> String {
    "reconciliation-dashboard".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_poll_max_retries() -> u32 {
    3
}

fn default_poll_backoff_step_ms() -> u64 {
    2000
}

fn default_refresh_delay_ms() -> u64 {
    2500
}

fn default_progress_interval_ms() -> u64 {
    800
}

fn default_settle_delay_ms() -> u64 {
    1500
}

fn default_result_attempts() -> u32 {
    5
}

fn default_result_backoff_step_ms() -> u64 {
    1000
}

fn default_results_limit() -> u32 {
    1000
}

fn default_enforce_session_id() -> bool {
    true
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            max_retries: default_poll_max_retries(),
            backoff_step_ms: default_poll_backoff_step_ms(),
            refresh_delay_ms: default_refresh_delay_ms(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            progress_interval_ms: default_progress_interval_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            result_attempts: default_result_attempts(),
            result_backoff_step_ms: default_result_backoff_step_ms(),
            results_limit: default_results_limit(),
            enforce_session_id: default_enforce_session_id(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            log_level: default_log_level(),
            log_json: false,
            otlp_endpoint: None,
            gateway: GatewaySettings::default(),
            poller: PollerSettings::default(),
            session: SessionSettings::default(),
        }
    }
}

impl GatewaySettings {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl PollerSettings {
    pub fn backoff(&self) -> LinearBackoff {
        LinearBackoff::from_millis(self.backoff_step_ms)
    }

    pub fn refresh_delay(&self) -> Duration {
        Duration::from_millis(self.refresh_delay_ms)
    }
}

impl SessionSettings {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn result_backoff(&self) -> LinearBackoff {
        LinearBackoff::from_millis(self.result_backoff_step_ms)
    }
}

impl DashboardConfig {
    /// Load from `dashboard.*` (or `explicit_file`) and `DASHBOARD__*` variables.
    pub fn load(explicit_file: Option<&Path>) -> Result<Self, AppError> {
        let config: Self = core_config::load(&ConfigSource {
            file_stem: "dashboard",
            explicit_file,
            env_prefix: "DASHBOARD",
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let base_url = self.gateway.base_url.trim();
        if base_url.is_empty() {
            return Err(AppError::config("gateway.base_url must not be empty"));
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(AppError::config(format!(
                "gateway.base_url must be an http(s) URL, got '{}'",
                base_url
            )));
        }
        if self.gateway.request_timeout_secs == 0 {
            return Err(AppError::config("gateway.request_timeout_secs must be > 0"));
        }
        if self.session.progress_interval_ms == 0 {
            return Err(AppError::config("session.progress_interval_ms must be > 0"));
        }
        if self.session.result_attempts == 0 {
            return Err(AppError::config("session.result_attempts must be > 0"));
        }
        if self.session.results_limit == 0 {
            return Err(AppError::config("session.results_limit must be > 0"));
        }
        Ok(())
    }
}
