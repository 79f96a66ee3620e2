//! Configuration management
//!
//! Every section has defaults so a partial file (or none at all) still
//! produces a usable [`Config`].

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BACKFILL_MONTHS, DEFAULT_SAFETY_FUTURE_DAYS, DEFAULT_SAFETY_PAST_DAYS,
    DEFAULT_SYNC_CRON, MAX_PAGE_SIZE,
};
use crate::types::Provider;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub sync: SyncConfig,
    pub http: HttpConfig,
    pub google: GoogleConfig,
    pub microsoft: MicrosoftConfig,
    pub logging: LoggingConfig,
    /// IANA timezone used to anchor all-day events; host zone when unset.
    pub timezone: Option<String>,
    pub credentials: Vec<AccountCredential>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "unical.db".to_string(), pool_size: 4 }
    }
}

/// Sync engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub enabled: bool,
    pub cron_expression: String,
    pub page_size: u32,
    pub backfill_months: u32,
    pub safety_past_days: i64,
    pub safety_future_days: i64,
    pub max_concurrent_accounts: usize,
    pub job_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cron_expression: DEFAULT_SYNC_CRON.to_string(),
            page_size: MAX_PAGE_SIZE,
            backfill_months: DEFAULT_BACKFILL_MONTHS,
            safety_past_days: DEFAULT_SAFETY_PAST_DAYS,
            safety_future_days: DEFAULT_SAFETY_FUTURE_DAYS,
            max_concurrent_accounts: 4,
            job_timeout_secs: 300,
        }
    }
}

impl SyncConfig {
    /// Page size clamped to what the remote APIs accept.
    pub fn effective_page_size(&self) -> u32 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }
}

/// Outbound HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub max_attempts: usize,
    pub base_backoff_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 30, max_attempts: 3, base_backoff_ms: 200 }
    }
}

/// Google Calendar API endpoints and OAuth client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    pub api_base: String,
    pub token_endpoint: String,
    pub client_id: Option<String>,
    #[serde(skip_serializing)]
    pub client_secret: Option<String>,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            api_base: "https://www.googleapis.com/calendar/v3".to_string(),
            token_endpoint: "https://oauth2.googleapis.com/token".to_string(),
            client_id: None,
            client_secret: None,
        }
    }
}

/// Microsoft Graph endpoints and OAuth client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MicrosoftConfig {
    pub api_base: String,
    pub token_endpoint: String,
    pub client_id: Option<String>,
    #[serde(skip_serializing)]
    pub client_secret: Option<String>,
    pub scope: String,
}

impl Default for MicrosoftConfig {
    fn default() -> Self {
        Self {
            api_base: "https://graph.microsoft.com/v1.0".to_string(),
            token_endpoint: "https://login.microsoftonline.com/common/oauth2/v2.0/token"
                .to_string(),
            client_id: None,
            client_secret: None,
            scope: "Calendars.Read offline_access".to_string(),
        }
    }
}

/// Tracing subscriber configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: "info,unical=debug".to_string(), json: false }
    }
}

/// OAuth material for one account, issued by the platform sign-in flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountCredential {
    pub email: String,
    pub provider: Provider,
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing)]
    pub refresh_token: Option<String>,
}
