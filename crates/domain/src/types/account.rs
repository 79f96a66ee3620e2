//! Connected calendar accounts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::impl_domain_status_conversions;
use crate::utils::normalize_email;

/// Calendar provider an account (and its events) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    #[serde(alias = "microsoft")]
    Outlook,
}

impl_domain_status_conversions!(Provider {
    Google => "google",
    Outlook => "outlook",
});

impl Provider {
    /// Stable identifier used as the `source` column of stored events.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Outlook => "outlook",
        }
    }
}

/// Connection state shown for an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Connected,
    Syncing,
    Error,
}

impl_domain_status_conversions!(AccountStatus {
    Connected => "connected",
    Syncing => "syncing",
    Error => "error",
});

/// A signed-in calendar account, identified by its lowercased email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub email: String,
    pub provider: Provider,
    pub display_name: Option<String>,
    pub connected_at: DateTime<Utc>,
    pub is_connected: bool,
    pub status: AccountStatus,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Freshly connected account.
    pub fn new(email: &str, provider: Provider, display_name: Option<String>) -> Self {
        Self {
            email: normalize_email(email),
            provider,
            display_name,
            connected_at: Utc::now(),
            is_connected: true,
            status: AccountStatus::Connected,
            last_synced_at: None,
        }
    }
}
