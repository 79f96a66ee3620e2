//! Access tokens for provider API calls
//!
//! The interactive sign-in flow lives outside this crate; it hands over
//! either a ready access token or a refresh token per account.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use unical_domain::{normalize_email, Account, Result, UnicalError};

use crate::http::{read_json, HttpClient};

/// Refresh this long before the provider-reported expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Source of bearer tokens for one provider.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self, account: &Account) -> Result<String>;
}

/// Fixed tokens keyed by account email.
#[derive(Debug, Default)]
pub struct StaticTokenProvider {
    tokens: DashMap<String, String>,
}

impl StaticTokenProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(self, email: &str, token: impl Into<String>) -> Self {
        self.insert(email, token);
        self
    }

    pub fn insert(&self, email: &str, token: impl Into<String>) {
        self.tokens.insert(normalize_email(email), token.into());
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(&self, account: &Account) -> Result<String> {
        self.tokens
            .get(&normalize_email(&account.email))
            .map(|t| t.value().clone())
            .ok_or_else(|| UnicalError::Auth(format!("no access token for {}", account.email)))
    }
}

/// OAuth client registration used for the refresh-token grant.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    pub token_endpoint: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub scope: Option<String>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now + EXPIRY_MARGIN < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenRefreshResponse {
    access_token: String,
    expires_in: u64,
    refresh_token: Option<String>,
}

/// Refresh-token grant with in-memory caching of the issued access tokens.
pub struct RefreshingTokenProvider {
    http: HttpClient,
    client: OAuthClient,
    refresh_tokens: DashMap<String, String>,
    cache: Mutex<HashMap<String, CachedToken>>,
}

impl RefreshingTokenProvider {
    pub fn new(http: HttpClient, client: OAuthClient) -> Self {
        Self { http, client, refresh_tokens: DashMap::new(), cache: Mutex::new(HashMap::new()) }
    }

    pub fn add_refresh_token(&self, email: &str, refresh_token: impl Into<String>) {
        self.refresh_tokens.insert(normalize_email(email), refresh_token.into());
    }

    /// Prime the cache with an access token issued elsewhere.
    pub fn seed(&self, email: &str, access_token: impl Into<String>, ttl: Duration) {
        self.cache.lock().insert(
            normalize_email(email),
            CachedToken { value: access_token.into(), expires_at: Instant::now() + ttl },
        );
    }

    fn cached(&self, email: &str) -> Option<String> {
        let now = Instant::now();
        self.cache.lock().get(email).filter(|t| t.is_fresh(now)).map(|t| t.value.clone())
    }

    #[instrument(skip(self, refresh_token), fields(endpoint = %self.client.token_endpoint))]
    async fn refresh(&self, email: &str, refresh_token: &str) -> Result<CachedToken> {
        let mut form = vec![
            ("client_id", self.client.client_id.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        if let Some(secret) = self.client.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }
        if let Some(scope) = self.client.scope.as_deref() {
            form.push(("scope", scope));
        }

        let request = self.http.request(Method::POST, &self.client.token_endpoint).form(&form);
        let response = self.http.send(request).await?;
        let body: TokenRefreshResponse = read_json(response).await.map_err(|err| match err {
            UnicalError::InvalidInput(msg) | UnicalError::NotFound(msg) => UnicalError::Auth(msg),
            other => other,
        })?;

        if let Some(rotated) = body.refresh_token {
            debug!("provider rotated the refresh token");
            self.refresh_tokens.insert(email.to_string(), rotated);
        }

        info!(expires_in = body.expires_in, "access token refreshed");
        Ok(CachedToken {
            value: body.access_token,
            expires_at: Instant::now() + Duration::from_secs(body.expires_in),
        })
    }
}

#[async_trait]
impl AccessTokenProvider for RefreshingTokenProvider {
    async fn access_token(&self, account: &Account) -> Result<String> {
        let email = normalize_email(&account.email);
        if let Some(token) = self.cached(&email) {
            return Ok(token);
        }

        let refresh_token = self
            .refresh_tokens
            .get(&email)
            .map(|t| t.value().clone())
            .ok_or_else(|| {
                warn!(account = %email, "no refresh token available");
                UnicalError::Auth(format!("no credentials for {email}"))
            })?;

        let token = self.refresh(&email, &refresh_token).await?;
        let value = token.value.clone();
        self.cache.lock().insert(email, token);
        Ok(value)
    }
}
