//! Account service - connect and disconnect calendar accounts

use std::sync::Arc;

use tracing::{info, warn};
use unical_domain::{normalize_email, Account, ChangeSignal, Provider, Result, UnicalError};

use super::ports::AccountRepository;
use crate::sync::ports::{ChangeNotifier, EventStore, TokenStore};

/// Manages the set of signed-in accounts.
///
/// Disconnecting an account cascades to its continuation token and all of
/// its stored events.
pub struct AccountService {
    accounts: Arc<dyn AccountRepository>,
    events: Arc<dyn EventStore>,
    tokens: Arc<dyn TokenStore>,
    notifier: Arc<dyn ChangeNotifier>,
}

impl AccountService {
    /// Create a new account service
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        events: Arc<dyn EventStore>,
        tokens: Arc<dyn TokenStore>,
        notifier: Arc<dyn ChangeNotifier>,
    ) -> Self {
        Self { accounts, events, tokens, notifier }
    }

    /// Record a successful sign-in.
    ///
    /// Reconnecting an existing account refreshes its provider, name and
    /// status but keeps the original connection timestamp.
    pub async fn connect(
        &self,
        email: &str,
        provider: Provider,
        display_name: Option<String>,
    ) -> Result<Account> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(UnicalError::InvalidInput("account email must not be empty".into()));
        }

        let account = Account::new(&email, provider, display_name);
        self.accounts.upsert(&account).await?;

        let stored = self
            .accounts
            .get(&email)
            .await?
            .ok_or_else(|| UnicalError::Internal(format!("account {email} vanished after upsert")))?;

        info!(provider = provider.as_str(), "account connected");
        self.notifier.publish(ChangeSignal::AccountsChanged);
        Ok(stored)
    }

    /// Remove an account with its token and events.
    ///
    /// Returns `false` when no such account was stored.
    pub async fn disconnect(&self, email: &str) -> Result<bool> {
        let email = normalize_email(email);

        self.tokens.remove(&email).await?;
        let removed_events = self.events.delete_account(&email).await?;
        let removed = self.accounts.remove(&email).await?;

        if removed {
            info!(removed_events, "account disconnected");
            self.notifier.publish(ChangeSignal::AccountsChanged);
        } else {
            warn!("disconnect requested for unknown account");
        }
        Ok(removed)
    }

    /// All stored accounts.
    pub async fn accounts(&self) -> Result<Vec<Account>> {
        self.accounts.list().await
    }

    /// Sign out of everything.
    pub async fn disconnect_all(&self) -> Result<usize> {
        let accounts = self.accounts.list().await?;
        for account in &accounts {
            self.events.delete_account(&account.email).await?;
        }
        self.tokens.remove_all().await?;
        self.accounts.remove_all().await?;

        info!(count = accounts.len(), "all accounts disconnected");
        self.notifier.publish(ChangeSignal::AccountsChanged);
        Ok(accounts.len())
    }
}
