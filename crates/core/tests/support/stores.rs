use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use unical_core::{AccountRepository, ChangeNotifier, EventStore, TokenStore};
use unical_domain::{
    normalize_email, Account, AccountStatus, CalendarEvent, ChangeSignal, Provider, Result,
    StoredEvent, TimeWindow, UnicalError,
};

/// In-memory [`EventStore`] with the same matching rules as the SQLite one.
#[derive(Default)]
pub struct InMemoryEvents {
    rows: Mutex<Vec<StoredEvent>>,
    next_id: Mutex<u64>,
}

impl InMemoryEvents {
    pub fn all(&self) -> Vec<StoredEvent> {
        self.rows.lock().unwrap().clone()
    }

    pub fn external_ids(&self, account: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .all()
            .into_iter()
            .filter(|r| r.event.account_email == account)
            .map(|r| r.event.external_id)
            .collect();
        ids.sort();
        ids
    }

    pub fn seed(&self, events: Vec<CalendarEvent>) {
        for event in events {
            self.insert(event);
        }
    }

    fn insert(&self, event: CalendarEvent) {
        let mut next_id = self.next_id.lock().unwrap();
        *next_id += 1;
        let now = Utc::now();
        self.rows.lock().unwrap().push(StoredEvent {
            id: next_id.to_string(),
            event,
            created_at: now,
            updated_at: now,
        });
    }
}

fn matches(row: &StoredEvent, id: &str, account: &str, source: Provider) -> bool {
    row.event.external_id == id && row.event.account_email == account && row.event.source == source
}

#[async_trait]
impl EventStore for InMemoryEvents {
    async fn replace(
        &self,
        account_email: &str,
        source: Provider,
        events: &[CalendarEvent],
    ) -> Result<usize> {
        let account = normalize_email(account_email);
        self.rows
            .lock()
            .unwrap()
            .retain(|r| !(r.event.account_email == account && r.event.source == source));
        for event in events {
            self.insert(event.clone());
        }
        Ok(events.len())
    }

    async fn upsert(
        &self,
        account_email: &str,
        source: Provider,
        events: &[CalendarEvent],
    ) -> Result<usize> {
        let account = normalize_email(account_email);
        for event in events {
            let mut rows = self.rows.lock().unwrap();
            match rows.iter().position(|r| matches(r, &event.external_id, &account, source)) {
                Some(index) => {
                    rows[index].event = event.clone();
                    rows[index].updated_at = Utc::now();
                }
                None => {
                    drop(rows);
                    self.insert(event.clone());
                }
            }
        }
        Ok(events.len())
    }

    async fn delete_by_external_ids(
        &self,
        ids: &[String],
        account_email: &str,
        source: Provider,
    ) -> Result<usize> {
        let account = normalize_email(account_email);
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| !ids.iter().any(|id| matches(r, id, &account, source)));
        Ok(before - rows.len())
    }

    async fn delete_account(&self, account_email: &str) -> Result<usize> {
        let account = normalize_email(account_email);
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| r.event.account_email != account);
        Ok(before - rows.len())
    }

    async fn query(
        &self,
        window: &TimeWindow,
        account_filter: Option<&str>,
    ) -> Result<Vec<StoredEvent>> {
        let filter = account_filter.map(normalize_email);
        let mut rows: Vec<StoredEvent> = self
            .all()
            .into_iter()
            .filter(|r| super::overlaps(&r.event, window))
            .filter(|r| filter.as_ref().map_or(true, |f| &r.event.account_email == f))
            .collect();
        rows.sort_by_key(|r| r.event.start);
        Ok(rows)
    }
}

#[derive(Default)]
pub struct InMemoryTokens {
    tokens: Mutex<HashMap<String, String>>,
}

impl InMemoryTokens {
    pub fn set_sync(&self, account: &str, token: &str) {
        self.tokens.lock().unwrap().insert(normalize_email(account), token.to_string());
    }

    pub fn peek(&self, account: &str) -> Option<String> {
        self.tokens.lock().unwrap().get(&normalize_email(account)).cloned()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokens {
    async fn get(&self, account_email: &str) -> Result<Option<String>> {
        Ok(self.peek(account_email))
    }

    async fn set(&self, account_email: &str, token: &str) -> Result<()> {
        self.tokens.lock().unwrap().insert(normalize_email(account_email), token.to_string());
        Ok(())
    }

    async fn remove(&self, account_email: &str) -> Result<()> {
        self.tokens.lock().unwrap().remove(&normalize_email(account_email));
        Ok(())
    }

    async fn remove_all(&self) -> Result<()> {
        self.tokens.lock().unwrap().clear();
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryAccounts {
    accounts: Mutex<Vec<Account>>,
}

impl InMemoryAccounts {
    pub fn add(&self, account: Account) {
        self.accounts.lock().unwrap().push(account);
    }

    pub fn status_of(&self, email: &str) -> Option<AccountStatus> {
        self.find(email).map(|a| a.status)
    }

    pub fn find(&self, email: &str) -> Option<Account> {
        self.accounts.lock().unwrap().iter().find(|a| a.email == email).cloned()
    }

    fn update(&self, email: &str, apply: impl FnOnce(&mut Account)) -> Result<()> {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts
            .iter_mut()
            .find(|a| a.email == normalize_email(email))
            .ok_or_else(|| UnicalError::NotFound(email.to_string()))?;
        apply(account);
        Ok(())
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccounts {
    async fn list(&self) -> Result<Vec<Account>> {
        Ok(self.accounts.lock().unwrap().clone())
    }

    async fn list_connected(&self) -> Result<Vec<Account>> {
        Ok(self.accounts.lock().unwrap().iter().filter(|a| a.is_connected).cloned().collect())
    }

    async fn get(&self, email: &str) -> Result<Option<Account>> {
        Ok(self.find(&normalize_email(email)))
    }

    async fn upsert(&self, account: &Account) -> Result<()> {
        let mut accounts = self.accounts.lock().unwrap();
        match accounts.iter_mut().find(|a| a.email == account.email) {
            Some(existing) => {
                let connected_at = existing.connected_at;
                *existing = account.clone();
                existing.connected_at = connected_at;
            }
            None => accounts.push(account.clone()),
        }
        Ok(())
    }

    async fn set_status(&self, email: &str, status: AccountStatus) -> Result<()> {
        self.update(email, |a| a.status = status)
    }

    async fn mark_synced(&self, email: &str, at: DateTime<Utc>) -> Result<()> {
        self.update(email, |a| a.last_synced_at = Some(at))
    }

    async fn remove(&self, email: &str) -> Result<bool> {
        let email = normalize_email(email);
        let mut accounts = self.accounts.lock().unwrap();
        let before = accounts.len();
        accounts.retain(|a| a.email != email);
        Ok(accounts.len() != before)
    }

    async fn remove_all(&self) -> Result<()> {
        self.accounts.lock().unwrap().clear();
        Ok(())
    }
}

/// Records every published signal.
#[derive(Default)]
pub struct RecordingNotifier {
    signals: Mutex<Vec<ChangeSignal>>,
}

impl RecordingNotifier {
    pub fn signals(&self) -> Vec<ChangeSignal> {
        self.signals.lock().unwrap().clone()
    }
}

impl ChangeNotifier for RecordingNotifier {
    fn publish(&self, signal: ChangeSignal) {
        self.signals.lock().unwrap().push(signal);
    }
}
