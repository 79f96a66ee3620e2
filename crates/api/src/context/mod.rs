//! Application context - dependency injection container

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{info, warn};
use unical_core::{AccountService, ChangeNotifier, SyncOrchestrator, SyncSettings};
use unical_domain::{AccountCredential, Config, LocalZone, Provider, Result, UnicalError};
use unical_infra::integrations::{
    AccessTokenProvider, GoogleEventSource, MicrosoftEventSource, OAuthClient,
    RefreshingTokenProvider, StaticTokenProvider,
};
use unical_infra::observability::SyncMetrics;
use unical_infra::{
    BroadcastNotifier, DbManager, HttpClient, SchedulerError, SqliteAccountRepository,
    SqliteEventStore, SqliteTokenStore, SyncJob, SyncScheduler, SyncSchedulerConfig,
};

/// Access tokens handed over by the sign-in flow are trusted for this long.
const SEEDED_ACCESS_TOKEN_TTL: Duration = Duration::from_secs(55 * 60);

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub db: Arc<DbManager>,
    pub events: Arc<SqliteEventStore>,
    pub tokens: Arc<SqliteTokenStore>,
    pub accounts: Arc<SqliteAccountRepository>,
    pub notifier: Arc<BroadcastNotifier>,
    pub orchestrator: Arc<SyncOrchestrator>,
    pub account_service: Arc<AccountService>,
    pub sync_job: SyncJob,
    scheduler: Mutex<SyncScheduler>,
}

impl AppContext {
    /// Wire every store, provider and service from `config`.
    ///
    /// The scheduler is built but not started; see [`Self::start_scheduler`].
    pub async fn new(config: Config) -> Result<Self> {
        let db = Arc::new(DbManager::from_config(&config.database)?);
        db.run_migrations()?;
        info!(path = %db.path().display(), "database ready");

        let zone = LocalZone::from_name(config.timezone.as_deref())?;
        let http = HttpClient::from_config(&config.http)?;
        let page_size = config.sync.effective_page_size();

        let google = GoogleEventSource::new(
            http.clone(),
            &config.google,
            token_provider(
                &http,
                Provider::Google,
                config.google.client_id.as_deref(),
                config.google.client_secret.clone(),
                &config.google.token_endpoint,
                None,
                &config.credentials,
            ),
        )
        .with_zone(zone)
        .with_page_size(page_size);

        let microsoft = MicrosoftEventSource::new(
            http.clone(),
            &config.microsoft,
            token_provider(
                &http,
                Provider::Outlook,
                config.microsoft.client_id.as_deref(),
                config.microsoft.client_secret.clone(),
                &config.microsoft.token_endpoint,
                Some(config.microsoft.scope.clone()),
                &config.credentials,
            ),
        )
        .with_zone(zone)
        .with_page_size(page_size);

        let notifier = Arc::new(BroadcastNotifier::default());
        let dyn_notifier: Arc<dyn ChangeNotifier> = notifier.clone();
        let events = Arc::new(SqliteEventStore::new(Arc::clone(&db), Arc::clone(&dyn_notifier)));
        let tokens = Arc::new(SqliteTokenStore::new(Arc::clone(&db)));
        let accounts = Arc::new(SqliteAccountRepository::new(Arc::clone(&db)));

        let orchestrator = Arc::new(
            SyncOrchestrator::new(
                events.clone(),
                tokens.clone(),
                accounts.clone(),
                Arc::clone(&dyn_notifier),
                SyncSettings::from_config(&config.sync, zone),
            )
            .with_source(Arc::new(google))
            .with_source(Arc::new(microsoft)),
        );

        let account_service = Arc::new(AccountService::new(
            accounts.clone(),
            events.clone(),
            tokens.clone(),
            dyn_notifier,
        ));

        let sync_job = SyncJob::new(Arc::clone(&orchestrator), Arc::new(SyncMetrics::new()));
        let scheduler = SyncScheduler::new(
            SyncSchedulerConfig::from_sync_config(&config.sync),
            sync_job.clone(),
        );

        Ok(Self {
            config,
            db,
            events,
            tokens,
            accounts,
            notifier,
            orchestrator,
            account_service,
            sync_job,
            scheduler: Mutex::new(scheduler),
        })
    }

    /// Register every account listed under `credentials` in the config.
    ///
    /// Returns how many were connected.
    pub async fn connect_configured_accounts(&self) -> Result<usize> {
        for credential in &self.config.credentials {
            self.account_service.connect(&credential.email, credential.provider, None).await?;
        }
        Ok(self.config.credentials.len())
    }

    pub async fn start_scheduler(&self) -> Result<()> {
        self.scheduler.lock().await.start().await.map_err(UnicalError::from)
    }

    pub async fn scheduler_running(&self) -> bool {
        self.scheduler.lock().await.is_running()
    }

    /// Stop background work. Safe to call when the scheduler never started.
    pub async fn shutdown(&self) -> Result<()> {
        let mut scheduler = self.scheduler.lock().await;
        match scheduler.stop().await {
            Ok(()) | Err(SchedulerError::NotRunning) => {}
            Err(err) => return Err(err.into()),
        }
        info!("application context shut down");
        Ok(())
    }
}

/// Refreshing provider when an OAuth client is configured, otherwise the
/// static access tokens from the credentials.
fn token_provider(
    http: &HttpClient,
    provider: Provider,
    client_id: Option<&str>,
    client_secret: Option<String>,
    token_endpoint: &str,
    scope: Option<String>,
    credentials: &[AccountCredential],
) -> Arc<dyn AccessTokenProvider> {
    let credentials = credentials.iter().filter(|c| c.provider == provider);

    match client_id.filter(|id| !id.trim().is_empty()) {
        Some(client_id) => {
            let refreshing = RefreshingTokenProvider::new(
                http.clone(),
                OAuthClient {
                    token_endpoint: token_endpoint.to_string(),
                    client_id: client_id.to_string(),
                    client_secret,
                    scope,
                },
            );
            for credential in credentials {
                if let Some(refresh_token) = &credential.refresh_token {
                    refreshing.add_refresh_token(&credential.email, refresh_token.clone());
                }
                if let Some(access_token) = &credential.access_token {
                    refreshing.seed(&credential.email, access_token.clone(), SEEDED_ACCESS_TOKEN_TTL);
                }
            }
            Arc::new(refreshing)
        }
        None => {
            let fixed = StaticTokenProvider::new();
            for credential in credentials {
                match &credential.access_token {
                    Some(token) => fixed.insert(&credential.email, token.clone()),
                    None => warn!(
                        provider = provider.as_str(),
                        "credential without access token and no OAuth client configured"
                    ),
                }
            }
            Arc::new(fixed)
        }
    }
}
