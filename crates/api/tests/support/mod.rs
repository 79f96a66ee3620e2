//! Shared helpers for `unical-app` integration tests.

#![allow(dead_code)]

use serde_json::{json, Value};
use tempfile::TempDir;
use unical_app::AppContext;
use unical_domain::{AccountCredential, Config, DatabaseConfig, HttpConfig, Provider};
use wiremock::MockServer;

pub const JANE: &str = "jane@example.com";

/// Config pointing at a temporary database and a mock Google API.
pub fn test_config(temp_dir: &TempDir, server: &MockServer) -> Config {
    let mut config = Config {
        database: DatabaseConfig {
            path: temp_dir.path().join("unical.db").to_string_lossy().to_string(),
            pool_size: 2,
        },
        http: HttpConfig { max_attempts: 1, base_backoff_ms: 1, ..HttpConfig::default() },
        timezone: Some("UTC".into()),
        credentials: vec![AccountCredential {
            email: JANE.into(),
            provider: Provider::Google,
            access_token: Some("static-token".into()),
            refresh_token: None,
        }],
        ..Config::default()
    };
    config.google.api_base = server.uri();
    config.sync.cron_expression = "0 */5 * * * *".into();
    config
}

/// Context plus the temp dir that owns its database file.
pub async fn context(config: Config, temp_dir: TempDir) -> (AppContext, TempDir) {
    let ctx = AppContext::new(config).await.expect("context should build");
    (ctx, temp_dir)
}

pub fn google_item(id: &str, start: &str, end: &str) -> Value {
    json!({
        "id": id,
        "status": "confirmed",
        "summary": format!("Meeting {id}"),
        "start": {"dateTime": start},
        "end": {"dateTime": end}
    })
}
