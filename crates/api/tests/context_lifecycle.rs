//! AppContext start-up and shutdown.

mod support;

use support::{context, test_config};
use tempfile::TempDir;
use wiremock::MockServer;

#[tokio::test]
async fn context_builds_and_creates_database() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("unical.db");
    let (ctx, _temp_dir) = context(test_config(&temp_dir, &server), temp_dir).await;

    assert!(db_path.exists());
    ctx.db.health_check().unwrap();
    assert!(!ctx.scheduler_running().await);
}

#[tokio::test]
async fn scheduler_starts_and_shutdown_is_idempotent() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let (ctx, _temp_dir) = context(test_config(&temp_dir, &server), temp_dir).await;

    ctx.start_scheduler().await.unwrap();
    assert!(ctx.scheduler_running().await);
    assert!(ctx.start_scheduler().await.is_err());

    ctx.shutdown().await.unwrap();
    assert!(!ctx.scheduler_running().await);
    ctx.shutdown().await.unwrap();
}

#[tokio::test]
async fn unknown_timezone_is_a_config_error() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config(&temp_dir, &server);
    config.timezone = Some("Mars/Olympus_Mons".into());

    let err = unical_app::AppContext::new(config).await.err().unwrap();
    assert!(matches!(err, unical_domain::UnicalError::Config(_)), "got {err:?}");
}
