//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. `UNICAL_CONFIG` names an explicit file, which must exist
//! 2. Otherwise, attempts to load from environment variables
//! 3. If `UNICAL_DB_PATH` is unset, falls back to loading from file
//! 4. Probes multiple paths for config files
//! 5. Supports JSON and TOML formats
//!
//! With no environment and no file the built-in defaults are used.
//!
//! ## Environment Variables
//! - `UNICAL_DB_PATH`: Database file path (required for env loading)
//! - `UNICAL_DB_POOL_SIZE`: Connection pool size
//! - `UNICAL_SYNC_ENABLED`: Whether periodic sync is enabled (true/false)
//! - `UNICAL_SYNC_CRON`: Cron expression for periodic sync
//! - `UNICAL_SYNC_PAGE_SIZE`: Remote page size (1..=2500)
//! - `UNICAL_SYNC_MAX_CONCURRENT`: Accounts synced in parallel
//! - `UNICAL_TIMEZONE`: IANA timezone anchoring all-day events
//! - `UNICAL_GOOGLE_CLIENT_ID` / `UNICAL_GOOGLE_CLIENT_SECRET`
//! - `UNICAL_MICROSOFT_CLIENT_ID` / `UNICAL_MICROSOFT_CLIENT_SECRET`
//! - `UNICAL_LOG_FILTER`: Default tracing filter
//! - `UNICAL_LOG_JSON`: Emit JSON logs (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.toml`, `./config.json`, `./unical.toml` (current directory)
//! 2. `../config.toml` or `../config.json` (parent directory)
//! 3. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use unical_domain::{Config, Result, UnicalError};

const CONFIG_PATH_VAR: &str = "UNICAL_CONFIG";
const CANDIDATE_NAMES: [&str; 5] =
    ["config.toml", "config.json", "unical.toml", "../config.toml", "../config.json"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `UnicalError::Config` if:
/// - An explicitly named file is missing or invalid
/// - An environment variable has an invalid value
/// - A probed file exists but cannot be parsed
pub fn load() -> Result<Config> {
    if let Some(path) = std::env::var_os(CONFIG_PATH_VAR) {
        return load_from_file(Some(PathBuf::from(path)));
    }

    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            match probe_config_paths() {
                Some(path) => load_from_file(Some(path)),
                None => {
                    tracing::warn!("No config file found, using defaults");
                    Ok(Config::default())
                }
            }
        }
    }
}

/// Load configuration from environment variables
///
/// `UNICAL_DB_PATH` must be present; every other variable is optional and
/// overrides the corresponding default.
///
/// # Errors
/// Returns `UnicalError::Config` if `UNICAL_DB_PATH` is missing or a
/// variable has an invalid value.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();
    config.database.path = env_var("UNICAL_DB_PATH")?;

    if let Some(pool_size) = env_parse::<u32>("UNICAL_DB_POOL_SIZE")? {
        config.database.pool_size = pool_size;
    }
    config.sync.enabled = env_bool("UNICAL_SYNC_ENABLED", config.sync.enabled);
    if let Some(cron) = env_opt("UNICAL_SYNC_CRON") {
        config.sync.cron_expression = cron;
    }
    if let Some(page_size) = env_parse::<u32>("UNICAL_SYNC_PAGE_SIZE")? {
        config.sync.page_size = page_size;
    }
    if let Some(max) = env_parse::<usize>("UNICAL_SYNC_MAX_CONCURRENT")? {
        config.sync.max_concurrent_accounts = max;
    }
    if let Some(timezone) = env_opt("UNICAL_TIMEZONE") {
        config.timezone = Some(timezone);
    }

    config.google.client_id = env_opt("UNICAL_GOOGLE_CLIENT_ID");
    config.google.client_secret = env_opt("UNICAL_GOOGLE_CLIENT_SECRET");
    config.microsoft.client_id = env_opt("UNICAL_MICROSOFT_CLIENT_ID");
    config.microsoft.client_secret = env_opt("UNICAL_MICROSOFT_CLIENT_SECRET");

    if let Some(filter) = env_opt("UNICAL_LOG_FILTER") {
        config.logging.filter = filter;
    }
    config.logging.json = env_bool("UNICAL_LOG_JSON", config.logging.json);

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `UnicalError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(UnicalError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            UnicalError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| UnicalError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| UnicalError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| UnicalError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(UnicalError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd);
    }
    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
        roots.push(exe_dir);
    }

    roots
        .iter()
        .flat_map(|root| CANDIDATE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    env_opt(key)
        .ok_or_else(|| UnicalError::Config(format!("Missing required environment variable: {key}")))
}

/// Non-empty environment variable, if set.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| UnicalError::Config(format!("Invalid {key}: {e}")))
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use tempfile::{Builder, NamedTempFile};
    use unical_domain::Provider;

    use super::*;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ENV_KEYS: [&str; 6] = [
        "UNICAL_DB_PATH",
        "UNICAL_DB_POOL_SIZE",
        "UNICAL_SYNC_CRON",
        "UNICAL_SYNC_PAGE_SIZE",
        "UNICAL_TIMEZONE",
        "UNICAL_LOG_JSON",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_env_bool_parsing() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        std::env::set_var("UNICAL_TEST_BOOL_YES", "yes");
        std::env::set_var("UNICAL_TEST_BOOL_UPPER", "TRUE");
        std::env::set_var("UNICAL_TEST_BOOL_OFF", "off");

        assert!(env_bool("UNICAL_TEST_BOOL_YES", false));
        assert!(env_bool("UNICAL_TEST_BOOL_UPPER", false));
        assert!(!env_bool("UNICAL_TEST_BOOL_OFF", true));

        std::env::remove_var("UNICAL_TEST_BOOL_MISSING");
        assert!(env_bool("UNICAL_TEST_BOOL_MISSING", true));

        std::env::remove_var("UNICAL_TEST_BOOL_YES");
        std::env::remove_var("UNICAL_TEST_BOOL_UPPER");
        std::env::remove_var("UNICAL_TEST_BOOL_OFF");
    }

    #[test]
    fn test_load_from_env_overrides_defaults() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("UNICAL_DB_PATH", "/tmp/unical-test.db");
        std::env::set_var("UNICAL_DB_POOL_SIZE", "2");
        std::env::set_var("UNICAL_SYNC_CRON", "0 */5 * * * *");
        std::env::set_var("UNICAL_TIMEZONE", "Europe/Berlin");
        std::env::set_var("UNICAL_LOG_JSON", "1");

        let config = load_from_env().expect("config from env");
        assert_eq!(config.database.path, "/tmp/unical-test.db");
        assert_eq!(config.database.pool_size, 2);
        assert_eq!(config.sync.cron_expression, "0 */5 * * * *");
        assert_eq!(config.sync.page_size, 2500);
        assert_eq!(config.timezone.as_deref(), Some("Europe/Berlin"));
        assert!(config.logging.json);

        clear_env();
    }

    #[test]
    fn test_load_from_env_missing_db_path() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, UnicalError::Config(_)), "Should be a Config error");
    }

    #[test]
    fn test_load_from_env_invalid_number() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("UNICAL_DB_PATH", "/tmp/test.db");
        std::env::set_var("UNICAL_SYNC_PAGE_SIZE", "lots");

        let err = load_from_env().unwrap_err();
        assert!(err.to_string().contains("UNICAL_SYNC_PAGE_SIZE"));

        clear_env();
    }

    #[test]
    fn test_load_from_file_toml() {
        let mut file = Builder::new().suffix(".toml").tempfile().expect("temp file");
        write!(
            file,
            r#"
timezone = "America/New_York"

[database]
path = "events.db"

[sync]
backfill_months = 6

[[credentials]]
email = "Jane@Example.com"
provider = "microsoft"
refresh_token = "rt"
"#
        )
        .expect("write config");

        let config = load_from_file(Some(file.path().to_path_buf())).expect("config loaded");
        assert_eq!(config.database.path, "events.db");
        assert_eq!(config.sync.backfill_months, 6);
        assert_eq!(config.sync.safety_past_days, 7);
        assert_eq!(config.credentials.len(), 1);
        assert_eq!(config.credentials[0].provider, Provider::Outlook);
        assert_eq!(config.credentials[0].refresh_token.as_deref(), Some("rt"));
    }

    #[test]
    fn test_load_from_file_json() {
        let mut file = Builder::new().suffix(".json").tempfile().expect("temp file");
        write!(file, r#"{{"database": {{"path": "json.db", "pool_size": 8}}}}"#)
            .expect("write config");

        let config = load_from_file(Some(file.path().to_path_buf())).expect("config loaded");
        assert_eq!(config.database.path, "json.db");
        assert_eq!(config.database.pool_size, 8);
    }

    #[test]
    fn test_load_from_file_invalid_format() {
        let mut file = Builder::new().suffix(".toml").tempfile().expect("temp file");
        write!(file, "[database\npath = ").expect("write config");

        let err = load_from_file(Some(file.path().to_path_buf())).unwrap_err();
        assert!(err.to_string().contains("TOML"));
    }

    #[test]
    fn test_unsupported_extension() {
        let file = NamedTempFile::new().expect("temp file");
        let path = file.path().with_extension("yaml");
        let err = parse_config("a: 1", &path).unwrap_err();
        assert!(err.to_string().contains("Unsupported"));
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = load_from_file(Some(PathBuf::from("/nonexistent/unical.toml"))).unwrap_err();
        assert!(matches!(err, UnicalError::Config(_)));
    }
}
