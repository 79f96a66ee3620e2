//! Conversions from external infrastructure errors into domain errors.

use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;
use serde_json::Error as JsonError;
use unical_common::StorageError;
use unical_domain::UnicalError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub UnicalError);

impl From<InfraError> for UnicalError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<UnicalError> for InfraError {
    fn from(value: UnicalError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoUnicalError {
    fn into_unical(self) -> UnicalError;
}

/// Map an HTTP status to the domain error taxonomy.
///
/// 401/403 are auth failures, 404 is not-found, 429 and 5xx are retryable
/// network errors and any other 4xx is treated as a bad request.
pub fn status_error(code: u16, detail: &str) -> UnicalError {
    let message = if detail.is_empty() { format!("HTTP {code}") } else { format!("HTTP {code}: {detail}") };

    match code {
        401 | 403 => UnicalError::Auth(message),
        404 => UnicalError::NotFound(message),
        429 => UnicalError::Network(message),
        400..=499 => UnicalError::InvalidInput(message),
        _ => UnicalError::Network(message),
    }
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → UnicalError */
/* -------------------------------------------------------------------------- */

impl IntoUnicalError for SqlError {
    fn into_unical(self) -> UnicalError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => UnicalError::Database("database is busy".into()),
                    (ErrorCode::DatabaseLocked, _) => {
                        UnicalError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067) => {
                        UnicalError::Database("unique constraint violation".into())
                    }
                    (ErrorCode::ConstraintViolation, 787) => {
                        UnicalError::Database("foreign key constraint violation".into())
                    }
                    _ => UnicalError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => UnicalError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                UnicalError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                UnicalError::Database(format!("invalid column type: {ty}"))
            }
            RE::Utf8Error(_) => UnicalError::Database("invalid UTF-8 returned from sqlite".into()),
            RE::InvalidPath(path) => UnicalError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => UnicalError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_unical())
    }
}

/* -------------------------------------------------------------------------- */
/* StorageError → UnicalError */
/* -------------------------------------------------------------------------- */

impl IntoUnicalError for StorageError {
    fn into_unical(self) -> UnicalError {
        match self {
            StorageError::Rusqlite(err) => err.into_unical(),
            StorageError::InvalidConfig(msg) => UnicalError::Config(msg),
            StorageError::Timeout(secs) => {
                UnicalError::Database(format!("connection checkout timed out after {secs}s"))
            }
            other => UnicalError::Database(other.to_string()),
        }
    }
}

impl From<StorageError> for InfraError {
    fn from(value: StorageError) -> Self {
        InfraError(value.into_unical())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → UnicalError */
/* -------------------------------------------------------------------------- */

impl IntoUnicalError for HttpError {
    fn into_unical(self) -> UnicalError {
        if self.is_timeout() {
            return UnicalError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return UnicalError::Network("HTTP connection failure".into());
        }

        if self.is_decode() {
            return UnicalError::Decode(self.to_string());
        }

        if let Some(status) = self.status() {
            return status_error(status.as_u16(), status.canonical_reason().unwrap_or(""));
        }

        UnicalError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_unical())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → UnicalError */
/* -------------------------------------------------------------------------- */

impl IntoUnicalError for JsonError {
    fn into_unical(self) -> UnicalError {
        UnicalError::Decode(format!("unexpected response body: {self}"))
    }
}

impl From<JsonError> for InfraError {
    fn from(value: JsonError) -> Self {
        InfraError(value.into_unical())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
