use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, AppError>;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Closed error classification handed to the API layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal",
        }
    }
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Conflict(_) => ErrorKind::Conflict,
            AppError::Database(_)
            | AppError::Migration(_)
            | AppError::Config(_)
            | AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Classifies a database error raised by a write.
    ///
    /// Constraint violations and lost concurrency races become `Conflict` with
    /// the supplied message; everything else stays a `Database` error.
    pub fn from_db(err: sqlx::Error, conflict_message: impl FnOnce() -> String) -> Self {
        match sqlstate(&err).as_deref() {
            Some(UNIQUE_VIOLATION) | Some(FOREIGN_KEY_VIOLATION) => {
                AppError::Conflict(conflict_message())
            }
            Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED) => AppError::Conflict(
                "Concurrent modification detected; resubmit the request".to_string(),
            ),
            _ => AppError::Database(err),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match sqlstate(&err).as_deref() {
            Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED) => AppError::Conflict(
                "Concurrent modification detected; resubmit the request".to_string(),
            ),
            _ => AppError::Database(err),
        }
    }
}

fn sqlstate(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().map(|code| code.into_owned()),
        _ => None,
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let codes: Vec<String> = errs.iter().map(|e| e.code.to_string()).collect();
                format!("{}: {}", field, codes.join(", "))
            })
            .collect();
        messages.sort();
        AppError::Validation(messages.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_errors_are_internal() {
        let config = AppError::from(config::ConfigError::NotFound("database.url".to_string()));
        assert_eq!(config.kind(), ErrorKind::Internal);
        assert!(config.to_string().starts_with("Configuration error"));

        let migration = AppError::from(sqlx::migrate::MigrateError::VersionMissing(3));
        assert_eq!(migration.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(AppError::Validation("x".into()).kind(), ErrorKind::Validation);
        assert_eq!(AppError::NotFound("x".into()).kind(), ErrorKind::NotFound);
        assert_eq!(AppError::Conflict("x".into()).kind(), ErrorKind::Conflict);
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom")).kind(),
            ErrorKind::Internal
        );
        assert_eq!(
            AppError::Database(sqlx::Error::RowNotFound).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_from_db_keeps_non_constraint_errors() {
        let err = AppError::from_db(sqlx::Error::RowNotFound, || "unused".to_string());
        assert!(matches!(err, AppError::Database(sqlx::Error::RowNotFound)));
    }

    #[test]
    fn test_error_display() {
        let err = AppError::Conflict("Account code '1000' already exists".to_string());
        assert_eq!(
            err.to_string(),
            "Conflict: Account code '1000' already exists"
        );
    }

    #[test]
    fn test_error_kind_as_str() {
        assert_eq!(ErrorKind::NotFound.as_str(), "not_found");
        assert_eq!(ErrorKind::Conflict.as_str(), "conflict");
    }
}
