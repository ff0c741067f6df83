//! Error types shared across the application.

use thiserror::Error;

/// Top-level application error
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("External service error: {0}")]
    ExternalService(#[from] ExternalServiceError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Not supported: {0}")]
    NotSupported(String),
}

/// Persistence failures
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// The row moved past the state the write expected
    #[error("Stale write: {0}")]
    StaleWrite(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Corrupt row: {0}")]
    Decode(String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound("row not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Self::Duplicate(db_err.message().to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Connection(err.to_string())
            }
            other => Self::Query(other.to_string()),
        }
    }
}

/// Failures reported by the wallet service
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Wallet service unreachable: {0}")]
    Connection(String),

    #[error("Transfer rejected: {0}")]
    Rejected(String),

    #[error("Status query failed: {0}")]
    StatusQuery(String),

    #[error("Could not resolve wallet for user {0}")]
    ResolutionFailed(String),

    #[error("Wallet service timed out: {0}")]
    Timeout(String),
}

impl From<reqwest::Error> for WalletError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else {
            Self::Rejected(err.to_string())
        }
    }
}

/// Failures of auxiliary HTTP collaborators (notifications)
#[derive(Debug, Error)]
pub enum ExternalServiceError {
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Service timed out: {0}")]
    Timeout(String),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ExternalServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else {
            Self::Unavailable(err.to_string())
        }
    }
}

/// Input validation failures
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("{0}")]
    Multiple(String),
}

/// Configuration failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(ValidationError::Multiple(errors.to_string()))
    }
}

impl AppError {
    /// Failures that will repeat on every retry with the same input
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_)
                | AppError::Config(_)
                | AppError::NotSupported(_)
                | AppError::Wallet(WalletError::Rejected(_))
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}
