use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tokio_postgres::error::SqlState;

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or malformed caller input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown login or wrong password. Deliberately carries no detail.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Missing, unknown, revoked or expired session token.
    #[error("Not authenticated")]
    Unauthenticated,

    /// The session is valid but its owning user no longer exists.
    #[error("Profile not found")]
    ProfileNotFound,

    /// A backing store could not be reached.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A database error.
    #[error("Database error: {0}")]
    Database(tokio_postgres::Error),

    /// A Redis error.
    #[error("Redis error: {0}")]
    Redis(redis::RedisError),

    /// A row was missing an expected column.
    #[error("Missing data: {0}")]
    MissingData(String),

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// The HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::ProfileNotFound => StatusCode::NOT_FOUND,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_)
            | AppError::Redis(_)
            | AppError::MissingData(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<deadpool_postgres::PoolError> for AppError {
    fn from(e: deadpool_postgres::PoolError) -> Self {
        AppError::StoreUnavailable(e.to_string())
    }
}

impl From<tokio_postgres::Error> for AppError {
    fn from(e: tokio_postgres::Error) -> Self {
        if e.is_closed() {
            AppError::StoreUnavailable(e.to_string())
        } else if e.code() == Some(&SqlState::UNDEFINED_TABLE) {
            // Schema setup has not finished yet.
            AppError::StoreUnavailable(e.to_string())
        } else {
            AppError::Database(e)
        }
    }
}

impl From<redis::RedisError> for AppError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout() {
            AppError::StoreUnavailable(e.to_string())
        } else {
            AppError::Redis(e)
        }
    }
}

impl From<garde::Report> for AppError {
    fn from(report: garde::Report) -> Self {
        tracing::debug!("Request validation failed: {}", report);
        AppError::Validation("Login and password are required".to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected request body: {}", rejection.body_text());
        AppError::Validation("Invalid request body".to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::Validation(ref msg) => {
                tracing::debug!("Validation error: {}", msg);
                msg.clone()
            }

            AppError::InvalidCredentials => {
                tracing::warn!("Authentication failed");
                "Invalid credentials".to_string()
            }

            AppError::Unauthenticated => {
                tracing::debug!("Request without a live session");
                "Not authenticated".to_string()
            }

            AppError::ProfileNotFound => {
                tracing::warn!("Session owner has no profile");
                "Profile not found".to_string()
            }

            AppError::StoreUnavailable(ref msg) => {
                tracing::error!("Store unavailable: {}", msg);
                "Service unavailable".to_string()
            }

            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                "Internal server error".to_string()
            }

            AppError::Redis(ref e) => {
                tracing::error!("Redis error: {}", e);
                "Internal server error".to_string()
            }

            AppError::MissingData(ref column) => {
                tracing::error!("Missing column in row: {}", column);
                "Internal server error".to_string()
            }

            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
        };

        let body = sonic_rs::to_string(&sonic_rs::json!({
            "error": message
        }))
        .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string());

        (status, [(axum::http::header::CONTENT_TYPE, "application/json")], body).into_response()
    }
}
