/// Unified error types for ThreadCraft
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum AppError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Embedded migration errors
    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Missing or invalid identity token
    #[error("Not authenticated: {0}")]
    NotAuthenticated(String),

    /// Not found errors (also used for rows owned by another user)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Input or AI output failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Debit larger than the current balance
    #[error("Insufficient credit: balance is {balance}, {required} required")]
    InsufficientCredit { balance: i64, required: i64 },

    /// Eligibility gate refused the request, carries the gate's message
    #[error("{0}")]
    NotEligible(String),

    /// Generative AI transport or protocol failure
    #[error("AI provider error: {0}")]
    Upstream(String),

    /// Generative AI returned no candidate text
    #[error("Empty response from the AI provider")]
    EmptyResponse,

    /// AI output could not be structured
    #[error("Failed to parse the AI response. The AI might have generated an invalid format.")]
    UnparsableResponse,

    /// Payment provider errors
    #[error("Billing error: {0}")]
    Billing(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Stable error code exposed to API clients
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotAuthenticated(_) => "AuthenticationRequired",
            AppError::NotFound(_) => "NotFound",
            AppError::Validation(_) => "InvalidRequest",
            AppError::InsufficientCredit { .. } => "InsufficientCredit",
            AppError::NotEligible(_) => "NotEligible",
            AppError::Upstream(_) => "UpstreamError",
            AppError::EmptyResponse => "EmptyResponse",
            AppError::UnparsableResponse => "UnparsableResponse",
            AppError::Billing(_) => "BillingError",
            AppError::Database(_)
            | AppError::Migration(_)
            | AppError::Config(_)
            | AppError::Internal(_)
            | AppError::Io(_) => "InternalServerError",
        }
    }

    /// Message safe to show to the end user
    pub fn public_message(&self) -> String {
        match self {
            AppError::Database(_)
            | AppError::Migration(_)
            | AppError::Config(_)
            | AppError::Internal(_)
            | AppError::Io(_) => "Internal server error".to_string(), // Don't leak details
            // Provider detail stays in the logs
            AppError::Upstream(_) => "AI provider error".to_string(),
            AppError::Billing(_) => "Billing provider error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// JSON error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl AppError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotAuthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InsufficientCredit { .. } | AppError::NotEligible(_) => {
                StatusCode::PAYMENT_REQUIRED
            }
            AppError::Upstream(_)
            | AppError::EmptyResponse
            | AppError::UnparsableResponse
            | AppError::Billing(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_)
            | AppError::Migration(_)
            | AppError::Config(_)
            | AppError::Internal(_)
            | AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convert AppError to HTTP response
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(ErrorResponse {
            error: self.code().to_string(),
            message: self.public_message(),
        });

        (status, body).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Result type alias for service operations
pub type AppResult<T> = Result<T, AppError>;
