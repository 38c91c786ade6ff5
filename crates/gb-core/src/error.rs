//! # AppError
//!
//! Centralized error handling for the Gripe Box ecosystem.
//! Maps store, auth and validation failures to actionable error types.

use thiserror::Error;

/// The primary error type for all gb-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., Complaint)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Validation failure (e.g., empty subject, missing OAuth code)
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Durable write, rename or parse of the data file failed
    #[error("persistence failure: {0}")]
    Persistence(#[from] std::io::Error),

    /// The OAuth provider rejected the exchange or the identity lookup
    #[error("external auth failure: {0}")]
    ExternalAuth(String),

    /// OAuth state parameter is missing, unknown, expired or already used
    #[error("invalid or expired login state")]
    InvalidState,

    /// Security/Auth failure (e.g., email outside the allowed domain, not an admin)
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Infrastructure failure (e.g., template rendering, entropy source)
    #[error("internal service error: {0}")]
    Internal(String),

    /// Rate limit exceeded
    #[error("too many requests: {0}")]
    RateLimitExceeded(String),
}

impl AppError {
    pub fn complaint_not_found(id: u64) -> Self {
        AppError::NotFound("Complaint".to_string(), id.to_string())
    }
}

/// A specialized Result type for Gripe Box logic.
pub type Result<T> = std::result::Result<T, AppError>;
