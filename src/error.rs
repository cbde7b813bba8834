//! Error types for RustRoom
//!
//! Transport failures arrive as [`HttpError`] and are converted into
//! `AppError`, the single error type the rest of the crate returns.

use thiserror::Error;

use crate::http::{HttpError, HttpErrorKind};

/// Application-wide error type
///
/// This enum represents every failure a screen service can observe.
/// Nothing here is fatal to the process; see [`AppError::is_retriable`].
#[derive(Debug, Error)]
pub enum AppError {
    /// No connectivity, DNS or other transport failure
    #[error("Network error: {0}")]
    Network(String),

    /// The transport gave up waiting for the server
    #[error("Request timed out")]
    Timeout,

    /// Non-2xx response with the server-provided message
    #[error("Server error ({status}): {message}")]
    Http { status: u16, message: String },

    /// Response body was not the JSON shape the endpoint promises
    #[error("Invalid response: {0}")]
    Parse(String),

    /// Client-side precondition failed before any network call
    #[error("Validation error: {0}")]
    Validation(String),

    /// The endpoint needs a session and none is signed in
    #[error("Authentication required")]
    Unauthorized,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether re-attempting the same action can succeed
    ///
    /// Validation and configuration failures need a different input first.
    pub fn is_retriable(&self) -> bool {
        !matches!(self, AppError::Validation(_) | AppError::Config(_))
    }

    /// Short text suitable for an inline error row or a toast
    pub fn user_message(&self) -> String {
        match self {
            AppError::Network(_) => "No connection. Check your network and try again.".to_string(),
            AppError::Timeout => "The server took too long to respond.".to_string(),
            AppError::Http { message, .. } => message.clone(),
            AppError::Parse(_) => "Received an unexpected response from the server.".to_string(),
            AppError::Validation(message) => message.clone(),
            AppError::Unauthorized => "Please sign in to continue.".to_string(),
            AppError::Config(_) | AppError::Internal(_) => "Something went wrong.".to_string(),
        }
    }
}

impl From<HttpError> for AppError {
    fn from(err: HttpError) -> Self {
        match err.kind {
            HttpErrorKind::Network => AppError::Network(err.message),
            HttpErrorKind::Timeout => AppError::Timeout,
            HttpErrorKind::ServerError => match err.status {
                Some(401) => AppError::Unauthorized,
                Some(status) => AppError::Http {
                    status,
                    message: err.message,
                },
                None => AppError::Network(err.message),
            },
            HttpErrorKind::ParseError => AppError::Parse(err.message),
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
