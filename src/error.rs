//! Error taxonomy for the proxy layer.
//!
//! Every failure that can reach an inbound caller is a [`ProxyError`]. Each
//! variant knows the HTTP status it maps to, and the axum integration renders
//! it as `{ "error": { "status", "message" } }`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, ProxyError>;

#[derive(Debug, Error)]
pub enum ProxyError {
    /// A protected resource was requested without a caller bearer token.
    #[error("User token required for {resource}")]
    MissingUserCredential { resource: String },

    /// Self-scoped endpoints must be called directly with the user's token.
    #[error("Use user token for /{path} endpoints")]
    SelfScopedPath { path: String },

    /// The client-credentials exchange failed.
    #[error("Client credentials token error: {0}")]
    UpstreamAuth(String),

    /// Throttling persisted past the retry budget.
    #[error("Rate limit still active on {path} after {attempts} attempts")]
    RateLimitExhausted { path: String, attempts: u32 },

    #[error("{0} not found")]
    NotFound(String),

    /// Any other non-success upstream response.
    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error("{0}")]
    BadRequest(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The scheduler worker is gone; only happens during shutdown.
    #[error("Request queue closed")]
    QueueClosed,
}

impl ProxyError {
    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// HTTP status mirrored back to the inbound caller.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingUserCredential { .. } => StatusCode::UNAUTHORIZED,
            Self::SelfScopedPath { .. } | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimitExhausted { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::Http(_) => StatusCode::BAD_GATEWAY,
            Self::UpstreamAuth(_)
            | Self::Json(_)
            | Self::Io(_)
            | Self::Config(_)
            | Self::QueueClosed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({
            "error": {
                "status": status.as_u16(),
                "message": self.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}
