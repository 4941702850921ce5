//! Error types for the GitLab API client
//!
//! Every error produced after a round trip carries the [`ApiResponse`] so the
//! caller can inspect status code and headers even on failure.

use super::http::{error_message, ApiResponse};
use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when calling the GitLab API
#[derive(Debug, Error)]
pub enum ApiError {
    /// Group identifier was empty or otherwise unusable; no request was sent
    #[error("invalid group identifier: {0}")]
    InvalidIdentifier(String),

    /// Base URL or request path could not be turned into a URL
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Network failure, timeout, or request construction failure
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Status and headers arrived but reading the body failed; `body` is empty
    #[error("failed to read response body ({}): {source}", .response.status)]
    Body {
        response: Box<ApiResponse>,
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with a success status but a body we could not decode
    #[error("failed to parse response ({}): {source}", .response.status)]
    Decode {
        response: Box<ApiResponse>,
        #[source]
        source: serde_json::Error,
    },

    #[error("bad request: {message}")]
    BadRequest {
        message: String,
        response: Box<ApiResponse>,
    },

    #[error("unauthorized: {message}")]
    Unauthorized {
        message: String,
        response: Box<ApiResponse>,
    },

    #[error("forbidden: {message}")]
    Forbidden {
        message: String,
        response: Box<ApiResponse>,
    },

    #[error("not found: {message}")]
    NotFound {
        message: String,
        response: Box<ApiResponse>,
    },

    #[error("conflict: {message}")]
    Conflict {
        message: String,
        response: Box<ApiResponse>,
    },

    /// Payload rejected by the server (422)
    #[error("validation failed: {message}")]
    Validation {
        message: String,
        response: Box<ApiResponse>,
    },

    #[error("rate limit exceeded")]
    RateLimited { response: Box<ApiResponse> },

    /// Server error (5xx)
    #[error("server error ({}): {message}", .response.status)]
    Server {
        message: String,
        response: Box<ApiResponse>,
    },

    /// Any status the operation did not expect, including an unexpected success code
    #[error("unexpected status {}", .response.status)]
    UnexpectedStatus { response: Box<ApiResponse> },
}

/// Result type alias for GitLab API operations
pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// Classify a non-success response by its status code
    pub fn from_response(response: ApiResponse) -> Self {
        let message = error_message(&response.body);
        let response = Box::new(response);

        match response.status.as_u16() {
            400 => ApiError::BadRequest { message, response },
            401 => ApiError::Unauthorized { message, response },
            403 => ApiError::Forbidden { message, response },
            404 => ApiError::NotFound { message, response },
            409 => ApiError::Conflict { message, response },
            422 => ApiError::Validation { message, response },
            429 => ApiError::RateLimited { response },
            500..=599 => ApiError::Server { message, response },
            _ => ApiError::UnexpectedStatus { response },
        }
    }

    /// The server response, when a round trip took place
    pub fn response(&self) -> Option<&ApiResponse> {
        match self {
            ApiError::InvalidIdentifier(_) | ApiError::InvalidUrl(_) | ApiError::Transport(_) => {
                None
            }
            ApiError::Body { response, .. }
            | ApiError::Decode { response, .. }
            | ApiError::BadRequest { response, .. }
            | ApiError::Unauthorized { response, .. }
            | ApiError::Forbidden { response, .. }
            | ApiError::NotFound { response, .. }
            | ApiError::Conflict { response, .. }
            | ApiError::Validation { response, .. }
            | ApiError::RateLimited { response }
            | ApiError::Server { response, .. }
            | ApiError::UnexpectedStatus { response } => Some(&**response),
        }
    }

    /// HTTP status of the failed call, if any
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Transport(e) => e.status(),
            _ => self.response().map(|r| r.status),
        }
    }

    /// Whether the server rejected the request payload
    pub fn is_validation(&self) -> bool {
        matches!(self, ApiError::BadRequest { .. } | ApiError::Validation { .. })
    }
}

/// Format an API error for display
/// Keeps the message short and never echoes request details
pub fn format_api_error(error: &ApiError) -> String {
    match error {
        ApiError::InvalidIdentifier(id) => format!("Invalid group identifier '{}'.", id),
        ApiError::InvalidUrl(_) => "Invalid GitLab URL. Check --base-url or GITLAB_URL.".to_string(),
        ApiError::Transport(e) if e.is_timeout() => {
            "Request timed out. Check your network connection and try again.".to_string()
        }
        ApiError::Transport(_) => {
            "Request failed. Check your network connection and try again.".to_string()
        }
        ApiError::Body { response, .. } => format!(
            "Connection dropped while reading the response (status {}).",
            response.status
        ),
        ApiError::Decode { .. } => "Unexpected response from GitLab.".to_string(),
        ApiError::Unauthorized { .. } => {
            "Authentication failed. Set GITLAB_TOKEN or pass --token.".to_string()
        }
        ApiError::Forbidden { .. } => {
            "Permission denied. Maintainer access to the group is required.".to_string()
        }
        ApiError::NotFound { .. } => "Group or cluster not found.".to_string(),
        ApiError::Conflict { message, .. } => format!("Conflict: {}", message),
        ApiError::BadRequest { message, .. } | ApiError::Validation { message, .. } => {
            format!("Invalid request: {}", message)
        }
        ApiError::RateLimited { .. } => "Rate limit exceeded. Please try again later.".to_string(),
        ApiError::Server { .. } => {
            "GitLab service temporarily unavailable. Please try again.".to_string()
        }
        ApiError::UnexpectedStatus { response } => {
            format!("Unexpected response status {}.", response.status)
        }
    }
}
