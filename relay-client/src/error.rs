//! Error types for the Relay clients

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Task platform error codes meaning the session is no longer usable
const AUTH_ERROR_CODES: [u32; 3] = [1000, 10002, 10003];

/// Task platform error codes meaning a memory or quota limit was hit
const MEMORY_LIMIT_ERROR_CODES: [u32; 4] = [100005, 100007, 100008, 310004];

/// Errors that can occur when using the Relay clients
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Task platform returned a structured error
    #[error("Platform error {code} {title} (status {status}): {detail}")]
    Platform {
        status: u16,
        code: u32,
        title: String,
        detail: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(String),

    /// A queue-side job (e.g. an ingest) ended without a result
    #[error("Job {job_id} failed: {message}")]
    JobFailed { job_id: String, message: String },
}

impl ClientError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    fn status(&self) -> Option<u16> {
        match self {
            Self::ApiError { status, .. } | Self::Platform { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_)) || self.status() == Some(404)
    }

    /// Check if this error is a client error (4xx status)
    pub fn is_client_error(&self) -> bool {
        matches!(self.status(), Some(status) if (400..500).contains(&status))
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self.status(), Some(status) if status >= 500)
    }

    /// Check if the credentials behind the request are expired or rejected
    pub fn is_auth_error(&self) -> bool {
        match self {
            Self::Platform { code, .. } if AUTH_ERROR_CODES.contains(code) => true,
            _ => matches!(self.status(), Some(401 | 403)),
        }
    }

    /// Check if the task platform refused work for lack of memory or quota
    pub fn is_memory_limit_error(&self) -> bool {
        matches!(self, Self::Platform { code, .. } if MEMORY_LIMIT_ERROR_CODES.contains(code))
    }
}
