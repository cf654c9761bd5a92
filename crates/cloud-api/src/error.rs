//! Error types for remote API calls
//!
//! The variant is the error kind: callers branch on `ApiError::NotFound` or
//! `ApiError::Conflict` directly instead of inspecting messages.

/// Errors from remote API calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The addressed pool, member or task does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Another structural change to the same pool is in flight.
    #[error("conflicting operation: {0}")]
    Conflict(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("unexpected status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("invalid response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ApiError::Conflict(_))
    }
}

/// Result alias for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Body fragments the control plane uses when it rejects a change because the
/// pool is busy with another one. Some deployments answer 400 instead of 409.
const CONFLICT_PATTERNS: &[&str] = &[
    "conflicting operation",
    "already in progress",
    "another operation",
    "pending_update",
    "pending_create",
    "pending_delete",
];

/// Classify a non-success response into an `ApiError`.
///
/// 404 is NotFound, 409 is Conflict, 401/403 are Unauthorized. A 400 or 422
/// whose body matches a known "busy" phrase is also a Conflict; everything else
/// keeps its status.
pub fn classify_status(status: u16, body: &str, message: String) -> ApiError {
    match status {
        404 => ApiError::NotFound(message),
        409 => ApiError::Conflict(message),
        401 | 403 => ApiError::Unauthorized(message),
        400 | 422 if mentions_conflict(body) => ApiError::Conflict(message),
        _ => ApiError::Status { status, message },
    }
}

fn mentions_conflict(body: &str) -> bool {
    let lower = body.to_lowercase();
    CONFLICT_PATTERNS.iter().any(|p| lower.contains(p))
}
