//! Error types for member lifecycle operations

use cloud_api::ApiError;

/// Errors from member lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Desired configuration rejected before any remote call.
    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("cannot get task with ID: {task_id}: {source}")]
    TaskFetch {
        task_id: String,
        #[source]
        source: ApiError,
    },

    #[error("task {task_id} finished with error: {detail}")]
    TaskFailed { task_id: String, detail: String },

    #[error(
        "timed out after {timeout_secs}s waiting for task {task_id}{}",
        .last_pending.as_deref().map(|p| format!(" ({p})")).unwrap_or_default()
    )]
    Timeout {
        task_id: String,
        timeout_secs: u64,
        /// Detail of the last not-ready extraction, if the task itself had finished.
        last_pending: Option<String>,
    },

    #[error("cannot retrieve {what} from task {task_id}: {reason}; task: {raw}")]
    Extraction {
        task_id: String,
        what: &'static str,
        reason: String,
        raw: String,
    },

    /// Extraction outcome meaning "poll again"; the poller never returns it.
    #[error("not ready: {0}")]
    NotReady(String),

    #[error("{operation} returned no task")]
    NoTask { operation: &'static str },

    #[error("member {member_id} not found in pool {pool_id}")]
    MemberMissing { pool_id: String, member_id: String },

    #[error("{operation} requires a member ID, but the member was never created")]
    NoIdentity { operation: &'static str },

    #[error("invalid import ID {id:?}: {reason}")]
    Import { id: String, reason: String },
}

impl Error {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Error::Validation {
            field,
            message: message.into(),
        }
    }
}

/// Result alias for lifecycle operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_includes_pending_detail() {
        let err = Error::Timeout {
            task_id: "t-1".into(),
            timeout_secs: 60,
            last_pending: Some("pool member m-1 still exists".into()),
        };
        assert_eq!(
            err.to_string(),
            "timed out after 60s waiting for task t-1 (pool member m-1 still exists)"
        );

        let err = Error::Timeout {
            task_id: "t-1".into(),
            timeout_secs: 60,
            last_pending: None,
        };
        assert_eq!(err.to_string(), "timed out after 60s waiting for task t-1");
    }

    #[test]
    fn api_errors_pass_through_verbatim() {
        let err: Error = ApiError::Transport("connection reset".into()).into();
        assert_eq!(err.to_string(), "HTTP request failed: connection reset");
    }

    #[test]
    fn validation_names_the_field() {
        let err = Error::validation("address", "\"not-an-ip\" is not a valid IP address");
        assert!(err.to_string().starts_with("invalid address:"), "got: {err}");
    }
}
