//! Error types for the background job layer.

use thiserror::Error;

/// Result type alias for job operations.
pub type JobResult<T> = Result<T, JobError>;

/// Errors from enqueueing or executing jobs.
#[derive(Debug, Error)]
pub enum JobError {
    /// Job payload could not be serialized or deserialized.
    #[error("job payload error: {0}")]
    Payload(#[from] serde_json::Error),

    /// A queue row carries a kind this worker does not know.
    #[error("unknown job kind: {0}")]
    UnknownKind(String),

    /// Underlying database failure.
    #[error(transparent)]
    Db(#[from] roomline_db::DbError),

    /// Worker control channel closed.
    #[error("worker channel closed")]
    ChannelClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = JobError::UnknownKind("frobnicate".to_string());
        assert_eq!(err.to_string(), "unknown job kind: frobnicate");
    }
}
