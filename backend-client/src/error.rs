use thiserror::Error;

/// Failures surfaced by the backend client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network-level failure before a response arrived.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status with whatever body came back.
    #[error("request failed: {status} - {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The refresh exchange failed or the retried request was rejected
    /// again; the session has been torn down.
    #[error("session expired")]
    SessionExpired,

    /// Token storage failure.
    #[error("token storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Response body did not match the expected shape.
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}
