//! Error types for accounting API queries

/// Errors from the query endpoint.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The access token was rejected (expired or revoked).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The API returned a Fault (invalid query, throttling, server error).
    #[error("query fault ({status}): {message}")]
    Fault { status: u16, message: String },

    #[error("invalid query response: {0}")]
    Decode(String),

    #[error("invalid API base URL: {0}")]
    Url(String),
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
