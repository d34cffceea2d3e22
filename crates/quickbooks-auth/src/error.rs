//! Error types for token storage and OAuth exchanges

/// Errors from the token store and the token endpoint.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    /// The provider rejected the refresh token or authorization code
    /// (revoked, expired or already used).
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("invalid OAuth configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),

    /// The token store holds no refresh token.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
