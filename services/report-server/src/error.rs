//! Report assembly errors
//!
//! Per-request validation failures (missing callback parameters) never become
//! Rust errors; the handler answers 400 directly.

use thiserror::Error;

/// Why a report could not be assembled. Every variant maps to an empty 500.
#[derive(Error, Debug)]
pub enum Error {
    /// No usable access token: empty store, store I/O, or the provider
    /// rejected the refresh token.
    #[error("unable to obtain access token: {0}")]
    Token(#[from] quickbooks_auth::Error),

    #[error("unable to fetch {entity}: {source}")]
    Fetch {
        entity: &'static str,
        #[source]
        source: quickbooks_client::Error,
    },
}

/// Result alias using service Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_names_the_entity() {
        let err = Error::Fetch {
            entity: "Purchase",
            source: quickbooks_client::Error::Http("connection refused".into()),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("unable to fetch Purchase"), "got {msg}");
        assert!(msg.contains("connection refused"), "got {msg}");
    }

    #[test]
    fn token_error_converts() {
        let err: Error = quickbooks_auth::Error::NotFound("empty".into()).into();
        assert!(matches!(err, Error::Token(quickbooks_auth::Error::NotFound(_))));
    }
}
