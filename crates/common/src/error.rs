//! Configuration error type shared by the service and its libraries

use thiserror::Error;

/// Startup and configuration errors. All variants are fatal: the process
/// stops before the server begins listening.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("missing required environment variable {0}")]
    MissingVar(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result alias using common Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_var_names_the_variable() {
        let err = Error::MissingVar("QUICKBOOKS_REALM_ID".into());
        assert_eq!(
            err.to_string(),
            "missing required environment variable QUICKBOOKS_REALM_ID"
        );
    }

    #[test]
    fn io_error_converts_with_prefix() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: Error = io.into();
        assert!(err.to_string().starts_with("I/O error:"), "got: {err}");
    }

    #[test]
    fn toml_error_converts() {
        let parse = toml::from_str::<toml::Table>("not = valid = toml").unwrap_err();
        let err: Error = parse.into();
        assert!(matches!(err, Error::Toml(_)));
    }
}
