//! QuickBooks Online OAuth2 support
//!
//! Authorization URL construction, code exchange, refresh token exchange and
//! refresh token persistence for the report service. The crate has no
//! dependency on the server binary and is tested on its own against an
//! in-process token endpoint.
//!
//! Token lifecycle:
//! 1. `/login` redirects to `OAuthConfig::authorization_url()`
//! 2. `/callback` calls `token::exchange_code()` and `TokenSource::install()`
//! 3. Each report request calls `TokenSource::access_token()`, which reads the
//!    refresh token from the `RefreshTokenStore`, exchanges it and
//!    persists a rotated refresh token before handing out the access token

pub mod constants;
pub mod error;
pub mod oauth;
pub mod source;
pub mod store;
pub mod token;

#[cfg(test)]
mod testing;

pub use constants::*;
pub use error::{Error, Result};
pub use oauth::OAuthConfig;
pub use source::TokenSource;
pub use store::{FileTokenStore, RefreshTokenStore, seed_if_empty};
pub use token::{AccessToken, TokenResponse, exchange_code, refresh_token};
