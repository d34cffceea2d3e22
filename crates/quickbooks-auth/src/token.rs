//! OAuth token endpoint interactions
//!
//! Two grants POST to the same endpoint:
//! 1. `authorization_code` when `/callback` completes the consent flow
//! 2. `refresh_token` whenever a report request needs an access token
//!
//! Client credentials travel in the form body alongside the grant.

use std::fmt;

use common::Secret;
use reqwest::header::ACCEPT;
use serde::Deserialize;

use crate::constants::DEFAULT_EXPIRES_IN_SECS;
use crate::error::{Error, Result};
use crate::oauth::OAuthConfig;

/// Response from the token endpoint for both grants.
///
/// `refresh_token` is optional in OAuth2; when absent the caller keeps using
/// the refresh token it already has. `expires_in` is a delta in seconds.
#[derive(Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
    /// Seconds until the refresh token itself expires (Intuit extension)
    #[serde(default)]
    pub x_refresh_token_expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

fn default_expires_in() -> u64 {
    DEFAULT_EXPIRES_IN_SECS
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_in", &self.expires_in)
            .field("x_refresh_token_expires_in", &self.x_refresh_token_expires_in)
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Short-lived bearer credential. Lives in memory only and is used for a
/// single report; the next report exchanges the refresh token again.
#[derive(Debug, Clone)]
pub struct AccessToken {
    value: Secret<String>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: Secret::new(value.into()),
        }
    }

    pub fn from_response(response: &TokenResponse) -> Self {
        Self::new(response.access_token.clone())
    }

    /// The bearer value for the `Authorization` header.
    pub fn secret(&self) -> &str {
        self.value.expose()
    }
}

/// Exchange an authorization code for tokens.
///
/// `redirect_uri` must match the one used to build the authorization URL.
pub async fn exchange_code(
    client: &reqwest::Client,
    config: &OAuthConfig,
    code: &str,
) -> Result<TokenResponse> {
    post_token(
        client,
        config,
        &[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", config.redirect_url.as_str()),
        ],
        "code exchange",
    )
    .await
}

/// Exchange a refresh token for a new access token.
///
/// The response may carry a different refresh token; once it does, the old
/// one is dead at the provider.
pub async fn refresh_token(
    client: &reqwest::Client,
    config: &OAuthConfig,
    refresh: &str,
) -> Result<TokenResponse> {
    post_token(
        client,
        config,
        &[("grant_type", "refresh_token"), ("refresh_token", refresh)],
        "token refresh",
    )
    .await
}

async fn post_token(
    client: &reqwest::Client,
    config: &OAuthConfig,
    grant: &[(&str, &str)],
    operation: &str,
) -> Result<TokenResponse> {
    let mut form = grant.to_vec();
    form.push(("client_id", config.client_id.as_str()));
    form.push(("client_secret", config.client_secret.expose().as_str()));

    let response = client
        .post(&config.token_url)
        .header(ACCEPT, "application/json")
        .form(&form)
        .send()
        .await
        .map_err(|e| Error::Http(format!("{operation} request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));

        // invalid_grant covers revoked, expired and already-rotated tokens
        let rejected = status.as_u16() == 401
            || status.as_u16() == 403
            || oauth_error_code(&body).as_deref() == Some("invalid_grant");
        if rejected {
            return Err(Error::InvalidCredentials(format!(
                "{operation} rejected ({status}): {body}"
            )));
        }

        return Err(Error::TokenExchange(format!(
            "{operation} returned {status}: {body}"
        )));
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| Error::TokenExchange(format!("invalid {operation} response: {e}")))
}

/// Extract the RFC 6749 `error` code from a JSON error body.
fn oauth_error_code(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value.get("error")?.as_str().map(str::to_owned)
}
