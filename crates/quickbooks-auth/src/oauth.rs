//! OAuth2 client configuration
//!
//! Holds the static app credentials and endpoints. Built once at startup and
//! shared read-only by the token source and the `/login` handler.

use common::Secret;
use reqwest::Url;

use crate::constants::{ACCOUNTING_SCOPE, AUTHORIZE_ENDPOINT, CALLBACK_PATH, TOKEN_ENDPOINT};
use crate::error::{Error, Result};

/// App credentials and endpoints for the authorization-code flow.
///
/// Client credentials are sent as form parameters in the token request
/// body, never as a Basic authorization header.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub redirect_url: String,
    pub scopes: Vec<String>,
    pub auth_url: String,
    pub token_url: String,
}

impl OAuthConfig {
    /// Configuration against Intuit's production endpoints with the
    /// accounting scope. The redirect URL is `<callback_base_url>/callback`.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: Secret<String>,
        callback_base_url: &str,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
            redirect_url: format!(
                "{}{}",
                callback_base_url.trim_end_matches('/'),
                CALLBACK_PATH
            ),
            scopes: vec![ACCOUNTING_SCOPE.to_string()],
            auth_url: AUTHORIZE_ENDPOINT.to_string(),
            token_url: TOKEN_ENDPOINT.to_string(),
        }
    }

    /// Point the token endpoint somewhere else (sandbox tooling, tests).
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// Build the URL the user is sent to for consent.
    ///
    /// `state` is returned unchanged by the provider on the callback.
    pub fn authorization_url(&self, state: &str) -> Result<String> {
        let scope = self.scopes.join(" ");
        let url = Url::parse_with_params(
            &self.auth_url,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_url.as_str()),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("state", state),
            ],
        )
        .map_err(|e| Error::Config(format!("auth url {}: {e}", self.auth_url)))?;
        Ok(url.into())
    }
}
