//! Access token source with refresh token rotation
//!
//! Turns the stored refresh token into a usable access token. When the
//! provider rotates the refresh token during an exchange, the new value is
//! written to the store before the access token is handed out, so the old
//! value is never presented again.
//!
//! Every call exchanges the current refresh token; access tokens are not
//! kept between calls. One async lock is held across the whole
//! read → exchange → write sequence, so two concurrent report requests never
//! present the same refresh token to the provider, which would invalidate it
//! on first use and reject the second exchange.
//!
//! The sequence runs on its own task. A caller that is dropped mid-exchange
//! (client disconnect, timeout) stops waiting, but the rotation it started is
//! still persisted.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::oauth::OAuthConfig;
use crate::store::RefreshTokenStore;
use crate::token::{self, AccessToken, TokenResponse};

pub struct TokenSource {
    http: reqwest::Client,
    config: Arc<OAuthConfig>,
    store: Arc<dyn RefreshTokenStore>,
    refresh_lock: Arc<Mutex<()>>,
}

impl TokenSource {
    pub fn new(
        http: reqwest::Client,
        config: OAuthConfig,
        store: Arc<dyn RefreshTokenStore>,
    ) -> Self {
        Self {
            http,
            config: Arc::new(config),
            store,
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// A fresh access token for the current refresh token.
    ///
    /// Fails without any network call if the store is empty.
    pub async fn access_token(&self) -> Result<AccessToken> {
        let http = self.http.clone();
        let config = self.config.clone();
        let store = self.store.clone();
        let lock = self.refresh_lock.clone();

        let task = tokio::spawn(async move {
            let _guard = lock.lock().await;
            let current = store.get().await?;
            obtain(&http, &config, store.as_ref(), &current).await
        });

        task.await
            .map_err(|e| Error::TokenExchange(format!("refresh task failed: {e}")))?
    }

    /// Exchange an authorization code from the consent callback.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        token::exchange_code(&self.http, &self.config, code).await
    }

    /// Make `refresh` the current refresh token.
    ///
    /// Takes the same lock as `access_token()` so it cannot interleave with
    /// an in-progress rotation.
    pub async fn install(&self, refresh: &str) -> Result<()> {
        let _guard = self.refresh_lock.lock().await;
        self.store.put(refresh).await?;
        info!("installed refresh token from authorization code exchange");
        Ok(())
    }
}

/// Exchange `current` and persist the rotated refresh token, if any, before
/// returning. Nothing is persisted when the exchange fails. Callers hold the
/// refresh lock.
async fn obtain(
    http: &reqwest::Client,
    config: &OAuthConfig,
    store: &dyn RefreshTokenStore,
    current: &str,
) -> Result<AccessToken> {
    let response = match token::refresh_token(http, config, current).await {
        Ok(r) => r,
        Err(e) => {
            metrics::counter!("token_refresh_total", "outcome" => "failed").increment(1);
            warn!(error = %e, "refresh token exchange failed");
            return Err(e);
        }
    };

    if let Some(new_refresh) = rotated_refresh(&response, current) {
        store.put(&new_refresh).await?;
        metrics::counter!("token_refresh_total", "outcome" => "rotated").increment(1);
        info!(
            expires_in = response.expires_in,
            refresh_expires_in = response.x_refresh_token_expires_in,
            "refresh token rotated and persisted"
        );
    } else {
        metrics::counter!("token_refresh_total", "outcome" => "unchanged").increment(1);
        debug!(expires_in = response.expires_in, "access token refreshed");
    }

    Ok(AccessToken::from_response(&response))
}

/// The refresh token from `response` if it differs from `current`.
fn rotated_refresh(response: &TokenResponse, current: &str) -> Option<String> {
    response
        .refresh_token
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty() && *r != current)
        .map(str::to_owned)
}
