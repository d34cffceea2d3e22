//! Builds authenticated query clients for the configured realm

use std::sync::Arc;

use quickbooks_auth::{AccessToken, TokenSource};
use quickbooks_client::QboClient;

#[derive(Clone)]
pub struct ClientFactory {
    http: reqwest::Client,
    base_url: String,
    realm_id: String,
    tokens: Arc<TokenSource>,
}

impl ClientFactory {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        realm_id: impl Into<String>,
        tokens: Arc<TokenSource>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            realm_id: realm_id.into(),
            tokens,
        }
    }

    pub fn realm_id(&self) -> &str {
        &self.realm_id
    }

    /// Client bound to `access_token` and `realm_id`. No request is made.
    pub fn build(&self, access_token: &AccessToken, realm_id: &str) -> QboClient {
        QboClient::new(
            self.http.clone(),
            self.base_url.clone(),
            realm_id,
            access_token.secret().into(),
        )
    }

    /// Obtain a fresh access token and build a client for the configured realm.
    pub async fn client(&self) -> quickbooks_auth::Result<QboClient> {
        let token = self.tokens.access_token().await?;
        Ok(self.build(&token, &self.realm_id))
    }
}
