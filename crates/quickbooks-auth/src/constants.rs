//! Intuit OAuth2 endpoints and scopes
//!
//! These identify Intuit's public authorization server. The client ID and
//! secret are per-app values and come from configuration.

/// Authorization endpoint the user is redirected to by `/login`
pub const AUTHORIZE_ENDPOINT: &str = "https://appcenter.intuit.com/connect/oauth2";

/// Token endpoint for code exchange and token refresh
pub const TOKEN_ENDPOINT: &str = "https://oauth.platform.intuit.com/oauth2/v1/tokens/bearer";

/// Scope granting read/write access to the accounting API
pub const ACCOUNTING_SCOPE: &str = "com.intuit.quickbooks.accounting";

/// Path appended to the callback base URL to form the redirect URL
pub const CALLBACK_PATH: &str = "/callback";

/// Access token lifetime assumed when the token endpoint omits `expires_in`
pub const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;
