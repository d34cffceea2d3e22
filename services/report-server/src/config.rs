//! Configuration types and loading
//!
//! Precedence: env vars > config file > defaults. The QuickBooks app
//! credentials, bootstrap refresh token and realm ID come only from the
//! environment (or a `.env` file) and are never read from the TOML file.

use common::Secret;
use quickbooks_auth::OAuthConfig;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::report::ReportSettings;

const CLIENT_ID_VAR: &str = "QUICKBOOKS_CLIENT_ID";
const CLIENT_SECRET_VAR: &str = "QUICKBOOKS_CLIENT_SECRET";
const CALLBACK_BASE_URL_VAR: &str = "QUICKBOOKS_CALLBACK_BASE_URL";
const REFRESH_TOKEN_VAR: &str = "QUICKBOOKS_REFRESH_TOKEN";
const REALM_ID_VAR: &str = "QUICKBOOKS_REALM_ID";

/// Root configuration, loaded once at startup.
#[derive(Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub quickbooks: QuickBooksConfig,
    pub report: ReportConfig,
    pub credentials: Credentials,
}

/// Optional TOML file layout. Every section may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    quickbooks: QuickBooksConfig,
    #[serde(default)]
    report: ReportConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub max_connections: usize,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QuickBooksConfig {
    pub api_base_url: String,
    pub token_file: PathBuf,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub excluded_account: String,
    pub window_days: u32,
    pub max_results: u32,
}

/// App credentials and tenant, environment only.
#[derive(Debug)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub callback_base_url: String,
    /// Seeds the token store when it is empty
    pub bootstrap_refresh_token: Secret<String>,
    pub realm_id: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 1000,
        }
    }
}

impl Default for QuickBooksConfig {
    fn default() -> Self {
        Self {
            api_base_url: quickbooks_client::API_BASE_URL.to_string(),
            token_file: PathBuf::from(".token"),
            timeout_secs: 30,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            excluded_account: "Change Machine".to_string(),
            window_days: 28,
            max_results: quickbooks_client::MAX_RESULTS_CAP,
        }
    }
}

impl Config {
    /// Load from the optional config file and the process environment.
    pub fn load(path: Option<&Path>) -> common::Result<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Load with an explicit environment lookup.
    pub fn load_with(
        path: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> common::Result<Self> {
        let file = match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path)?;
                toml::from_str::<FileConfig>(&contents)?
            }
            None => FileConfig::default(),
        };
        let FileConfig {
            mut server,
            mut quickbooks,
            report,
        } = file;

        // Empty values count as unset, matching the required-variable checks
        let optional = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        if let Some(addr) = optional("LISTEN_ADDR") {
            server.listen_addr = addr.trim().parse().map_err(|e| {
                common::Error::Config(format!("LISTEN_ADDR {addr:?} is not a socket address: {e}"))
            })?;
        }
        if let Some(token_file) = optional("TOKEN_FILE") {
            quickbooks.token_file = PathBuf::from(token_file);
        }
        if let Some(base_url) = optional("QUICKBOOKS_API_BASE_URL") {
            quickbooks.api_base_url = base_url;
        }

        let required = |key: &str| {
            optional(key)
                .map(|v| v.trim().to_string())
                .ok_or_else(|| common::Error::MissingVar(key.to_string()))
        };
        let credentials = Credentials {
            client_id: required(CLIENT_ID_VAR)?,
            client_secret: Secret::new(required(CLIENT_SECRET_VAR)?),
            callback_base_url: required(CALLBACK_BASE_URL_VAR)?,
            bootstrap_refresh_token: Secret::new(required(REFRESH_TOKEN_VAR)?),
            realm_id: required(REALM_ID_VAR)?,
        };

        let config = Self {
            server,
            quickbooks,
            report,
            credentials,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        for (name, url) in [
            ("api_base_url", &self.quickbooks.api_base_url),
            (CALLBACK_BASE_URL_VAR, &self.credentials.callback_base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(common::Error::Config(format!(
                    "{name} must start with http:// or https://, got: {url}"
                )));
            }
        }

        if self.quickbooks.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }
        if self.server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }
        if self.report.window_days == 0 {
            return Err(common::Error::Config(
                "window_days must be greater than 0".into(),
            ));
        }
        if self.report.max_results == 0 || self.report.max_results > quickbooks_client::MAX_RESULTS_CAP
        {
            return Err(common::Error::Config(format!(
                "max_results must be between 1 and {}, got: {}",
                quickbooks_client::MAX_RESULTS_CAP,
                self.report.max_results
            )));
        }
        Ok(())
    }

    /// OAuth client configuration with the redirect URL derived from the
    /// callback base URL.
    pub fn oauth_config(&self) -> OAuthConfig {
        OAuthConfig::new(
            self.credentials.client_id.clone(),
            self.credentials.client_secret.clone(),
            &self.credentials.callback_base_url,
        )
    }

    pub fn report_settings(&self) -> ReportSettings {
        ReportSettings {
            excluded_account: self.report.excluded_account.clone(),
            window_days: self.report.window_days,
            max_results: self.report.max_results,
        }
    }

    /// Resolve the config file from the `--config` CLI arg or `CONFIG_PATH`.
    /// No file is read when neither is set.
    pub fn resolve_path(cli_path: Option<&str>) -> Option<PathBuf> {
        if let Some(p) = cli_path {
            return Some(PathBuf::from(p));
        }
        std::env::var("CONFIG_PATH").ok().map(PathBuf::from)
    }
}
