//! In-process token endpoint for tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Form, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use common::Secret;
use tokio::net::TcpListener;

use crate::oauth::OAuthConfig;

pub(crate) const TOKEN_PATH: &str = "/oauth2/v1/tokens/bearer";

#[derive(Clone)]
struct MockState {
    calls: Arc<AtomicUsize>,
    expires_in: u64,
    rotate: bool,
    delay: Duration,
    /// When set, only this refresh token is accepted and each exchange
    /// replaces it, as the real provider does on rotation.
    live: Option<Arc<Mutex<String>>>,
}

/// Token endpoint that issues `at_<n>` / `rt_<n>` for the n-th call.
///
/// Refresh tokens starting with `revoked` get `invalid_grant`; in strict mode
/// so does any token other than the latest one issued. Requests with
/// an Authorization header or without `cid`/`csec` form credentials get 401.
/// The only valid authorization code is `good-code`.
pub(crate) struct MockTokenEndpoint {
    pub url: String,
    calls: Arc<AtomicUsize>,
    _server: tokio::task::JoinHandle<()>,
}

impl MockTokenEndpoint {
    pub async fn start(expires_in: u64, rotate: bool) -> Self {
        Self::start_with(expires_in, rotate, Duration::ZERO, None).await
    }

    /// Rotating endpoint that accepts only the latest refresh token, starting
    /// from `initial`, and answers each exchange after `delay`.
    pub async fn strict(initial: &str, delay: Duration) -> Self {
        let live = Arc::new(Mutex::new(initial.to_string()));
        Self::start_with(3600, true, delay, Some(live)).await
    }

    async fn start_with(
        expires_in: u64,
        rotate: bool,
        delay: Duration,
        live: Option<Arc<Mutex<String>>>,
    ) -> Self {
        let calls = Arc::new(AtomicUsize::new(0));
        let state = MockState {
            calls: calls.clone(),
            expires_in,
            rotate,
            delay,
            live,
        };
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = axum::Router::new()
            .route(TOKEN_PATH, post(token_handler))
            .with_state(state);
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            url: format!("http://{addr}{TOKEN_PATH}"),
            calls,
            _server: server,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub(crate) fn test_config(token_url: &str) -> OAuthConfig {
    OAuthConfig::new("cid", Secret::from("csec"), "http://localhost:8080").with_token_url(token_url)
}

async fn token_handler(
    State(state): State<MockState>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let n = state.calls.fetch_add(1, Ordering::SeqCst) + 1;
    let field = |name: &str| form.get(name).map(String::as_str);

    if headers.contains_key(header::AUTHORIZATION)
        || field("client_id") != Some("cid")
        || field("client_secret") != Some("csec")
    {
        return oauth_error(StatusCode::UNAUTHORIZED, "invalid_client");
    }

    match field("grant_type") {
        Some("refresh_token") => {
            let presented = field("refresh_token").unwrap_or_default();
            if presented.is_empty() || presented.starts_with("revoked") {
                return oauth_error(StatusCode::BAD_REQUEST, "invalid_grant");
            }
            let refresh = if state.rotate {
                format!("rt_{n}")
            } else {
                presented.to_string()
            };
            if let Some(live) = &state.live {
                let mut live = live.lock().unwrap();
                if *live != presented {
                    return oauth_error(StatusCode::BAD_REQUEST, "invalid_grant");
                }
                // The old token is dead from here on, whether or not the
                // caller ever reads the response
                *live = refresh.clone();
            }
            if !state.delay.is_zero() {
                tokio::time::sleep(state.delay).await;
            }
            axum::Json(serde_json::json!({
                "token_type": "bearer",
                "access_token": format!("at_{n}"),
                "refresh_token": refresh,
                "expires_in": state.expires_in,
                "x_refresh_token_expires_in": 8726400,
            }))
            .into_response()
        }
        Some("authorization_code") => {
            if field("code") != Some("good-code") || field("redirect_uri").is_none() {
                return oauth_error(StatusCode::BAD_REQUEST, "invalid_grant");
            }
            axum::Json(serde_json::json!({
                "token_type": "bearer",
                "access_token": "at_code",
                "refresh_token": "rt_code",
                "expires_in": 3600,
            }))
            .into_response()
        }
        _ => oauth_error(StatusCode::BAD_REQUEST, "unsupported_grant_type"),
    }
}

fn oauth_error(status: StatusCode, code: &str) -> Response {
    (status, axum::Json(serde_json::json!({ "error": code }))).into_response()
}
