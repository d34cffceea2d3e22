//! In-process QuickBooks stand-in for tests: token endpoint plus query API

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Form, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use quickbooks_auth::{FileTokenStore, OAuthConfig, RefreshTokenStore, TokenSource};
use serde_json::json;
use tokio::net::TcpListener;

use crate::factory::ClientFactory;

const TOKEN_PATH: &str = "/oauth2/v1/tokens/bearer";
pub const REALM_ID: &str = "9130";

#[derive(Clone, Default)]
struct MockState {
    token_calls: Arc<AtomicUsize>,
    queries: Arc<Mutex<Vec<String>>>,
    failing_entity: Option<&'static str>,
    revoked_access_token: Option<&'static str>,
}

/// Token endpoint issuing `at_<n>` / `rt_<n>` (always rotating) and a query
/// API that answers by the entity named in the query text.
///
/// Refresh tokens starting with `revoked` get `invalid_grant`; the only valid
/// authorization code is `good-code`. Queries need a `Bearer at_` token.
pub struct MockQuickBooks {
    pub base_url: String,
    state: MockState,
    _server: tokio::task::JoinHandle<()>,
}

impl MockQuickBooks {
    pub async fn start() -> Self {
        Self::start_with(MockState::default()).await
    }

    /// Query API answers a 400 validation fault for `entity`.
    pub async fn failing(entity: &'static str) -> Self {
        Self::start_with(MockState {
            failing_entity: Some(entity),
            ..MockState::default()
        })
        .await
    }

    /// Query API answers 401 for bearer `token` as if it had been revoked.
    pub async fn revoking(token: &'static str) -> Self {
        Self::start_with(MockState {
            revoked_access_token: Some(token),
            ..MockState::default()
        })
        .await
    }

    async fn start_with(state: MockState) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = axum::Router::new()
            .route(TOKEN_PATH, post(token_handler))
            .route("/v3/company/{realm}/query", get(query_handler))
            .with_state(state.clone());
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            base_url: format!("http://{addr}"),
            state,
            _server: server,
        }
    }

    pub fn oauth_config(&self) -> OAuthConfig {
        OAuthConfig::new("cid", "csec".into(), "http://localhost:8080")
            .with_token_url(format!("{}{TOKEN_PATH}", self.base_url))
    }

    pub fn token_calls(&self) -> usize {
        self.state.token_calls.load(Ordering::SeqCst)
    }

    /// Query texts received so far, in arrival order.
    pub fn queries(&self) -> Vec<String> {
        self.state.queries.lock().unwrap().clone()
    }

    /// Token source over a store in `dir`, optionally pre-seeded.
    pub async fn token_source(
        &self,
        dir: &tempfile::TempDir,
        initial: Option<&str>,
    ) -> (Arc<TokenSource>, Arc<FileTokenStore>) {
        let store = Arc::new(FileTokenStore::new(dir.path().join(".token")));
        if let Some(rt) = initial {
            store.put(rt).await.unwrap();
        }
        let tokens = Arc::new(TokenSource::new(
            reqwest::Client::new(),
            self.oauth_config(),
            store.clone(),
        ));
        (tokens, store)
    }

    pub async fn factory(
        &self,
        dir: &tempfile::TempDir,
        initial: Option<&str>,
    ) -> (ClientFactory, Arc<FileTokenStore>) {
        let (tokens, store) = self.token_source(dir, initial).await;
        let factory = ClientFactory::new(reqwest::Client::new(), &self.base_url, REALM_ID, tokens);
        (factory, store)
    }
}

async fn token_handler(
    State(state): State<MockState>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let n = state.token_calls.fetch_add(1, Ordering::SeqCst) + 1;
    let field = |name: &str| form.get(name).map(String::as_str);

    if field("client_id") != Some("cid") || field("client_secret") != Some("csec") {
        return oauth_error(StatusCode::UNAUTHORIZED, "invalid_client");
    }
    match field("grant_type") {
        Some("refresh_token") => {
            let presented = field("refresh_token").unwrap_or_default();
            if presented.is_empty() || presented.starts_with("revoked") {
                return oauth_error(StatusCode::BAD_REQUEST, "invalid_grant");
            }
            axum::Json(json!({
                "token_type": "bearer",
                "access_token": format!("at_{n}"),
                "refresh_token": format!("rt_{n}"),
                "expires_in": 3600,
            }))
            .into_response()
        }
        Some("authorization_code") if field("code") == Some("good-code") => axum::Json(json!({
            "token_type": "bearer",
            "access_token": "at_code",
            "refresh_token": "rt_code",
            "expires_in": 3600,
        }))
        .into_response(),
        _ => oauth_error(StatusCode::BAD_REQUEST, "invalid_grant"),
    }
}

async fn query_handler(
    State(state): State<MockState>,
    Path(realm): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    let authorized = bearer
        .is_some_and(|t| t.starts_with("at_") && Some(t) != state.revoked_access_token);
    if !authorized || realm != REALM_ID {
        return fault(StatusCode::UNAUTHORIZED, "AUTHENTICATION", "3200", "Token invalid");
    }

    let query = params.get("query").cloned().unwrap_or_default();
    state.queries.lock().unwrap().push(query.clone());

    let entity = ["Account", "Purchase", "Deposit", "Class"]
        .into_iter()
        .find(|e| query.contains(&format!("FROM {e}")))
        .unwrap_or("Unknown");
    if Some(entity) == state.failing_entity {
        return fault(StatusCode::BAD_REQUEST, "ValidationFault", "4000", "Error parsing query");
    }

    let rows = match entity {
        "Account" => json!([
            {"Id": "1", "Name": "Change Machine", "AccountType": "Bank", "Active": true, "CurrentBalance": 200.0},
            {"Id": "35", "Name": "Main", "AccountType": "Bank", "Active": true, "CurrentBalance": 500.0},
            {"Id": "36", "Name": "Old", "AccountType": "Bank", "Active": false, "CurrentBalance": 0}
        ]),
        "Purchase" => json!([
            {"Id": "201", "TxnDate": "2024-03-01", "TotalAmt": 49.99, "PaymentType": "CreditCard", "SyncToken": "0"}
        ]),
        "Deposit" => json!([
            {"Id": "101", "TxnDate": "2024-03-10", "TotalAmt": 2500.0, "PrivateNote": "Dues"}
        ]),
        "Class" => json!([
            {"Id": "3", "Name": "Pools", "Active": true},
            {"Id": "7", "Name": "Merch", "SubClass": true, "ParentRef": {"value": "3"}}
        ]),
        _ => return fault(StatusCode::BAD_REQUEST, "ValidationFault", "4000", "Unknown entity"),
    };
    axum::Json(json!({ "QueryResponse": { entity: rows } })).into_response()
}

fn fault(status: StatusCode, kind: &str, code: &str, message: &str) -> Response {
    (
        status,
        axum::Json(json!({
            "Fault": { "Error": [{"Message": message, "code": code}], "type": kind }
        })),
    )
        .into_response()
}

fn oauth_error(status: StatusCode, code: &str) -> Response {
    (status, axum::Json(json!({ "error": code }))).into_response()
}
