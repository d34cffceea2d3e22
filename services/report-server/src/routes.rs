//! Service routes: `/report`, `/login`, `/callback`

use std::time::Instant;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;
use tracing::{error, info, instrument, warn};

use crate::AppState;
use crate::report;

/// `state` value sent on the consent redirect and expected back on the callback.
pub const OAUTH_STATE: &str = "state";

fn new_request_id() -> String {
    format!("req_{}", uuid::Uuid::new_v4().as_simple())
}

/// Assemble and return the report. Any failure is an empty 500.
#[instrument(skip_all, fields(request_id = %new_request_id()))]
pub async fn report_handler(State(state): State<AppState>) -> Response {
    let started = Instant::now();
    let today = chrono::Local::now().date_naive();

    let response = match report::assemble(&state.factory, &state.settings, today).await {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(e) => {
            error!(error = %e, "report failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    };
    state
        .metrics
        .observe("/report", response.status().as_u16(), started);
    response
}

/// Redirect to the provider's consent page.
#[instrument(skip_all, fields(request_id = %new_request_id()))]
pub async fn login_handler(State(state): State<AppState>) -> Response {
    let started = Instant::now();
    let response = match state.tokens.config().authorization_url(OAUTH_STATE) {
        Ok(url) => Redirect::to(&url).into_response(),
        Err(e) => {
            error!(error = %e, "unable to build authorization url");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    };
    state
        .metrics
        .observe("/login", response.status().as_u16(), started);
    response
}

#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    #[serde(rename = "realmId")]
    realm_id: Option<String>,
}

/// Empty and missing are the same; whitespace is passed through untouched.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Complete the consent flow: exchange the code and install the refresh token.
#[instrument(skip_all, fields(request_id = %new_request_id()))]
pub async fn callback_handler(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let started = Instant::now();
    let status = complete_callback(&state, &params).await;
    state.metrics.observe("/callback", status.as_u16(), started);
    status.into_response()
}

async fn complete_callback(state: &AppState, params: &CallbackParams) -> StatusCode {
    let (Some(code), Some(oauth_state), Some(realm_id)) = (
        present(&params.code),
        present(&params.state),
        present(&params.realm_id),
    ) else {
        warn!(
            code = params.code.is_some(),
            state = params.state.is_some(),
            realm_id = params.realm_id.is_some(),
            "callback missing required parameters"
        );
        return StatusCode::BAD_REQUEST;
    };

    if oauth_state != OAUTH_STATE {
        warn!(state = oauth_state, "callback state does not match");
    }
    if realm_id != state.factory.realm_id() {
        warn!(
            realm_id,
            configured = state.factory.realm_id(),
            "callback realm differs from configured realm"
        );
    }

    let response = match state.tokens.exchange_code(code).await {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "authorization code exchange failed");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    };

    match response.refresh_token.as_deref().map(str::trim) {
        Some(refresh) if !refresh.is_empty() => {
            if let Err(e) = state.tokens.install(refresh).await {
                error!(error = %e, "failed to persist refresh token");
                return StatusCode::INTERNAL_SERVER_ERROR;
            }
        }
        _ => warn!("code exchange returned no refresh token, store unchanged"),
    }

    info!(
        realm_id,
        expires_in = response.expires_in,
        "authorization completed"
    );
    StatusCode::OK
}
