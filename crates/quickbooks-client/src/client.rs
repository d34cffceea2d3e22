//! Query endpoint client
//!
//! `GET {base}/v3/company/{realm}/query?query=...&minorversion=...` with a
//! bearer token. Results come back as `{"QueryResponse": {"<Entity>": [...]}}`;
//! failures as `{"Fault": {"Error": [{"Message", "Detail", "code"}]}}`.

use common::Secret;
use reqwest::Url;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::models::Entity;
use crate::query::Query;

/// Production API host
pub const API_BASE_URL: &str = "https://quickbooks.api.intuit.com";

/// API minor version pinned for stable response shapes
pub const MINOR_VERSION: &str = "75";

/// Authenticated client for one realm.
///
/// Construction is pure; no request is made until a query runs.
pub struct QboClient {
    http: reqwest::Client,
    base_url: String,
    realm_id: String,
    access_token: Secret<String>,
}

#[derive(Deserialize)]
struct QueryEnvelope {
    #[serde(rename = "QueryResponse", default)]
    query_response: Map<String, Value>,
    #[serde(rename = "Fault")]
    fault: Option<Fault>,
}

#[derive(Debug, Deserialize)]
struct Fault {
    #[serde(rename = "Error", default)]
    errors: Vec<FaultError>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FaultError {
    #[serde(rename = "Message")]
    message: Option<String>,
    #[serde(rename = "Detail")]
    detail: Option<String>,
    code: Option<String>,
}

impl QboClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        realm_id: impl Into<String>,
        access_token: Secret<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            realm_id: realm_id.into(),
            access_token,
        }
    }

    pub fn realm_id(&self) -> &str {
        &self.realm_id
    }

    fn query_url(&self, query: &Query) -> Result<Url> {
        let endpoint = format!(
            "{}/v3/company/{}/query",
            self.base_url.trim_end_matches('/'),
            self.realm_id
        );
        let sql = query.to_string();
        Url::parse_with_params(
            &endpoint,
            &[("query", sql.as_str()), ("minorversion", MINOR_VERSION)],
        )
        .map_err(|e| Error::Url(format!("{endpoint}: {e}")))
    }

    /// Run one query and return the rows of its entity type.
    ///
    /// A missing result array (no matching rows) yields an empty Vec.
    #[instrument(skip_all, fields(entity = T::NAME, realm_id = %self.realm_id))]
    pub async fn query<T: Entity>(&self, query: &Query) -> Result<Vec<T>> {
        let url = self.query_url(query)?;
        debug!(query = %query, "running query");

        let response = self
            .http
            .get(url)
            .bearer_auth(self.access_token.expose())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| Error::Http(format!("{} query request failed: {e}", T::NAME)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Http(format!("reading {} query response: {e}", T::NAME)))?;

        if status.as_u16() == 401 {
            return Err(Error::Unauthorized(fault_message(&body, status.as_u16())));
        }
        if !status.is_success() {
            return Err(Error::Fault {
                status: status.as_u16(),
                message: fault_message(&body, status.as_u16()),
            });
        }

        let mut envelope: QueryEnvelope = serde_json::from_str(&body)
            .map_err(|e| Error::Decode(format!("{} query envelope: {e}", T::NAME)))?;
        if let Some(fault) = envelope.fault {
            return Err(Error::Fault {
                status: status.as_u16(),
                message: describe_fault(&fault),
            });
        }

        let rows = match envelope.query_response.remove(T::NAME) {
            Some(rows) => serde_json::from_value::<Vec<T>>(rows)
                .map_err(|e| Error::Decode(format!("{} rows: {e}", T::NAME)))?,
            None => Vec::new(),
        };
        debug!(rows = rows.len(), "query complete");
        Ok(rows)
    }
}

fn describe_fault(fault: &Fault) -> String {
    let first = fault.errors.first();
    let text = first
        .and_then(|e| e.detail.as_deref().or(e.message.as_deref()))
        .unwrap_or("unknown fault");
    match (fault.kind.as_deref(), first.and_then(|e| e.code.as_deref())) {
        (Some(kind), Some(code)) => format!("{kind} {code}: {text}"),
        (Some(kind), None) => format!("{kind}: {text}"),
        (None, Some(code)) => format!("{code}: {text}"),
        (None, None) => text.to_string(),
    }
}

/// Best-effort message from an error body; the envelope casing varies.
fn fault_message(body: &str, status: u16) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return format!("HTTP {status}");
    };
    let fault = value.get("Fault").or_else(|| value.get("fault"));
    if let Some(fault) = fault.and_then(|f| serde_json::from_value::<Fault>(f.clone()).ok()) {
        if !fault.errors.is_empty() {
            return describe_fault(&fault);
        }
    }
    value["fault"]["error"][0]["detail"]
        .as_str()
        .or_else(|| value["message"].as_str())
        .map(str::to_owned)
        .unwrap_or_else(|| format!("HTTP {status}"))
}
