//! Entity models for the query endpoint
//!
//! Field names follow the API's PascalCase. Each model types the fields the
//! report service relies on and keeps every other field in `other`, so the
//! entity serializes back out with nothing dropped.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// An entity type addressable by `SELECT * FROM <NAME>`.
///
/// `NAME` is also the key of the result array inside `QueryResponse`.
pub trait Entity: serde::de::DeserializeOwned {
    const NAME: &'static str;
}

/// Reference to another entity (`{"value": "35", "name": "Checking"}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Account {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_type: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default, deserialize_with = "amount")]
    pub current_balance: f64,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Entity for Account {
    const NAME: &'static str = "Account";
}

/// Transaction line shared by purchases and deposits. The detail object
/// (with its `ClassRef`) is kept verbatim in `other`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Line {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "amount")]
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_type: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Purchase {
    pub id: String,
    pub txn_date: NaiveDate,
    #[serde(deserialize_with = "amount")]
    pub total_amt: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_ref: Option<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_ref: Option<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_note: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line: Vec<Line>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Entity for Purchase {
    const NAME: &'static str = "Purchase";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Deposit {
    pub id: String,
    pub txn_date: NaiveDate,
    #[serde(deserialize_with = "amount")]
    pub total_amt: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deposit_to_account_ref: Option<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_note: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line: Vec<Line>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Entity for Deposit {
    const NAME: &'static str = "Deposit";
}

/// Budget/category dimension attached to transaction lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Class {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fully_qualified_name: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub sub_class: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_ref: Option<Reference>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Entity for Class {
    const NAME: &'static str = "Class";
}

fn default_active() -> bool {
    true
}

/// Amounts arrive as JSON numbers, occasionally as strings.
fn amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Number(f64),
        Text(String),
    }

    match Amount::deserialize(deserializer)? {
        Amount::Number(n) => Ok(n),
        Amount::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
