//! QuickBooks Online accounting API client
//!
//! Read-only access to the query endpoint: a builder for the SQL-like query
//! language, typed models for the entities the report service reads, and a
//! client that runs queries with a bearer access token against one realm.
//!
//! The client never refreshes tokens. Callers obtain a fresh access token and
//! build a new client per unit of work.

pub mod client;
pub mod error;
pub mod models;
pub mod query;

pub use client::{API_BASE_URL, MINOR_VERSION, QboClient};
pub use error::{Error, Result};
pub use models::{Account, Class, Deposit, Entity, Line, Purchase, Reference};
pub use query::{MAX_RESULTS_CAP, Query, date_literal, quote};
