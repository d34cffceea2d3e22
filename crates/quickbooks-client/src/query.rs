//! Builder for the QuickBooks query language
//!
//! `SELECT * FROM <Entity> [WHERE c1 AND c2 ...] [MAXRESULTS n]`
//!
//! No paging: a query returns at most one page of `MAX_RESULTS_CAP` rows.

use std::fmt;

use chrono::NaiveDate;

use crate::models::Entity;

/// Largest page the query endpoint returns.
pub const MAX_RESULTS_CAP: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    entity: &'static str,
    conditions: Vec<String>,
    max_results: Option<u32>,
}

impl Query {
    /// `SELECT * FROM` the given entity type.
    pub fn select<T: Entity>() -> Self {
        Self {
            entity: T::NAME,
            conditions: Vec::new(),
            max_results: None,
        }
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    /// Add a condition; conditions are joined with `AND`.
    pub fn filter(mut self, condition: impl Into<String>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    /// Page size, clamped to `1..=MAX_RESULTS_CAP`.
    pub fn max_results(mut self, n: u32) -> Self {
        self.max_results = Some(n.clamp(1, MAX_RESULTS_CAP));
        self
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT * FROM {}", self.entity)?;
        if !self.conditions.is_empty() {
            write!(f, " WHERE {}", self.conditions.join(" AND "))?;
        }
        if let Some(n) = self.max_results {
            write!(f, " MAXRESULTS {n}")?;
        }
        Ok(())
    }
}

/// Single-quoted string literal. Embedded quotes are doubled.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `'YYYY-MM-DD'` date literal.
pub fn date_literal(date: NaiveDate) -> String {
    format!("'{}'", date.format("%Y-%m-%d"))
}
