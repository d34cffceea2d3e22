//! Report assembly
//!
//! One access token and one client per report. The four queries run
//! concurrently; the first failure drops the others and fails the report.

use chrono::{Days, NaiveDate};
use quickbooks_client::{Class, Deposit, Entity, Purchase, QboClient, Query, date_literal, quote};
use serde::Serialize;
use tracing::{error, info, instrument};

use crate::error::{Error, Result};
use crate::factory::ClientFactory;
use crate::metrics;

/// Query parameters that shape a report.
#[derive(Debug, Clone)]
pub struct ReportSettings {
    /// Bank account left out of the balances
    pub excluded_account: String,
    /// Length of the trailing transaction window
    pub window_days: u32,
    pub max_results: u32,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            excluded_account: "Change Machine".to_string(),
            window_days: 28,
            max_results: quickbooks_client::MAX_RESULTS_CAP,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub deposits: Vec<Deposit>,
    pub purchases: Vec<Purchase>,
    pub accounts: Vec<Account>,
    pub classes: Vec<Class>,
}

/// Balance of one bank account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    pub name: String,
    pub current_balance: f64,
}

/// Active bank accounts other than `excluded`, in upstream order.
pub fn project_accounts(accounts: &[quickbooks_client::Account], excluded: &str) -> Vec<Account> {
    accounts
        .iter()
        .filter(|a| a.account_type.as_deref() == Some("Bank") && a.active && a.name != excluded)
        .map(|a| Account {
            name: a.name.clone(),
            current_balance: a.current_balance,
        })
        .collect()
}

/// Half-open `[today - days, today)` window.
pub fn trailing_window(today: NaiveDate, days: u32) -> (NaiveDate, NaiveDate) {
    let start = today
        .checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MIN);
    (start, today)
}

pub fn accounts_query(settings: &ReportSettings) -> Query {
    Query::select::<quickbooks_client::Account>()
        .filter("AccountType = 'Bank'")
        .filter("Active = true")
        .filter(format!("Name != {}", quote(&settings.excluded_account)))
}

/// Transactions dated inside the trailing window ending `today`.
pub fn transactions_query<T: Entity>(settings: &ReportSettings, today: NaiveDate) -> Query {
    let (start, end) = trailing_window(today, settings.window_days);
    Query::select::<T>()
        .filter(format!("TxnDate >= {}", date_literal(start)))
        .filter(format!("TxnDate < {}", date_literal(end)))
        .max_results(settings.max_results)
}

pub fn classes_query(settings: &ReportSettings) -> Query {
    Query::select::<Class>().max_results(settings.max_results)
}

async fn fetch<T: Entity>(client: &QboClient, query: &Query) -> Result<Vec<T>> {
    client.query::<T>(query).await.map_err(|source| {
        metrics::record_upstream_error(T::NAME);
        error!(entity = T::NAME, error = %source, "upstream query failed");
        Error::Fetch {
            entity: T::NAME,
            source,
        }
    })
}

/// Build the report for the window ending `today`.
#[instrument(skip_all, fields(realm_id = %factory.realm_id(), %today))]
pub async fn assemble(
    factory: &ClientFactory,
    settings: &ReportSettings,
    today: NaiveDate,
) -> Result<Report> {
    let client = factory.client().await.inspect_err(|e| {
        error!(error = %e, "unable to obtain access token");
    })?;

    let deposits_q = transactions_query::<Deposit>(settings, today);
    let purchases_q = transactions_query::<Purchase>(settings, today);
    let accounts_q = accounts_query(settings);
    let classes_q = classes_query(settings);

    let (deposits, purchases, accounts, classes) = tokio::try_join!(
        fetch::<Deposit>(&client, &deposits_q),
        fetch::<Purchase>(&client, &purchases_q),
        fetch::<quickbooks_client::Account>(&client, &accounts_q),
        fetch::<Class>(&client, &classes_q),
    )?;

    let report = Report {
        deposits,
        purchases,
        accounts: project_accounts(&accounts, &settings.excluded_account),
        classes,
    };
    info!(
        deposits = report.deposits.len(),
        purchases = report.purchases.len(),
        accounts = report.accounts.len(),
        classes = report.classes.len(),
        "report assembled"
    );
    Ok(report)
}
