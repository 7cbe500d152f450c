//! Page logic behind the HTTP handlers.
//!
//! Each page reads through the [`Backend`], narrows rows to what the caller's
//! role may see, then filters client-side by search term and status. Handlers
//! only translate between HTTP and these functions.

pub mod admin;
pub mod billing;
pub mod calendar;
pub mod cases;
pub mod clients;
pub mod dashboard;
pub mod search;
pub mod settings;

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::Role;
use crate::backend::{Backend, BackendError, Table};
use crate::config::CurrencyConfig;
use crate::currency::format_amount;
use crate::error::ApiError;
use crate::filter::Query;
use crate::models::{self, Case, Invoice, Profile};
use crate::session::SessionView;

pub type PageResult<T> = Result<T, ApiError>;

pub const UNKNOWN_CLIENT: &str = "Unknown Client";

/// An amount with its display string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Money {
    pub amount: Decimal,
    pub formatted: String,
}

impl Money {
    pub fn new(amount: Decimal, currency: &CurrencyConfig) -> Self {
        Self { formatted: format_amount(amount, currency), amount }
    }
}

pub(crate) async fn fetch<T: DeserializeOwned>(backend: &dyn Backend, table: Table, query: &Query) -> Result<Vec<T>, BackendError> {
    let rows = backend.select(table, query).await?;
    Ok(models::from_rows(rows)?)
}

/// Cases the caller may see: admins everything, lawyers the cases they
/// handle, clients their own.
pub(crate) fn case_scope(profile: &Profile) -> Query {
    match profile.role {
        Role::Admin => Query::new(),
        Role::Lawyer => Query::new().eq("lawyer_id", profile.id.to_string()),
        Role::Client => Query::new().eq("client_id", profile.id.to_string()),
    }
}

pub(crate) async fn visible_cases(backend: &dyn Backend, view: &SessionView, query: impl FnOnce(Query) -> Query) -> PageResult<Vec<Case>> {
    let profile = view.require(Role::Client)?;
    Ok(fetch(backend, Table::Cases, &query(case_scope(profile))).await?)
}

/// Invoices attached to cases the caller may see.
pub(crate) async fn visible_invoices(backend: &dyn Backend, view: &SessionView, query: Query) -> PageResult<Vec<Invoice>> {
    let profile = view.require(Role::Client)?;
    if profile.role == Role::Admin {
        return Ok(fetch(backend, Table::Invoices, &query).await?);
    }
    let cases: Vec<Case> = fetch(backend, Table::Cases, &case_scope(profile)).await?;
    if cases.is_empty() {
        return Ok(Vec::new());
    }
    let ids = cases.iter().map(|c| c.id.to_string());
    Ok(fetch(backend, Table::Invoices, &query.in_list("case_id", ids)).await?)
}

/// Full names for the given profile ids; missing ids are simply absent.
pub(crate) async fn profile_names(backend: &dyn Backend, ids: impl IntoIterator<Item = Uuid>) -> Result<HashMap<Uuid, String>, BackendError> {
    let unique: HashSet<Uuid> = ids.into_iter().collect();
    if unique.is_empty() {
        return Ok(HashMap::new());
    }
    let query = Query::new().in_list("id", unique.iter().map(Uuid::to_string));
    let profiles: Vec<Profile> = fetch(backend, Table::Profiles, &query).await?;
    Ok(profiles.into_iter().map(|p| (p.id, p.full_name)).collect())
}

pub(crate) async fn cases_by_id(backend: &dyn Backend, ids: impl IntoIterator<Item = Uuid>) -> Result<HashMap<Uuid, Case>, BackendError> {
    let unique: HashSet<Uuid> = ids.into_iter().collect();
    if unique.is_empty() {
        return Ok(HashMap::new());
    }
    let query = Query::new().in_list("id", unique.iter().map(Uuid::to_string));
    let cases: Vec<Case> = fetch(backend, Table::Cases, &query).await?;
    Ok(cases.into_iter().map(|c| (c.id, c)).collect())
}

/// Case-insensitive substring match of `term` against any field. A blank
/// term matches everything.
pub fn matches_search(term: Option<&str>, fields: &[&str]) -> bool {
    let term = match term.map(str::trim) {
        None | Some("") => return true,
        Some(t) => t.to_lowercase(),
    };
    fields.iter().any(|field| field.to_lowercase().contains(&term))
}

/// Optional status filter from a query string; blank and `all` mean none.
pub(crate) fn parse_status<S: std::str::FromStr<Err = String>>(raw: Option<&str>) -> PageResult<Option<S>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) if s.eq_ignore_ascii_case("all") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(|e: String| ApiError::field("status", e)),
    }
}

pub(crate) fn parse_date(field: &str, raw: &str) -> PageResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::field(field, format!("{} must be a date in YYYY-MM-DD form", field)))
}
