use std::collections::HashSet;

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use super::billing::invoice_rows;
use super::calendar::{hearings_between, HearingEvent};
use super::cases::{case_rows, CaseRow};
use super::{fetch, visible_cases, visible_invoices, Money, PageResult};
use crate::auth::Role;
use crate::backend::{Backend, Table};
use crate::config::CurrencyConfig;
use crate::filter::Query;
use crate::models::{CaseStatus, InvoiceStatus, Profile};
use crate::routes::{nav_items, NavItem};
use crate::session::SessionView;

pub const RECENT_CASES: usize = 3;
pub const UPCOMING_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub active_cases: usize,
    pub upcoming_hearings: usize,
    pub clients: usize,
    pub pending_payments: Money,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub profile: Option<Profile>,
    pub role: Option<Role>,
    pub navigation: Vec<NavItem>,
    pub stats: DashboardStats,
    pub recent_cases: Vec<CaseRow>,
    pub upcoming_hearings: Vec<HearingEvent>,
}

/// `GET /dashboard`. A session without a profile gets the shell with empty
/// figures rather than an error.
pub async fn dashboard(backend: &dyn Backend, view: &SessionView, currency: &CurrencyConfig, today: NaiveDate) -> PageResult<Dashboard> {
    let navigation = nav_items(view.role());
    let Some(profile) = view.profile() else {
        return Ok(Dashboard {
            profile: None,
            role: None,
            navigation,
            stats: DashboardStats {
                active_cases: 0,
                upcoming_hearings: 0,
                clients: 0,
                pending_payments: Money::new(Decimal::ZERO, currency),
            },
            recent_cases: Vec::new(),
            upcoming_hearings: Vec::new(),
        });
    };

    let cases = visible_cases(backend, view, |query| query.order("created_at desc")).await?;
    let active_cases = cases.iter().filter(|c| c.case_status == CaseStatus::Active).count();

    let clients = if profile.role == Role::Admin {
        let clients: Vec<Profile> = fetch(backend, Table::Profiles, &Query::new().eq("role", Role::Client.as_str())).await?;
        clients.len()
    } else {
        cases.iter().map(|c| c.client_id).collect::<HashSet<_>>().len()
    };

    let invoices = visible_invoices(backend, view, Query::new().eq("status", InvoiceStatus::Pending.as_str())).await?;
    let pending: Decimal = invoice_rows(backend, invoices, currency).await?.iter().map(|r| r.amount.amount).sum();

    let upcoming = hearings_between(backend, view, today, today + Duration::days(UPCOMING_DAYS)).await?;
    let recent_cases = case_rows(backend, cases.into_iter().take(RECENT_CASES).collect()).await?;

    Ok(Dashboard {
        profile: Some(profile.clone()),
        role: Some(profile.role),
        navigation,
        stats: DashboardStats {
            active_cases,
            upcoming_hearings: upcoming.len(),
            clients,
            pending_payments: Money::new(pending, currency),
        },
        recent_cases,
        upcoming_hearings: upcoming,
    })
}
