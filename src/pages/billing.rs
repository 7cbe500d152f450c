use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::{cases_by_id, matches_search, parse_status, profile_names, visible_cases, visible_invoices, Money, PageResult, UNKNOWN_CLIENT};
use crate::auth::Role;
use crate::backend::{Backend, Table};
use crate::config::CurrencyConfig;
use crate::currency::parse_amount;
use crate::error::ApiError;
use crate::filter::Query;
use crate::models::{self, invoice_id, Invoice, InvoiceStatus};
use crate::session::{Notice, SessionView};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceFilter {
    pub search: Option<String>,
    pub status: Option<String>,
    /// Deep link from global search.
    pub invoice: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceRow {
    pub id: String,
    pub case_id: Uuid,
    pub case_title: Option<String>,
    pub client_name: String,
    pub amount: Money,
    pub created_at: DateTime<Utc>,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryLine {
    pub total: Money,
    /// Share of the invoiced total, whole percent.
    pub percent: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct BillingSummary {
    pub total: Money,
    pub paid: SummaryLine,
    pub pending: SummaryLine,
    pub overdue: SummaryLine,
    pub client_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BillingPage {
    pub summary: BillingSummary,
    pub invoices: Vec<InvoiceRow>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewInvoiceForm {
    pub case_id: Uuid,
    #[validate(length(min = 1, message = "Amount is required"))]
    pub amount: String,
    pub due_date: NaiveDate,
}

fn percent_of(part: Decimal, total: Decimal) -> u32 {
    if total.is_zero() {
        return 0;
    }
    let share = (part * Decimal::ONE_HUNDRED / total).round();
    share.to_u32().unwrap_or(0)
}

/// Totals over every row given, whatever the current filter.
pub fn summarize(rows: &[InvoiceRow], currency: &CurrencyConfig) -> BillingSummary {
    let total: Decimal = rows.iter().map(|r| r.amount.amount).sum();
    let line = |status: InvoiceStatus| {
        let sum: Decimal = rows.iter().filter(|r| r.status == status).map(|r| r.amount.amount).sum();
        SummaryLine { total: Money::new(sum, currency), percent: percent_of(sum, total) }
    };
    let clients: HashSet<&str> = rows.iter().map(|r| r.client_name.as_str()).collect();

    BillingSummary {
        total: Money::new(total, currency),
        paid: line(InvoiceStatus::Paid),
        pending: line(InvoiceStatus::Pending),
        overdue: line(InvoiceStatus::Overdue),
        client_count: clients.len(),
    }
}

pub(crate) async fn invoice_rows(backend: &dyn Backend, invoices: Vec<Invoice>, currency: &CurrencyConfig) -> PageResult<Vec<InvoiceRow>> {
    let cases = cases_by_id(backend, invoices.iter().map(|i| i.case_id)).await?;
    let names = profile_names(backend, cases.values().map(|c| c.client_id)).await?;

    Ok(invoices
        .into_iter()
        .map(|invoice| {
            let case = cases.get(&invoice.case_id);
            InvoiceRow {
                client_name: case
                    .and_then(|c| names.get(&c.client_id))
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_CLIENT.to_string()),
                case_title: case.map(|c| c.title.clone()),
                amount: Money::new(invoice.amount, currency),
                id: invoice.id,
                case_id: invoice.case_id,
                created_at: invoice.created_at,
                due_date: invoice.due_date,
                status: invoice.status,
            }
        })
        .collect())
}

/// `GET /billing`
pub async fn billing_page(backend: &dyn Backend, view: &SessionView, filter: &InvoiceFilter, currency: &CurrencyConfig) -> PageResult<BillingPage> {
    let status = parse_status::<InvoiceStatus>(filter.status.as_deref())?;
    let invoices = visible_invoices(backend, view, Query::new().order("created_at desc")).await?;
    let rows = invoice_rows(backend, invoices, currency).await?;
    let summary = summarize(&rows, currency);

    let invoices = rows
        .into_iter()
        .filter(|row| filter.invoice.as_deref().map_or(true, |id| row.id == id))
        .filter(|row| status.map_or(true, |s| s == row.status))
        .filter(|row| {
            let case_id = row.case_id.to_string();
            matches_search(filter.search.as_deref(), &[&row.client_name, &case_id, &row.id])
        })
        .collect();

    Ok(BillingPage { summary, invoices })
}

/// `POST /billing/invoices`: a new Pending invoice on a case the caller
/// handles.
pub async fn create_invoice(
    backend: &dyn Backend,
    view: &SessionView,
    form: NewInvoiceForm,
    currency: &CurrencyConfig,
    now: DateTime<Utc>,
) -> PageResult<(Invoice, Notice)> {
    let profile = view.require(Role::Lawyer)?;
    form.validate()?;

    let amount = parse_amount(&form.amount, currency)
        .filter(|a| a.is_sign_positive() && !a.is_zero())
        .ok_or_else(|| ApiError::field("amount", "Amount must be a positive number"))?;

    let case_id = form.case_id.to_string();
    let cases = visible_cases(backend, view, |query| query.eq("id", case_id).limit(1)).await?;
    if cases.is_empty() {
        return Err(ApiError::field("case_id", "Case is required"));
    }

    let invoice = Invoice {
        id: invoice_id(now),
        case_id: form.case_id,
        amount: amount.round_dp(2),
        due_date: form.due_date,
        status: InvoiceStatus::Pending,
        created_at: now,
    };
    let invoice: Invoice = models::from_row(backend.insert(Table::Invoices, models::to_row(&invoice)?).await?)?;
    info!("Invoice {} raised by {}", invoice.id, profile.id);
    let notice = Notice::success(format!("Invoice {} created successfully", invoice.id));
    Ok((invoice, notice))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::fixtures::{pkr, world};
    use crate::pages::cases::{list_cases, CaseFilter};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn summary_uses_exact_decimal_totals() {
        let w = world().await;
        let page = billing_page(w.backend(), &w.admin, &InvoiceFilter::default(), &pkr()).await.unwrap();
        assert_eq!(page.invoices.len(), 3);
        assert_eq!(page.summary.total.amount, dec("3900.50"));
        assert_eq!(page.summary.total.formatted, "Rs 3,900.50");
        assert_eq!(page.summary.paid.total.amount, dec("1000"));
        assert_eq!(page.summary.pending.total.formatted, "Rs 2,500.50");
        assert_eq!(page.summary.overdue.total.amount, dec("400"));
        assert_eq!(page.summary.pending.percent, 64);
        assert_eq!(page.summary.client_count, 1);
    }

    #[tokio::test]
    async fn filters_do_not_change_the_summary() {
        let w = world().await;
        let filter = InvoiceFilter { search: Some("inv-000003".into()), ..Default::default() };
        let page = billing_page(w.backend(), &w.admin, &filter, &pkr()).await.unwrap();
        assert_eq!(page.invoices.len(), 1);
        assert_eq!(page.invoices[0].client_name, "Ayesha Khan");
        assert_eq!(page.invoices[0].case_title.as_deref(), Some("Family Trust"));
        assert_eq!(page.summary.total.amount, dec("3900.50"));

        let filter = InvoiceFilter { status: Some("paid".into()), ..Default::default() };
        let page = billing_page(w.backend(), &w.admin, &filter, &pkr()).await.unwrap();
        assert_eq!(page.invoices.len(), 1);
        assert_eq!(page.invoices[0].amount.formatted, "Rs 1,000.00");
    }

    #[tokio::test]
    async fn lawyers_see_invoices_on_their_cases_only() {
        let w = world().await;
        let page = billing_page(w.backend(), &w.lawyer, &InvoiceFilter::default(), &pkr()).await.unwrap();
        let mut ids: Vec<&str> = page.invoices.iter().map(|i| i.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["INV-000001", "INV-000002"]);
        assert_eq!(page.summary.total.amount, dec("3500.50"));
    }

    #[tokio::test]
    async fn new_invoices_are_pending_with_a_timestamp_id() {
        let w = world().await;
        let case = list_cases(w.backend(), &w.lawyer, &CaseFilter::default()).await.unwrap().remove(0);
        let now = DateTime::from_timestamp_millis(1_760_000_654_321).unwrap();
        let form = NewInvoiceForm { case_id: case.id, amount: "Rs 12,000.5".into(), due_date: w.today };
        let (invoice, notice) = create_invoice(w.backend(), &w.lawyer, form, &pkr(), now).await.unwrap();
        assert_eq!(invoice.id, "INV-654321");
        assert_eq!(invoice.status, InvoiceStatus::Pending);
        assert_eq!(invoice.amount, dec("12000.50"));
        assert_eq!(notice.message, "Invoice INV-654321 created successfully");
    }

    #[tokio::test]
    async fn invoice_form_rules() {
        let w = world().await;
        let case = list_cases(w.backend(), &w.lawyer, &CaseFilter::default()).await.unwrap().remove(0);

        for bad in ["", "-5", "0", "lots"] {
            let form = NewInvoiceForm { case_id: case.id, amount: bad.into(), due_date: w.today };
            let err = create_invoice(w.backend(), &w.lawyer, form, &pkr(), Utc::now()).await.unwrap_err();
            assert_eq!(err.status_code(), 400, "amount {:?}", bad);
        }

        let form = NewInvoiceForm { case_id: case.id, amount: "100".into(), due_date: w.today };
        let err = create_invoice(w.backend(), &w.other_lawyer, form, &pkr(), Utc::now()).await.unwrap_err();
        assert_eq!(err.to_json()["field_errors"]["case_id"], "Case is required");

        let form = NewInvoiceForm { case_id: case.id, amount: "100".into(), due_date: w.today };
        let err = create_invoice(w.backend(), &w.client, form, &pkr(), Utc::now()).await.unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[test]
    fn percent_handles_zero_total() {
        assert_eq!(percent_of(dec("5"), Decimal::ZERO), 0);
        assert_eq!(percent_of(dec("1"), dec("3")), 33);
    }
}
