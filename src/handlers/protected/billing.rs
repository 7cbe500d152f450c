// handlers/protected/billing.rs - GET /billing, POST /billing/invoices

use axum::{
    extract::{Query, State},
    Extension,
};
use chrono::Utc;

use crate::app::AppState;
use crate::handlers::JsonBody;
use crate::middleware::{ApiResponse, ApiResult};
use crate::models::Invoice;
use crate::pages::billing::{billing_page, create_invoice, BillingPage, InvoiceFilter, NewInvoiceForm};
use crate::session::SessionView;

pub async fn billing_get(
    State(state): State<AppState>,
    Extension(mut view): Extension<SessionView>,
    Query(filter): Query<InvoiceFilter>,
) -> ApiResult<BillingPage> {
    let page = billing_page(state.backend.as_ref(), &view, &filter, &state.config.currency).await?;
    Ok(ApiResponse::success(page).notices(view.take_notices()))
}

pub async fn invoices_post(
    State(state): State<AppState>,
    Extension(mut view): Extension<SessionView>,
    JsonBody(form): JsonBody<NewInvoiceForm>,
) -> ApiResult<Invoice> {
    let (invoice, notice) = create_invoice(state.backend.as_ref(), &view, form, &state.config.currency, Utc::now()).await?;
    Ok(ApiResponse::created(invoice).notices(view.take_notices()).notice(notice))
}
