// handlers/protected/dashboard.rs - GET /dashboard

use axum::{extract::State, Extension};
use chrono::Utc;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::pages::dashboard::{dashboard, Dashboard};
use crate::session::SessionView;

pub async fn dashboard_get(State(state): State<AppState>, Extension(mut view): Extension<SessionView>) -> ApiResult<Dashboard> {
    let page = dashboard(state.backend.as_ref(), &view, &state.config.currency, Utc::now().date_naive()).await?;
    Ok(ApiResponse::success(page).notices(view.take_notices()))
}
