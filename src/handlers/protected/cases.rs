// handlers/protected/cases.rs - /cases, /cases/daily, /cases/:id, /active-cases

use axum::{
    extract::{Path, Query, State},
    Extension,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::handlers::{date_or_today, JsonBody};
use crate::middleware::{ApiResponse, ApiResult};
use crate::models::Case;
use crate::pages::cases::{self, CaseFilter, CaseRow, CaseUpdateForm, NewCaseForm};
use crate::session::SessionView;

#[derive(Debug, Deserialize)]
pub struct DailyQuery {
    pub date: Option<String>,
}

pub async fn cases_get(
    State(state): State<AppState>,
    Extension(mut view): Extension<SessionView>,
    Query(filter): Query<CaseFilter>,
) -> ApiResult<Vec<CaseRow>> {
    let rows = cases::list_cases(state.backend.as_ref(), &view, &filter).await?;
    Ok(ApiResponse::success(rows).notices(view.take_notices()))
}

pub async fn active_get(
    State(state): State<AppState>,
    Extension(mut view): Extension<SessionView>,
    Query(filter): Query<CaseFilter>,
) -> ApiResult<Vec<CaseRow>> {
    let rows = cases::active_cases(state.backend.as_ref(), &view, &filter).await?;
    Ok(ApiResponse::success(rows).notices(view.take_notices()))
}

pub async fn daily_get(
    State(state): State<AppState>,
    Extension(mut view): Extension<SessionView>,
    Query(query): Query<DailyQuery>,
) -> ApiResult<Vec<CaseRow>> {
    let date = date_or_today(query.date.as_deref())?;
    let rows = cases::daily_cases(state.backend.as_ref(), &view, date).await?;
    Ok(ApiResponse::success(rows).notices(view.take_notices()))
}

pub async fn cases_post(
    State(state): State<AppState>,
    Extension(mut view): Extension<SessionView>,
    JsonBody(form): JsonBody<NewCaseForm>,
) -> ApiResult<Case> {
    let (case, notice) = cases::create_case(state.backend.as_ref(), &view, form).await?;
    Ok(ApiResponse::created(case).notices(view.take_notices()).notice(notice))
}

pub async fn case_patch(
    State(state): State<AppState>,
    Extension(mut view): Extension<SessionView>,
    Path(id): Path<Uuid>,
    JsonBody(form): JsonBody<CaseUpdateForm>,
) -> ApiResult<Case> {
    let (case, notice) = cases::update_case(state.backend.as_ref(), &view, id, form).await?;
    Ok(ApiResponse::success(case).notices(view.take_notices()).notice(notice))
}
