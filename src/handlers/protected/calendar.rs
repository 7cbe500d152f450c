// handlers/protected/calendar.rs - GET /calendar, POST /calendar/hearings

use axum::{
    extract::{Query, State},
    Extension,
};
use chrono::Utc;
use serde::Deserialize;

use crate::app::AppState;
use crate::handlers::{date_or_today, JsonBody};
use crate::middleware::{ApiResponse, ApiResult};
use crate::pages::calendar::{calendar_page, schedule_hearing, CalendarPage, HearingEvent, HearingForm};
use crate::session::SessionView;

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub date: Option<String>,
}

pub async fn calendar_get(
    State(state): State<AppState>,
    Extension(mut view): Extension<SessionView>,
    Query(query): Query<CalendarQuery>,
) -> ApiResult<CalendarPage> {
    let selected = date_or_today(query.date.as_deref())?;
    let page = calendar_page(state.backend.as_ref(), &view, selected).await?;
    Ok(ApiResponse::success(page).notices(view.take_notices()))
}

pub async fn hearings_post(
    State(state): State<AppState>,
    Extension(mut view): Extension<SessionView>,
    JsonBody(form): JsonBody<HearingForm>,
) -> ApiResult<HearingEvent> {
    let (event, notice) = schedule_hearing(state.backend.as_ref(), &view, form, Utc::now().date_naive()).await?;
    Ok(ApiResponse::success(event).notices(view.take_notices()).notice(notice))
}
