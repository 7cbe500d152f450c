// handlers/protected/settings.rs - GET /settings

use axum::{extract::State, Extension};

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::pages::settings::{settings_page, SettingsPage};
use crate::session::SessionView;

pub async fn settings_get(State(state): State<AppState>, Extension(mut view): Extension<SessionView>) -> ApiResult<SettingsPage> {
    let page = settings_page(&view, &state.config.currency)?;
    Ok(ApiResponse::success(page).notices(view.take_notices()))
}
