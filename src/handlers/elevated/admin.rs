// handlers/elevated/admin.rs - GET /admin, POST /admin/users

use axum::{extract::State, Extension};

use crate::app::AppState;
use crate::backend::AuthUser;
use crate::handlers::JsonBody;
use crate::middleware::{ApiResponse, ApiResult};
use crate::pages::admin::{create_user, overview, AdminOverview, NewUserForm};
use crate::session::SessionView;

pub async fn admin_get(State(state): State<AppState>, Extension(mut view): Extension<SessionView>) -> ApiResult<AdminOverview> {
    let page = overview(state.backend.as_ref(), &view).await?;
    Ok(ApiResponse::success(page).notices(view.take_notices()))
}

/// The guard already requires admin; `create_user_account` checks again so
/// the rule holds for any caller of the provider.
pub async fn users_post(
    State(state): State<AppState>,
    Extension(mut view): Extension<SessionView>,
    JsonBody(form): JsonBody<NewUserForm>,
) -> ApiResult<AuthUser> {
    let (user, notice) = create_user(&state.sessions, &view, form, state.config.auth.min_password_length).await?;
    Ok(ApiResponse::created(user).notices(view.take_notices()).notice(notice))
}
