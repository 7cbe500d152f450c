// handlers/public/auth.rs - /auth page and session actions
//
// Sign-in answers 303 → /dashboard with the session cookie; sign-out answers
// 303 → /auth and expires it. The token is also returned in the body for
// API clients that send it as a Bearer header instead.

use axum::{extract::State, Extension};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::app::AppState;
use crate::auth::cookies::{clear_session_cookie, session_cookie};
use crate::auth::password::validate_password_length;
use crate::backend::{AuthUser, SignUp};
use crate::error::ApiError;
use crate::handlers::JsonBody;
use crate::middleware::{ApiResponse, ApiResult, SessionToken};
use crate::routes::AppRoute;
use crate::session::{requested_role, SessionView};

#[derive(Debug, Serialize)]
pub struct AuthPage {
    pub signed_in: bool,
    pub allow_sign_up: bool,
    pub min_password_length: u64,
    pub actions: [&'static str; 3],
}

#[derive(Debug, Deserialize)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignUpForm {
    #[validate(email(message = "Please enter a valid email address."))]
    pub email: String,
    pub password: String,
    #[validate(length(min = 2, message = "Full name must be at least 2 characters."))]
    pub full_name: String,
    /// Ignored beyond logging: self-service accounts are always clients.
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionBody {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: AuthUser,
}

/// GET /auth
pub async fn auth_page(State(state): State<AppState>, Extension(mut view): Extension<SessionView>) -> ApiResponse<AuthPage> {
    let page = AuthPage {
        signed_in: view.has_session(),
        allow_sign_up: state.config.auth.allow_sign_up,
        min_password_length: state.config.auth.min_password_length,
        actions: ["/auth/sign-in", "/auth/sign-up", "/auth/sign-out"],
    };
    ApiResponse::success(page).notices(view.take_notices())
}

/// POST /auth/sign-in
pub async fn sign_in(State(state): State<AppState>, JsonBody(form): JsonBody<SignInForm>) -> ApiResult<SessionBody> {
    let session = state.sessions.sign_in(form.email.trim(), &form.password).await?;
    let cookie = session_cookie(
        &session.access_token,
        state.config.security.session_expiry_hours,
        state.config.security.cookie_secure,
    );

    let body = SessionBody {
        access_token: session.access_token,
        expires_at: session.expires_at,
        user: session.user,
    };
    Ok(ApiResponse::see_other(body, AppRoute::Dashboard.path()).cookie(cookie))
}

/// POST /auth/sign-up
pub async fn sign_up(State(state): State<AppState>, JsonBody(form): JsonBody<SignUpForm>) -> ApiResult<AuthUser> {
    if !state.config.auth.allow_sign_up {
        return Err(ApiError::forbidden("Sign up is disabled; ask an administrator for an account"));
    }
    form.validate()?;
    validate_password_length(&form.password, state.config.auth.min_password_length)
        .map_err(|msg| ApiError::field("password", msg))?;

    let request = SignUp {
        email: form.email.trim().to_string(),
        password: form.password,
        full_name: form.full_name.trim().to_string(),
        requested_role: requested_role(form.role.as_deref()),
    };
    let (user, notice) = state.sessions.sign_up(request).await?;
    Ok(ApiResponse::created(user).notice(notice))
}

/// POST /auth/sign-out. Without a session there is nothing to revoke; the
/// cookie is cleared either way.
pub async fn sign_out(State(state): State<AppState>, token: Option<Extension<SessionToken>>) -> ApiResult<()> {
    let mut response = ApiResponse::see_other((), AppRoute::Auth.path()).cookie(clear_session_cookie());
    if let Some(Extension(SessionToken(token))) = token {
        response = response.notice(state.sessions.sign_out(&token).await?);
    }
    Ok(response)
}

/// POST /auth/refresh
pub async fn refresh(State(state): State<AppState>, token: Option<Extension<SessionToken>>) -> ApiResult<SessionBody> {
    let Some(Extension(SessionToken(token))) = token else {
        return Err(ApiError::unauthorized("No session to refresh"));
    };
    let session = state.sessions.refresh(&token).await?;
    let cookie = session_cookie(
        &session.access_token,
        state.config.security.session_expiry_hours,
        state.config.security.cookie_secure,
    );

    let body = SessionBody {
        access_token: session.access_token,
        expires_at: session.expires_at,
        user: session.user,
    };
    Ok(ApiResponse::success(body).cookie(cookie))
}
