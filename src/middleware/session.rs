use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::auth::cookies::extract_session_token;

/// Raw token the request arrived with, for handlers that act on the session
/// itself (sign-out, refresh).
#[derive(Clone, Debug)]
pub struct SessionToken(pub String);

/// Resolves the caller's session once per request and stores the
/// [`SessionView`](crate::session::SessionView) in the request extensions.
pub async fn session_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let token = extract_session_token(request.headers());
    let view = state.sessions.resolve(token.as_deref()).await;

    tracing::debug!(status = ?view.status(), user = ?view.user_id(), "Resolved session");

    if let Some(token) = token {
        request.extensions_mut().insert(SessionToken(token));
    }
    request.extensions_mut().insert(view);
    next.run(request).await
}
