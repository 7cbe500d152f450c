use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::auth::Role;
use crate::guard::{check, Access};
use crate::session::SessionView;

/// Route-group gate. The state is the role the group needs on top of a
/// session; `None` for pages any signed-in user may open.
///
/// Runs after [`session_middleware`](super::session::session_middleware).
pub async fn require_access(State(required): State<Option<Role>>, request: Request, next: Next) -> Response {
    let access = match request.extensions().get::<SessionView>() {
        Some(view) => check(view, required),
        None => {
            tracing::error!("Access guard ran without a resolved session");
            return crate::error::ApiError::internal_server_error("Session was not resolved").into_response();
        }
    };

    match access {
        Access::Granted => next.run(request).await,
        Access::Loading => {
            let mut response = (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "success": false, "loading": true })),
            )
                .into_response();
            response.headers_mut().insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
            response
        }
        Access::Redirect(route) => {
            tracing::debug!("Redirecting {} to {}", request.uri().path(), route.path());
            let mut response = (
                StatusCode::SEE_OTHER,
                Json(json!({ "success": false, "redirect": route.path() })),
            )
                .into_response();
            response.headers_mut().insert(header::LOCATION, HeaderValue::from_static(route.path()));
            response
        }
    }
}
