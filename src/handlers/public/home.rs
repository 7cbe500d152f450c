// handlers/public/home.rs - GET /, GET /health and the not-found fallback

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde_json::json;

use crate::app::AppState;
use crate::routes::AppRoute;
use crate::session::SessionView;

/// GET / - send the browser to the dashboard or the sign-in page.
pub async fn index(Extension(view): Extension<SessionView>) -> Response {
    let target = if view.has_session() { AppRoute::Dashboard } else { AppRoute::Auth };
    let mut response = (
        StatusCode::SEE_OTHER,
        Json(json!({ "success": true, "redirect": target.path() })),
    )
        .into_response();
    response.headers_mut().insert(header::LOCATION, HeaderValue::from_static(target.path()));
    response
}

pub async fn health(State(state): State<AppState>) -> Response {
    let now = chrono::Utc::now();

    match state.backend.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "version": env!("CARGO_PKG_VERSION"),
                    "backend": state.config.backend,
                }
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "backend unavailable",
                    "data": { "status": "degraded", "timestamp": now }
                })),
            )
                .into_response()
        }
    }
}

pub async fn not_found(uri: Uri) -> Response {
    tracing::debug!("No route for {}", uri.path());
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": true,
            "code": "NOT_FOUND",
            "message": "Oops! Page not found",
            "path": uri.path(),
            "home": AppRoute::Index.path(),
        })),
    )
        .into_response()
}
