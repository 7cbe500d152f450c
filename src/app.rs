//! Router assembly and shared request state.

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::Role;
use crate::backend::Backend;
use crate::config::AppConfig;
use crate::handlers::{elevated, protected, public};
use crate::middleware::{require_access, session_middleware};
use crate::session::SessionProvider;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub backend: Arc<dyn Backend>,
    pub sessions: Arc<SessionProvider>,
}

impl AppState {
    pub fn new(config: AppConfig, backend: Arc<dyn Backend>) -> Self {
        let sessions = Arc::new(SessionProvider::new(backend.clone()));
        Self {
            config: Arc::new(config),
            backend,
            sessions,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .merge(public_routes())
        .merge(protected_routes())
        .merge(elevated_routes())
        .fallback(public::home::not_found)
        .layer(middleware::from_fn_with_state(state.clone(), session_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// Tier 1: no session required
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(public::home::index))
        .route("/health", get(public::home::health))
        .route("/auth", get(public::auth::auth_page))
        .route("/auth/sign-in", post(public::auth::sign_in))
        .route("/auth/sign-up", post(public::auth::sign_up))
        .route("/auth/sign-out", post(public::auth::sign_out))
        .route("/auth/refresh", post(public::auth::refresh))
}

// Tier 2: any signed-in user
fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(protected::dashboard::dashboard_get))
        .route("/cases", get(protected::cases::cases_get).post(protected::cases::cases_post))
        .route("/cases/daily", get(protected::cases::daily_get))
        .route("/cases/:id", patch(protected::cases::case_patch))
        .route("/active-cases", get(protected::cases::active_get))
        .route("/calendar", get(protected::calendar::calendar_get))
        .route("/calendar/hearings", post(protected::calendar::hearings_post))
        .route("/billing", get(protected::billing::billing_get))
        .route("/billing/invoices", post(protected::billing::invoices_post))
        .route("/settings", get(protected::settings::settings_get))
        .route("/search", get(protected::search::search_get))
        .route_layer(middleware::from_fn_with_state(None, require_access))
}

// Tier 3: administrators only
fn elevated_routes() -> Router<AppState> {
    Router::new()
        .route("/clients", get(elevated::clients::clients_get).post(elevated::clients::clients_post))
        .route("/admin", get(elevated::admin::admin_get))
        .route("/admin/users", post(elevated::admin::users_post))
        .route_layer(middleware::from_fn_with_state(Some(Role::Admin), require_access))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}
