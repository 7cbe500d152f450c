// handlers/mod.rs - 3-tier handler layout
//
// Public (no session) → Protected (any session) → Elevated (admin session).
// The tier a handler lives in matches the guard layer its routes sit behind;
// see `app::router`.

pub mod elevated;
pub mod protected;
pub mod public;

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use chrono::{NaiveDate, Utc};

use crate::error::ApiError;
use crate::pages::parse_date;

/// `Json<T>` whose rejection is an [`ApiError`], so malformed bodies get the
/// same error envelope as everything else.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(request, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => {
                tracing::debug!("Rejected request body: {}", rejection.body_text());
                Err(ApiError::invalid_json(rejection.body_text()))
            }
        }
    }
}

/// `?date=` parameter, today when absent or blank.
pub(crate) fn date_or_today(raw: Option<&str>) -> Result<NaiveDate, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(Utc::now().date_naive()),
        Some(raw) => parse_date("date", raw),
    }
}
