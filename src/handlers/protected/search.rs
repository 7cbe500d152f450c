// handlers/protected/search.rs - GET /search?q=

use axum::{
    extract::{Query, State},
    Extension,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::pages::search::{global_search, SearchResult};
use crate::session::SessionView;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

pub async fn search_get(
    State(state): State<AppState>,
    Extension(mut view): Extension<SessionView>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Vec<SearchResult>> {
    let results = global_search(state.backend.as_ref(), &view, &query.q, state.config.search.limit).await?;
    Ok(ApiResponse::success(results).notices(view.take_notices()))
}
