// handlers/elevated/clients.rs - GET /clients, POST /clients

use axum::{
    extract::{Query, State},
    Extension,
};

use crate::app::AppState;
use crate::handlers::JsonBody;
use crate::middleware::{ApiResponse, ApiResult};
use crate::pages::clients::{create_client, list_clients, ClientFilter, ClientRow, CreatedClient, NewClientForm};
use crate::session::SessionView;

pub async fn clients_get(
    State(state): State<AppState>,
    Extension(mut view): Extension<SessionView>,
    Query(filter): Query<ClientFilter>,
) -> ApiResult<Vec<ClientRow>> {
    let rows = list_clients(state.backend.as_ref(), &view, &filter).await?;
    Ok(ApiResponse::success(rows).notices(view.take_notices()))
}

pub async fn clients_post(
    State(state): State<AppState>,
    Extension(mut view): Extension<SessionView>,
    JsonBody(form): JsonBody<NewClientForm>,
) -> ApiResult<CreatedClient> {
    let (created, notice) = create_client(state.backend.as_ref(), &view, form).await?;
    Ok(ApiResponse::created(created).notices(view.take_notices()).notice(notice))
}
