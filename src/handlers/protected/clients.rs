// handlers/protected/clients.rs - GET /api/clients

use axum::{extract::State, Extension};

use crate::access::AccessContext;
use crate::database::models::Client;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::ClientService;
use crate::state::AppState;

/// GET /api/clients - Clients the caller belongs to
pub async fn list(State(state): State<AppState>, Extension(ctx): Extension<AccessContext>) -> ApiResult<Vec<Client>> {
    let identity = ctx.identity()?;
    let clients = ClientService::new(state.pool).list_for_user(identity.user_id).await?;

    Ok(ApiResponse::success(clients))
}
