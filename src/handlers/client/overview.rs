// handlers/client/overview.rs - GET /api/clients/:client_id

use axum::{extract::State, Extension};
use serde::Serialize;

use crate::access::{AccessContext, ClientRole};
use crate::database::models::Client;
use crate::handlers::scoped;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::ClientService;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ClientDetail {
    #[serde(flatten)]
    pub client: Client,
    pub role: Option<ClientRole>,
}

/// GET /api/clients/:client_id - Client detail with the caller's role
pub async fn show(State(state): State<AppState>, Extension(ctx): Extension<AccessContext>) -> ApiResult<ClientDetail> {
    let (_, client_id) = scoped(&ctx)?;
    let client = ClientService::new(state.pool).get(client_id).await?;

    Ok(ApiResponse::success(ClientDetail {
        client,
        role: ctx.client_role,
    }))
}
