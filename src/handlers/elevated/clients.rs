// handlers/elevated/clients.rs - /api/admin/clients

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::access::{AccessContext, ClientId, PlanTier};
use crate::database::models::Client;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::ClientService;
use crate::state::AppState;

/// GET /api/admin/clients - Every active client
pub async fn list_all(State(state): State<AppState>) -> ApiResult<Vec<Client>> {
    let clients = ClientService::new(state.pool).list_all().await?;
    Ok(ApiResponse::success(clients))
}

#[derive(Debug, Deserialize)]
pub struct CreateClientRequest {
    pub name: String,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default = "default_plan")]
    pub plan_tier: PlanTier,
    pub owner_id: Uuid,
}

fn default_plan() -> PlanTier {
    PlanTier::Free
}

/// POST /api/admin/clients - Create a client with an initial owner
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<AccessContext>,
    Json(payload): Json<CreateClientRequest>,
) -> ApiResult<Client> {
    let identity = ctx.identity()?;

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::field_error("name", "must not be empty"));
    }

    let client = ClientService::new(state.pool)
        .create(name, payload.industry.as_deref(), payload.plan_tier, payload.owner_id, identity.user_id)
        .await?;

    Ok(ApiResponse::created(client))
}

#[derive(Debug, Deserialize)]
pub struct SetPlanRequest {
    pub plan_tier: PlanTier,
}

/// PUT /api/admin/clients/:client_id/plan
pub async fn set_plan(
    State(state): State<AppState>,
    Extension(ctx): Extension<AccessContext>,
    Path(client_id): Path<ClientId>,
    Json(payload): Json<SetPlanRequest>,
) -> ApiResult<Client> {
    let identity = ctx.identity()?;

    let client = ClientService::new(state.pool)
        .set_plan(client_id, payload.plan_tier, identity.user_id)
        .await?;

    tracing::info!("Client {} moved to plan {} by {}", client_id, payload.plan_tier.as_str(), identity.email);
    Ok(ApiResponse::success(client))
}
