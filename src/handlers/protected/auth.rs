// handlers/protected/auth.rs - GET /api/auth/whoami

use axum::{extract::State, Extension};
use serde::Serialize;

use crate::access::{AccessContext, Identity};
use crate::database::models::Membership;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::ClientService;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct WhoAmI {
    pub identity: Identity,
    pub memberships: Vec<Membership>,
}

/// GET /api/auth/whoami - Caller identity and client memberships
pub async fn whoami(State(state): State<AppState>, Extension(ctx): Extension<AccessContext>) -> ApiResult<WhoAmI> {
    let identity = ctx.identity()?.clone();
    let memberships = ClientService::new(state.pool).memberships(identity.user_id).await?;

    Ok(ApiResponse::success(WhoAmI { identity, memberships }))
}
