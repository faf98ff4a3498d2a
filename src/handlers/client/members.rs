// handlers/client/members.rs - /api/clients/:client_id/members

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::access::{AccessContext, ClientId, ClientRole};
use crate::database::models::ClientMember;
use crate::error::ApiError;
use crate::handlers::scoped;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::MemberService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub email: String,
    pub role: ClientRole,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: ClientRole,
}

/// Member management is limited to client owners/admins and platform admins.
/// Granting the owner role, and changing or removing an existing owner, is
/// further limited to owners and platform admins.
fn ensure_can_manage(ctx: &AccessContext, current: Option<ClientRole>, granted: Option<ClientRole>) -> Result<(), ApiError> {
    if !ctx.can_manage_members() {
        return Err(ApiError::forbidden("Only client owners and admins can manage members"));
    }

    let acts_as_owner = ctx.is_elevated() || ctx.client_role == Some(ClientRole::Owner);
    if granted == Some(ClientRole::Owner) && !acts_as_owner {
        return Err(ApiError::forbidden("Only owners can grant the owner role"));
    }
    if current == Some(ClientRole::Owner) && !acts_as_owner {
        return Err(ApiError::forbidden("Only owners can change or remove an owner"));
    }

    Ok(())
}

/// GET /api/clients/:client_id/members
pub async fn list(State(state): State<AppState>, Extension(ctx): Extension<AccessContext>) -> ApiResult<Vec<ClientMember>> {
    let (_, client_id) = scoped(&ctx)?;
    let members = MemberService::new(state.pool).list(client_id).await?;

    Ok(ApiResponse::success(members))
}

/// POST /api/clients/:client_id/members
pub async fn add(
    State(state): State<AppState>,
    Extension(ctx): Extension<AccessContext>,
    Json(payload): Json<AddMemberRequest>,
) -> ApiResult<ClientMember> {
    let (identity, client_id) = scoped(&ctx)?;
    ensure_can_manage(&ctx, None, Some(payload.role))?;

    let email = payload.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::field_error("email", "must be a valid email address"));
    }

    let member = MemberService::new(state.pool)
        .add(client_id, email, payload.role, identity.user_id)
        .await?;

    Ok(ApiResponse::created(member))
}

/// PATCH /api/clients/:client_id/members/:user_id
pub async fn update_role(
    State(state): State<AppState>,
    Extension(ctx): Extension<AccessContext>,
    Path((_, user_id)): Path<(ClientId, Uuid)>,
    Json(payload): Json<UpdateRoleRequest>,
) -> ApiResult<ClientMember> {
    let (identity, client_id) = scoped(&ctx)?;
    ensure_can_manage(&ctx, None, Some(payload.role))?;

    let members = MemberService::new(state.pool);
    let current = members.role_of(client_id, user_id).await?;
    ensure_can_manage(&ctx, Some(current), Some(payload.role))?;

    let member = members
        .change_role(client_id, user_id, current, payload.role, identity.user_id)
        .await?;

    Ok(ApiResponse::success(member))
}

/// DELETE /api/clients/:client_id/members/:user_id
pub async fn remove(
    State(state): State<AppState>,
    Extension(ctx): Extension<AccessContext>,
    Path((_, user_id)): Path<(ClientId, Uuid)>,
) -> ApiResult<()> {
    let (identity, client_id) = scoped(&ctx)?;
    ensure_can_manage(&ctx, None, None)?;

    let members = MemberService::new(state.pool);
    let current = members.role_of(client_id, user_id).await?;
    ensure_can_manage(&ctx, Some(current), None)?;

    members.remove(client_id, user_id, current, identity.user_id).await?;

    Ok(ApiResponse::no_content())
}
