// handlers/client/security.rs - Audit log and security settings

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::access::AccessContext;
use crate::audit::{self, AuditEntry};
use crate::database::models::Client;
use crate::handlers::scoped;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::ClientService;
use crate::state::AppState;

const DEFAULT_AUDIT_LIMIT: i64 = 100;
const MAX_AUDIT_LIMIT: i64 = 500;

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<i64>,
}

/// GET /api/clients/:client_id/audit-log
pub async fn audit_log(
    State(state): State<AppState>,
    Extension(ctx): Extension<AccessContext>,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Vec<AuditEntry>> {
    let (_, client_id) = scoped(&ctx)?;
    let limit = query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT).clamp(1, MAX_AUDIT_LIMIT);

    let entries = audit::list_for_client(&state.pool, client_id, limit).await?;
    Ok(ApiResponse::success(entries))
}

#[derive(Debug, Deserialize)]
pub struct SecuritySettings {
    pub require_mfa: bool,
}

/// PUT /api/clients/:client_id/security
pub async fn update_security(
    State(state): State<AppState>,
    Extension(ctx): Extension<AccessContext>,
    Json(payload): Json<SecuritySettings>,
) -> ApiResult<Client> {
    let (identity, client_id) = scoped(&ctx)?;

    let client = ClientService::new(state.pool)
        .set_require_mfa(client_id, payload.require_mfa, identity.user_id)
        .await?;

    Ok(ApiResponse::success(client))
}
