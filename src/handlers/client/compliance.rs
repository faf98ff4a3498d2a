// handlers/client/compliance.rs - GET /api/clients/:client_id/compliance

use axum::{extract::State, Extension};

use crate::access::AccessContext;
use crate::handlers::scoped;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{ComplianceSummary, ControlService};
use crate::state::AppState;

/// GET /api/clients/:client_id/compliance - Implementation percentage overall and per framework
pub async fn summary(State(state): State<AppState>, Extension(ctx): Extension<AccessContext>) -> ApiResult<ComplianceSummary> {
    let (_, client_id) = scoped(&ctx)?;
    let summary = ControlService::new(state.pool).compliance(client_id).await?;

    Ok(ApiResponse::success(summary))
}
