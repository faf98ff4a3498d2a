// handlers/client/board.rs - /api/clients/:client_id/board

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::access::AccessContext;
use crate::error::ApiError;
use crate::handlers::scoped;
use crate::kanban::{BoardColumn, KanbanStatus, WorkItemKind};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{BoardService, MovedItem};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BoardQuery {
    /// Comma separated kinds, e.g. `task,policy`; all kinds when absent
    pub kinds: Option<String>,
}

fn parse_kinds(raw: Option<&str>) -> Result<Vec<WorkItemKind>, ApiError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<WorkItemKind>().map_err(|e| ApiError::field_error("kinds", e.to_string())))
        .collect()
}

/// GET /api/clients/:client_id/board
pub async fn show(
    State(state): State<AppState>,
    Extension(ctx): Extension<AccessContext>,
    Query(query): Query<BoardQuery>,
) -> ApiResult<Vec<BoardColumn>> {
    let (_, client_id) = scoped(&ctx)?;
    let kinds = parse_kinds(query.kinds.as_deref())?;

    let board = BoardService::new(state.pool).board(client_id, &kinds).await?;
    Ok(ApiResponse::success(board))
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub kind: WorkItemKind,
    pub id: i64,
    pub status: KanbanStatus,
}

/// POST /api/clients/:client_id/board/move
pub async fn move_item(
    State(state): State<AppState>,
    Extension(ctx): Extension<AccessContext>,
    Json(payload): Json<MoveRequest>,
) -> ApiResult<MovedItem> {
    let (identity, client_id) = scoped(&ctx)?;

    let moved = BoardService::new(state.pool)
        .move_item(client_id, payload.kind, payload.id, payload.status, identity.user_id)
        .await?;

    Ok(ApiResponse::success(moved))
}
