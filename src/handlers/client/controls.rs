// handlers/client/controls.rs - /api/clients/:client_id/controls

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::access::{AccessContext, ClientId};
use crate::database::models::ClientControl;
use crate::error::ApiError;
use crate::handlers::scoped;
use crate::kanban::WorkItemKind;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{ControlService, ControlUpdate};
use crate::state::AppState;
use crate::types::Patch;

#[derive(Debug, Deserialize)]
pub struct ControlQuery {
    /// Restrict to one framework code, e.g. `pci-dss-4`
    pub framework: Option<String>,
}

/// GET /api/clients/:client_id/controls
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<AccessContext>,
    Query(query): Query<ControlQuery>,
) -> ApiResult<Vec<ClientControl>> {
    let (_, client_id) = scoped(&ctx)?;
    let controls = ControlService::new(state.pool)
        .list(client_id, query.framework.as_deref())
        .await?;

    Ok(ApiResponse::success(controls))
}

#[derive(Debug, Deserialize)]
pub struct UpdateControlRequest {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub notes: Patch<String>,
    #[serde(default)]
    pub owner_id: Patch<Uuid>,
}

impl UpdateControlRequest {
    fn into_update(self) -> Result<ControlUpdate, ApiError> {
        if let Some(status) = &self.status {
            if !WorkItemKind::Control.is_known_status(status) {
                let allowed: Vec<&str> = WorkItemKind::Control.statuses().collect();
                return Err(ApiError::field_error(
                    "status",
                    format!("must be one of: {}", allowed.join(", ")),
                ));
            }
        }

        if self.status.is_none() && self.notes.is_unchanged() && self.owner_id.is_unchanged() {
            return Err(ApiError::bad_request("No fields to update"));
        }

        Ok(ControlUpdate {
            status: self.status,
            notes: self.notes,
            owner_id: self.owner_id,
        })
    }
}

/// PATCH /api/clients/:client_id/controls/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<AccessContext>,
    Path((_, id)): Path<(ClientId, i64)>,
    Json(payload): Json<UpdateControlRequest>,
) -> ApiResult<ClientControl> {
    let (identity, client_id) = scoped(&ctx)?;
    let update = payload.into_update()?;

    let control = ControlService::new(state.pool)
        .update(client_id, id, update, identity.user_id)
        .await?;

    Ok(ApiResponse::success(control))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(body: &str) -> UpdateControlRequest {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = request(r#"{"status": "done"}"#).into_update().unwrap_err();
        assert!(matches!(err, ApiError::ValidationError { .. }));
    }

    #[test]
    fn empty_update_is_rejected() {
        assert!(matches!(request("{}").into_update(), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn null_notes_clears() {
        let update = request(r#"{"notes": null}"#).into_update().unwrap();
        assert_eq!(update.notes, Patch::Clear);
        assert!(update.owner_id.is_unchanged());
        assert!(update.status.is_none());
    }
}
