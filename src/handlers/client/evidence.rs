// handlers/client/evidence.rs - POST /api/clients/:client_id/evidence/suggestions

use axum::{extract::State, Extension, Json};
use serde::Deserialize;

use crate::access::AccessContext;
use crate::compliance::{suggest_evidence_mappings, ControlText, EvidenceSuggestion};
use crate::error::ApiError;
use crate::handlers::scoped;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::ControlService;
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 5;
const MAX_LIMIT: usize = 25;

#[derive(Debug, Deserialize)]
pub struct SuggestionRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl SuggestionRequest {
    fn text(&self) -> String {
        match &self.description {
            Some(description) => format!("{} {}", self.title, description),
            None => self.title.clone(),
        }
    }

    fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

/// Suggest which of the client's controls a piece of evidence supports
pub async fn suggestions(
    State(state): State<AppState>,
    Extension(ctx): Extension<AccessContext>,
    Json(payload): Json<SuggestionRequest>,
) -> ApiResult<Vec<EvidenceSuggestion>> {
    let (_, client_id) = scoped(&ctx)?;
    if payload.title.trim().is_empty() {
        return Err(ApiError::field_error("title", "must not be empty"));
    }

    let controls = ControlService::new(state.pool).match_texts(client_id).await?;
    let texts: Vec<ControlText<'_>> = controls
        .iter()
        .map(|control| ControlText {
            id: control.id,
            code: &control.code,
            title: &control.title,
            description: control.description.as_deref(),
        })
        .collect();

    let suggestions = suggest_evidence_mappings(&payload.text(), &texts, payload.limit());
    Ok(ApiResponse::success(suggestions))
}
