use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Catalog control joined with one client's implementation state
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClientControl {
    pub id: i64,
    pub control_id: i64,
    pub framework_code: String,
    pub code: String,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub owner_id: Option<Uuid>,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Catalog text used for evidence matching
#[derive(Debug, Clone, FromRow)]
pub struct ControlMatchText {
    pub id: i64,
    pub code: String,
    pub title: String,
    pub description: Option<String>,
}
