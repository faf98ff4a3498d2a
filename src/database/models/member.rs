use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::access::ClientId;

/// A user's membership as seen from the client
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClientMember {
    pub user_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// A user's membership as seen from the user
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Membership {
    pub client_id: ClientId,
    pub client_name: String,
    pub role: String,
}
