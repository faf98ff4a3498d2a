use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::roles::{ClientRole, PlanTier};
use super::ClientId;
use crate::database::DatabaseError;

/// Lookups the access chain needs about clients and memberships
#[async_trait]
pub trait AccessDirectory: Send + Sync {
    /// Membership role of `user_id` in `client_id`, if any
    async fn membership_role(&self, user_id: Uuid, client_id: ClientId) -> Result<Option<ClientRole>, DatabaseError>;

    /// Plan tier of the client, `None` when the client does not exist
    async fn plan_tier(&self, client_id: ClientId) -> Result<Option<PlanTier>, DatabaseError>;

    /// Whether the client mandates a second authentication factor
    async fn requires_mfa(&self, client_id: ClientId) -> Result<bool, DatabaseError>;
}

/// Directory backed by the `clients` and `client_members` tables
#[derive(Clone)]
pub struct PgAccessDirectory {
    pool: PgPool,
}

impl PgAccessDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessDirectory for PgAccessDirectory {
    async fn membership_role(&self, user_id: Uuid, client_id: ClientId) -> Result<Option<ClientRole>, DatabaseError> {
        let role: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT m.role
            FROM client_members m
            JOIN clients c ON c.id = m.client_id
            WHERE m.user_id = $1
            AND m.client_id = $2
            AND c.deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(role.map(|(role,)| ClientRole::from_db(&role)))
    }

    async fn plan_tier(&self, client_id: ClientId) -> Result<Option<PlanTier>, DatabaseError> {
        let tier: Option<(String,)> =
            sqlx::query_as("SELECT plan_tier FROM clients WHERE id = $1 AND deleted_at IS NULL")
                .bind(client_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(tier.map(|(tier,)| PlanTier::from_db(&tier)))
    }

    async fn requires_mfa(&self, client_id: ClientId) -> Result<bool, DatabaseError> {
        let flag: Option<(bool,)> =
            sqlx::query_as("SELECT require_mfa FROM clients WHERE id = $1 AND deleted_at IS NULL")
                .bind(client_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(flag.map(|(flag,)| flag).unwrap_or(false))
    }
}
