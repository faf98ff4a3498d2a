use sqlx::PgPool;
use uuid::Uuid;

use crate::access::{ClientId, ClientRole, PlanTier};
use crate::audit::{self, AuditEvent};
use crate::database::models::{Client, Membership, User};
use crate::database::DatabaseError;

const CLIENT_COLUMNS: &str = "c.id, c.name, c.industry, c.plan_tier, c.require_mfa, c.created_at, c.updated_at";

pub struct ClientService {
    pool: PgPool,
}

impl ClientService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Clients the user is a member of
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Client>, DatabaseError> {
        let sql = format!(
            r#"
            SELECT {CLIENT_COLUMNS}
            FROM clients c
            JOIN client_members m ON m.client_id = c.id
            WHERE m.user_id = $1
            AND c.deleted_at IS NULL
            ORDER BY c.name
            "#
        );

        Ok(sqlx::query_as(&sql).bind(user_id).fetch_all(&self.pool).await?)
    }

    /// Every active client on the platform
    pub async fn list_all(&self) -> Result<Vec<Client>, DatabaseError> {
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients c WHERE c.deleted_at IS NULL ORDER BY c.created_at DESC");
        Ok(sqlx::query_as(&sql).fetch_all(&self.pool).await?)
    }

    pub async fn get(&self, client_id: ClientId) -> Result<Client, DatabaseError> {
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients c WHERE c.id = $1 AND c.deleted_at IS NULL");

        sqlx::query_as(&sql)
            .bind(client_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Client {} not found", client_id)))
    }

    /// Memberships of a user, for the whoami view
    pub async fn memberships(&self, user_id: Uuid) -> Result<Vec<Membership>, DatabaseError> {
        Ok(sqlx::query_as(
            r#"
            SELECT m.client_id, c.name AS client_name, m.role
            FROM client_members m
            JOIN clients c ON c.id = m.client_id
            WHERE m.user_id = $1
            AND c.deleted_at IS NULL
            ORDER BY c.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Create a client and make `owner_id` its owner
    pub async fn create(
        &self,
        name: &str,
        industry: Option<&str>,
        plan_tier: PlanTier,
        owner_id: Uuid,
        actor_id: Uuid,
    ) -> Result<Client, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let owner: User = sqlx::query_as(
            "SELECT id, email, name, global_role, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(owner_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("User {} not found", owner_id)))?;

        let client: Client = sqlx::query_as(
            r#"
            INSERT INTO clients (name, industry, plan_tier)
            VALUES ($1, $2, $3)
            RETURNING id, name, industry, plan_tier, require_mfa, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(industry)
        .bind(plan_tier.as_str())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO client_members (client_id, user_id, role) VALUES ($1, $2, $3)")
            .bind(client.id)
            .bind(owner.id)
            .bind(ClientRole::Owner.as_str())
            .execute(&mut *tx)
            .await?;

        let event = AuditEvent::ClientCreated {
            name: client.name.clone(),
            plan_tier,
        };
        audit::record(&mut *tx, Some(client.id), Some(actor_id), &event).await?;

        tx.commit().await?;

        tracing::info!("Created client {} ({}) owned by {}", client.id, client.name, owner.email);
        Ok(client)
    }

    pub async fn set_plan(&self, client_id: ClientId, plan_tier: PlanTier, actor_id: Uuid) -> Result<Client, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<(String,)> =
            sqlx::query_as("SELECT plan_tier FROM clients WHERE id = $1 AND deleted_at IS NULL FOR UPDATE")
                .bind(client_id)
                .fetch_optional(&mut *tx)
                .await?;
        let (current,) = current.ok_or_else(|| DatabaseError::NotFound(format!("Client {} not found", client_id)))?;

        let client: Client = sqlx::query_as(
            r#"
            UPDATE clients SET plan_tier = $2, updated_at = now()
            WHERE id = $1
            RETURNING id, name, industry, plan_tier, require_mfa, created_at, updated_at
            "#,
        )
        .bind(client_id)
        .bind(plan_tier.as_str())
        .fetch_one(&mut *tx)
        .await?;

        let event = AuditEvent::PlanChanged {
            from: PlanTier::from_db(&current),
            to: plan_tier,
        };
        audit::record(&mut *tx, Some(client_id), Some(actor_id), &event).await?;

        tx.commit().await?;
        Ok(client)
    }

    pub async fn set_require_mfa(&self, client_id: ClientId, require_mfa: bool, actor_id: Uuid) -> Result<Client, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let client: Client = sqlx::query_as(
            r#"
            UPDATE clients SET require_mfa = $2, updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING id, name, industry, plan_tier, require_mfa, created_at, updated_at
            "#,
        )
        .bind(client_id)
        .bind(require_mfa)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Client {} not found", client_id)))?;

        audit::record(
            &mut *tx,
            Some(client_id),
            Some(actor_id),
            &AuditEvent::SecuritySettingsChanged { require_mfa },
        )
        .await?;

        tx.commit().await?;

        tracing::info!("Client {} require_mfa set to {} by {}", client_id, require_mfa, actor_id);
        Ok(client)
    }
}
