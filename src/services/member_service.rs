use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::access::{ClientId, ClientRole};
use crate::audit::{self, AuditEvent};
use crate::database::models::ClientMember;
use crate::database::DatabaseError;

pub struct MemberService {
    pool: PgPool,
}

impl MemberService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, client_id: ClientId) -> Result<Vec<ClientMember>, DatabaseError> {
        Ok(sqlx::query_as(
            r#"
            SELECT m.user_id, u.email, u.name, m.role, m.created_at
            FROM client_members m
            JOIN users u ON u.id = m.user_id
            WHERE m.client_id = $1
            ORDER BY u.email
            "#,
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Current role of a member
    pub async fn role_of(&self, client_id: ClientId, user_id: Uuid) -> Result<ClientRole, DatabaseError> {
        let role: Option<(String,)> = sqlx::query_as("SELECT role FROM client_members WHERE client_id = $1 AND user_id = $2")
            .bind(client_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        role.map(|(role,)| ClientRole::from_db(&role)).ok_or_else(|| not_a_member(client_id, user_id))
    }

    /// Add an existing user, looked up by email, to the client
    pub async fn add(&self, client_id: ClientId, email: &str, role: ClientRole, actor_id: Uuid) -> Result<ClientMember, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        lock_client(&mut tx, client_id).await?;

        let user: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE lower(email) = lower($1)")
            .bind(email)
            .fetch_optional(&mut *tx)
            .await?;
        let (user_id,) = user.ok_or_else(|| DatabaseError::NotFound(format!("No user with email {}", email)))?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO client_members (client_id, user_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (client_id, user_id) DO NOTHING
            "#,
        )
        .bind(client_id)
        .bind(user_id)
        .bind(role.as_str())
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(DatabaseError::Conflict(format!("{} is already a member of this client", email)));
        }

        audit::record(&mut *tx, Some(client_id), Some(actor_id), &AuditEvent::MemberAdded { user_id, role }).await?;

        let member = fetch_member(&mut tx, client_id, user_id).await?;
        tx.commit().await?;
        Ok(member)
    }

    /// Change a member's role. `expected` is the role the caller authorized
    /// against; a concurrent change in between is reported as a conflict.
    pub async fn change_role(
        &self,
        client_id: ClientId,
        user_id: Uuid,
        expected: ClientRole,
        role: ClientRole,
        actor_id: Uuid,
    ) -> Result<ClientMember, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        lock_client(&mut tx, client_id).await?;

        let current = member_role(&mut tx, client_id, user_id).await?;
        ensure_unchanged(current, expected)?;
        if current == ClientRole::Owner && role != ClientRole::Owner {
            ensure_other_owner(&mut tx, client_id, user_id).await?;
        }

        sqlx::query("UPDATE client_members SET role = $3 WHERE client_id = $1 AND user_id = $2")
            .bind(client_id)
            .bind(user_id)
            .bind(role.as_str())
            .execute(&mut *tx)
            .await?;

        if current != role {
            let event = AuditEvent::MemberRoleChanged {
                user_id,
                from: current,
                to: role,
            };
            audit::record(&mut *tx, Some(client_id), Some(actor_id), &event).await?;
        }

        let member = fetch_member(&mut tx, client_id, user_id).await?;
        tx.commit().await?;
        Ok(member)
    }

    pub async fn remove(&self, client_id: ClientId, user_id: Uuid, expected: ClientRole, actor_id: Uuid) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        lock_client(&mut tx, client_id).await?;

        let current = member_role(&mut tx, client_id, user_id).await?;
        ensure_unchanged(current, expected)?;
        if current == ClientRole::Owner {
            ensure_other_owner(&mut tx, client_id, user_id).await?;
        }

        sqlx::query("DELETE FROM client_members WHERE client_id = $1 AND user_id = $2")
            .bind(client_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        audit::record(&mut *tx, Some(client_id), Some(actor_id), &AuditEvent::MemberRemoved { user_id }).await?;

        tx.commit().await?;
        Ok(())
    }
}

/// Serializes membership changes of one client. Owner counts taken after
/// this lock cannot be invalidated by a concurrent demotion or removal.
async fn lock_client(conn: &mut PgConnection, client_id: ClientId) -> Result<(), DatabaseError> {
    let locked: Option<(ClientId,)> = sqlx::query_as("SELECT id FROM clients WHERE id = $1 AND deleted_at IS NULL FOR UPDATE")
        .bind(client_id)
        .fetch_optional(&mut *conn)
        .await?;

    locked
        .map(|_| ())
        .ok_or_else(|| DatabaseError::NotFound(format!("Client {} not found", client_id)))
}

async fn member_role(conn: &mut PgConnection, client_id: ClientId, user_id: Uuid) -> Result<ClientRole, DatabaseError> {
    let role: Option<(String,)> = sqlx::query_as("SELECT role FROM client_members WHERE client_id = $1 AND user_id = $2")
        .bind(client_id)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;

    role.map(|(role,)| ClientRole::from_db(&role)).ok_or_else(|| not_a_member(client_id, user_id))
}

fn not_a_member(client_id: ClientId, user_id: Uuid) -> DatabaseError {
    DatabaseError::NotFound(format!("User {} is not a member of client {}", user_id, client_id))
}

fn ensure_unchanged(current: ClientRole, expected: ClientRole) -> Result<(), DatabaseError> {
    if current != expected {
        return Err(DatabaseError::Conflict("Membership changed concurrently, retry".to_string()));
    }
    Ok(())
}

/// A client must keep at least one owner
async fn ensure_other_owner(conn: &mut PgConnection, client_id: ClientId, user_id: Uuid) -> Result<(), DatabaseError> {
    let (owners,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM client_members WHERE client_id = $1 AND role = 'owner' AND user_id <> $2",
    )
    .bind(client_id)
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;

    if owners == 0 {
        return Err(DatabaseError::Conflict("A client must keep at least one owner".to_string()));
    }
    Ok(())
}

async fn fetch_member(conn: &mut PgConnection, client_id: ClientId, user_id: Uuid) -> Result<ClientMember, DatabaseError> {
    Ok(sqlx::query_as(
        r#"
        SELECT m.user_id, u.email, u.name, m.role, m.created_at
        FROM client_members m
        JOIN users u ON u.id = m.user_id
        WHERE m.client_id = $1 AND m.user_id = $2
        "#,
    )
    .bind(client_id)
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_role_is_a_conflict() {
        assert!(ensure_unchanged(ClientRole::Editor, ClientRole::Editor).is_ok());
        assert!(matches!(
            ensure_unchanged(ClientRole::Owner, ClientRole::Editor),
            Err(DatabaseError::Conflict(_))
        ));
    }
}
