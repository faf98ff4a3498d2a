use serde::Serialize;
use sqlx::PgPool;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::access::ClientId;
use crate::audit::{self, AuditEvent};
use crate::compliance::{compliance_score, ComplianceScore};
use crate::database::models::{ClientControl, ControlMatchText};
use crate::database::DatabaseError;
use crate::types::Patch;

const CLIENT_CONTROL_SELECT: &str = r#"
    SELECT cc.id, cc.control_id, f.code AS framework_code, c.code, c.title, c.description,
           cc.status, cc.owner_id, cc.notes, cc.updated_at
    FROM client_controls cc
    JOIN controls c ON c.id = cc.control_id
    JOIN frameworks f ON f.id = c.framework_id
"#;

/// Changes requested for one client control
#[derive(Debug, Default)]
pub struct ControlUpdate {
    pub status: Option<String>,
    pub notes: Patch<String>,
    pub owner_id: Patch<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ComplianceSummary {
    pub overall: ComplianceScore,
    pub frameworks: BTreeMap<String, ComplianceScore>,
}

pub struct ControlService {
    pool: PgPool,
}

impl ControlService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, client_id: ClientId, framework: Option<&str>) -> Result<Vec<ClientControl>, DatabaseError> {
        let sql = format!(
            "{CLIENT_CONTROL_SELECT} WHERE cc.client_id = $1 AND ($2::text IS NULL OR f.code = $2) ORDER BY f.code, c.code"
        );

        Ok(sqlx::query_as(&sql)
            .bind(client_id)
            .bind(framework)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn get(&self, client_id: ClientId, id: i64) -> Result<ClientControl, DatabaseError> {
        let sql = format!("{CLIENT_CONTROL_SELECT} WHERE cc.client_id = $1 AND cc.id = $2");

        sqlx::query_as(&sql)
            .bind(client_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| control_not_found(id))
    }

    /// Apply an update; a status change is written to the audit trail.
    /// A new owner must be a member of the client.
    pub async fn update(
        &self,
        client_id: ClientId,
        id: i64,
        update: ControlUpdate,
        actor_id: Uuid,
    ) -> Result<ClientControl, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let before: Option<(String, String)> = sqlx::query_as(
            r#"
            SELECT cc.status, c.code
            FROM client_controls cc
            JOIN controls c ON c.id = cc.control_id
            WHERE cc.client_id = $1 AND cc.id = $2
            FOR UPDATE OF cc
            "#,
        )
        .bind(client_id)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let (from, code) = before.ok_or_else(|| control_not_found(id))?;

        if let Patch::Set(owner_id) = &update.owner_id {
            let member: Option<(Uuid,)> =
                sqlx::query_as("SELECT user_id FROM client_members WHERE client_id = $1 AND user_id = $2")
                    .bind(client_id)
                    .bind(owner_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            if member.is_none() {
                return Err(DatabaseError::NotFound(format!(
                    "User {} is not a member of client {}",
                    owner_id, client_id
                )));
            }
        }

        let (write_notes, notes) = update.notes.into_sql();
        let (write_owner, owner_id) = update.owner_id.into_sql();

        sqlx::query(
            r#"
            UPDATE client_controls SET
                status = COALESCE($3, status),
                notes = CASE WHEN $4 THEN $5 ELSE notes END,
                owner_id = CASE WHEN $6 THEN $7 ELSE owner_id END,
                updated_at = now()
            WHERE client_id = $1 AND id = $2
            "#,
        )
        .bind(client_id)
        .bind(id)
        .bind(update.status.as_deref())
        .bind(write_notes)
        .bind(notes)
        .bind(write_owner)
        .bind(owner_id)
        .execute(&mut *tx)
        .await?;

        if let Some(status) = update.status.filter(|status| *status != from) {
            let event = AuditEvent::ControlStatusChanged {
                client_control_id: id,
                control_code: code,
                from,
                to: status,
            };
            audit::record(&mut *tx, Some(client_id), Some(actor_id), &event).await?;
        }

        let sql = format!("{CLIENT_CONTROL_SELECT} WHERE cc.client_id = $1 AND cc.id = $2");
        let control: ClientControl = sqlx::query_as(&sql).bind(client_id).bind(id).fetch_one(&mut *tx).await?;

        tx.commit().await?;
        Ok(control)
    }

    /// Overall score plus one score per framework
    pub async fn compliance(&self, client_id: ClientId) -> Result<ComplianceSummary, DatabaseError> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT f.code, cc.status
            FROM client_controls cc
            JOIN controls c ON c.id = cc.control_id
            JOIN frameworks f ON f.id = c.framework_id
            WHERE cc.client_id = $1
            "#,
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;

        let mut by_framework: BTreeMap<String, Vec<&str>> = BTreeMap::new();
        for (framework, status) in &rows {
            by_framework.entry(framework.clone()).or_default().push(status.as_str());
        }

        Ok(ComplianceSummary {
            overall: compliance_score(rows.iter().map(|(_, status)| status.as_str())),
            frameworks: by_framework
                .into_iter()
                .map(|(framework, statuses)| (framework, compliance_score(statuses)))
                .collect(),
        })
    }

    /// Catalog text of the client's controls, keyed by client control id
    pub async fn match_texts(&self, client_id: ClientId) -> Result<Vec<ControlMatchText>, DatabaseError> {
        Ok(sqlx::query_as(
            r#"
            SELECT cc.id, c.code, c.title, c.description
            FROM client_controls cc
            JOIN controls c ON c.id = cc.control_id
            WHERE cc.client_id = $1
            AND cc.status <> 'not_applicable'
            "#,
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?)
    }
}

fn control_not_found(id: i64) -> DatabaseError {
    DatabaseError::NotFound(format!("Control {} not found", id))
}
