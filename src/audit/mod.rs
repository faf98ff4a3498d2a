//! Audit trail with a closed set of event payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::access::{ClientId, ClientRole, PlanTier};
use crate::database::DatabaseError;
use crate::kanban::{KanbanStatus, WorkItemKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    ClientCreated {
        name: String,
        plan_tier: PlanTier,
    },
    PlanChanged {
        from: PlanTier,
        to: PlanTier,
    },
    MemberAdded {
        user_id: Uuid,
        role: ClientRole,
    },
    MemberRemoved {
        user_id: Uuid,
    },
    MemberRoleChanged {
        user_id: Uuid,
        from: ClientRole,
        to: ClientRole,
    },
    ControlStatusChanged {
        client_control_id: i64,
        control_code: String,
        from: String,
        to: String,
    },
    BoardItemMoved {
        kind: WorkItemKind,
        item_id: i64,
        from: String,
        to: String,
        column: KanbanStatus,
    },
    SecuritySettingsChanged {
        require_mfa: bool,
    },
}

impl AuditEvent {
    /// Value stored in `audit_logs.action`
    pub fn action(&self) -> &'static str {
        match self {
            AuditEvent::ClientCreated { .. } => "client_created",
            AuditEvent::PlanChanged { .. } => "plan_changed",
            AuditEvent::MemberAdded { .. } => "member_added",
            AuditEvent::MemberRemoved { .. } => "member_removed",
            AuditEvent::MemberRoleChanged { .. } => "member_role_changed",
            AuditEvent::ControlStatusChanged { .. } => "control_status_changed",
            AuditEvent::BoardItemMoved { .. } => "board_item_moved",
            AuditEvent::SecuritySettingsChanged { .. } => "security_settings_changed",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub id: i64,
    pub client_id: Option<ClientId>,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: AuditEvent,
}

#[derive(sqlx::FromRow)]
struct AuditRow {
    id: i64,
    client_id: Option<ClientId>,
    user_id: Option<Uuid>,
    action: String,
    details: serde_json::Value,
    created_at: DateTime<Utc>,
}

/// Append an event. Accepts a pool or an open transaction.
pub async fn record<'e, E>(
    executor: E,
    client_id: Option<ClientId>,
    user_id: Option<Uuid>,
    event: &AuditEvent,
) -> Result<(), DatabaseError>
where
    E: PgExecutor<'e>,
{
    let details = serde_json::to_value(event)?;

    sqlx::query("INSERT INTO audit_logs (client_id, user_id, action, details) VALUES ($1, $2, $3, $4)")
        .bind(client_id)
        .bind(user_id)
        .bind(event.action())
        .bind(details)
        .execute(executor)
        .await?;

    Ok(())
}

/// Most recent events for a client. Rows whose payload no longer matches a
/// known event shape are skipped.
pub async fn list_for_client(pool: &PgPool, client_id: ClientId, limit: i64) -> Result<Vec<AuditEntry>, DatabaseError> {
    let rows: Vec<AuditRow> = sqlx::query_as(
        r#"
        SELECT id, client_id, user_id, action, details, created_at
        FROM audit_logs
        WHERE client_id = $1
        ORDER BY created_at DESC, id DESC
        LIMIT $2
        "#,
    )
    .bind(client_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().filter_map(parse_row).collect())
}

fn parse_row(row: AuditRow) -> Option<AuditEntry> {
    match serde_json::from_value::<AuditEvent>(row.details) {
        Ok(event) => Some(AuditEntry {
            id: row.id,
            client_id: row.client_id,
            user_id: row.user_id,
            created_at: row.created_at,
            event,
        }),
        Err(e) => {
            tracing::warn!("Skipping audit log {} ({}): {}", row.id, row.action, e);
            None
        }
    }
}
