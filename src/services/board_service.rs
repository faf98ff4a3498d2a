use chrono::NaiveDate;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::access::ClientId;
use crate::audit::{self, AuditEvent};
use crate::database::DatabaseError;
use crate::kanban::{build_board, BoardColumn, BoardItem, KanbanStatus, WorkItemKind};

#[derive(Debug, FromRow)]
struct WorkItemRow {
    id: i64,
    title: String,
    status: String,
    assignee_id: Option<Uuid>,
    due_date: Option<NaiveDate>,
}

fn table(kind: WorkItemKind) -> &'static str {
    match kind {
        WorkItemKind::Task => "tasks",
        WorkItemKind::RemediationTask => "remediation_tasks",
        WorkItemKind::RiskTreatment => "risk_treatments",
        WorkItemKind::Control => "client_controls",
        WorkItemKind::Policy => "policies",
    }
}

fn select_items(kind: WorkItemKind) -> String {
    match kind {
        WorkItemKind::Control => r#"
            SELECT cc.id, c.code || ' ' || c.title AS title, cc.status,
                   cc.owner_id AS assignee_id, NULL::date AS due_date
            FROM client_controls cc
            JOIN controls c ON c.id = cc.control_id
            WHERE cc.client_id = $1
            ORDER BY cc.updated_at DESC, cc.id
        "#
        .to_string(),
        _ => format!(
            "SELECT id, title, status, assignee_id, due_date FROM {} WHERE client_id = $1 ORDER BY due_date NULLS LAST, id",
            table(kind)
        ),
    }
}

/// A card after it has been moved
#[derive(Debug, serde::Serialize)]
pub struct MovedItem {
    pub kind: WorkItemKind,
    pub id: i64,
    pub from: String,
    pub to: String,
    pub status: KanbanStatus,
}

pub struct BoardService {
    pool: PgPool,
}

impl BoardService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Board over the requested kinds, all kinds when empty
    pub async fn board(&self, client_id: ClientId, kinds: &[WorkItemKind]) -> Result<Vec<BoardColumn>, DatabaseError> {
        let kinds: &[WorkItemKind] = if kinds.is_empty() { &WorkItemKind::ALL } else { kinds };

        let mut items = Vec::new();
        for &kind in kinds {
            let rows: Vec<WorkItemRow> = sqlx::query_as(&select_items(kind))
                .bind(client_id)
                .fetch_all(&self.pool)
                .await?;

            items.extend(rows.into_iter().map(|row| BoardItem {
                kind,
                id: row.id,
                status: kind.to_kanban(&row.status),
                title: row.title,
                source_status: row.status,
                assignee_id: row.assignee_id,
                due_date: row.due_date,
            }));
        }

        Ok(build_board(items))
    }

    /// Move a card into `column`, writing the kind's own status for that column
    pub async fn move_item(
        &self,
        client_id: ClientId,
        kind: WorkItemKind,
        id: i64,
        column: KanbanStatus,
        actor_id: Uuid,
    ) -> Result<MovedItem, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<(String,)> = sqlx::query_as(&format!(
            "SELECT status FROM {} WHERE client_id = $1 AND id = $2 FOR UPDATE",
            table(kind)
        ))
        .bind(client_id)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let (from,) = current.ok_or_else(|| DatabaseError::NotFound(format!("{} {} not found", kind, id)))?;

        // Already in the column: keep the finer-grained source status
        if kind.to_kanban(&from) == column {
            tx.commit().await?;
            return Ok(MovedItem {
                kind,
                id,
                to: from.clone(),
                from,
                status: column,
            });
        }

        let to = kind.from_kanban(column);
        sqlx::query(&format!(
            "UPDATE {} SET status = $3, updated_at = now() WHERE client_id = $1 AND id = $2",
            table(kind)
        ))
        .bind(client_id)
        .bind(id)
        .bind(to)
        .execute(&mut *tx)
        .await?;

        let event = AuditEvent::BoardItemMoved {
            kind,
            item_id: id,
            from: from.clone(),
            to: to.to_string(),
            column,
        };
        audit::record(&mut *tx, Some(client_id), Some(actor_id), &event).await?;

        tx.commit().await?;

        tracing::debug!("Moved {} {} from {} to {}", kind, id, from, to);
        Ok(MovedItem {
            kind,
            id,
            from,
            to: to.to_string(),
            status: column,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_a_query() {
        for kind in WorkItemKind::ALL {
            let sql = select_items(kind);
            assert!(sql.contains("client_id = $1"), "{}", kind);
            assert!(sql.contains(table(kind)), "{}", kind);
        }
    }
}
