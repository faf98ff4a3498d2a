//! Service-level tests against a real Postgres. Each test gets a fresh
//! database with migrations applied; run with DATABASE_URL set and
//! `cargo test -- --ignored`.

use sqlx::PgPool;
use uuid::Uuid;

use compliance_api::access::{ClientId, ClientRole, PlanTier};
use compliance_api::database::DatabaseError;
use compliance_api::kanban::{KanbanStatus, WorkItemKind};
use compliance_api::services::{BoardService, ClientService, ControlService, ControlUpdate, MemberService};
use compliance_api::types::Patch;

async fn user(pool: &PgPool, email: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, email) VALUES ($1, $2)")
        .bind(id)
        .bind(email)
        .execute(pool)
        .await
        .unwrap();
    id
}

/// Client with one owner
async fn client(pool: &PgPool) -> (ClientId, Uuid) {
    let owner = user(pool, "owner@example.com").await;
    let client = ClientService::new(pool.clone())
        .create("Acme", None, PlanTier::Pro, owner, owner)
        .await
        .unwrap();
    (client.id, owner)
}

async fn audit_count(pool: &PgPool, client_id: ClientId, action: &str) -> i64 {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM audit_logs WHERE client_id = $1 AND action = $2")
        .bind(client_id)
        .bind(action)
        .fetch_one(pool)
        .await
        .unwrap();
    count
}

async fn owner_count(pool: &PgPool, client_id: ClientId) -> i64 {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM client_members WHERE client_id = $1 AND role = 'owner'")
        .bind(client_id)
        .fetch_one(pool)
        .await
        .unwrap();
    count
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn last_owner_cannot_be_demoted_or_removed(pool: PgPool) {
    let (client_id, owner) = client(&pool).await;
    let members = MemberService::new(pool.clone());

    let demote = members
        .change_role(client_id, owner, ClientRole::Owner, ClientRole::Admin, owner)
        .await;
    assert!(matches!(demote, Err(DatabaseError::Conflict(_))));

    let remove = members.remove(client_id, owner, ClientRole::Owner, owner).await;
    assert!(matches!(remove, Err(DatabaseError::Conflict(_))));

    assert_eq!(owner_count(&pool, client_id).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn second_owner_allows_demotion(pool: PgPool) {
    let (client_id, owner) = client(&pool).await;
    user(&pool, "second@example.com").await;
    let members = MemberService::new(pool.clone());

    let second = members
        .add(client_id, "SECOND@example.com", ClientRole::Owner, owner)
        .await
        .unwrap();
    assert_eq!(second.role, "owner");

    let demoted = members
        .change_role(client_id, owner, ClientRole::Owner, ClientRole::Viewer, second.user_id)
        .await
        .unwrap();
    assert_eq!(demoted.role, "viewer");
    assert_eq!(audit_count(&pool, client_id, "member_role_changed").await, 1);

    let duplicate = members.add(client_id, "second@example.com", ClientRole::Viewer, owner).await;
    assert!(matches!(duplicate, Err(DatabaseError::Conflict(_))));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn concurrent_owner_demotions_keep_one_owner(pool: PgPool) {
    let (client_id, first) = client(&pool).await;
    user(&pool, "second@example.com").await;
    let second = MemberService::new(pool.clone())
        .add(client_id, "second@example.com", ClientRole::Owner, first)
        .await
        .unwrap()
        .user_id;

    let a = MemberService::new(pool.clone());
    let b = MemberService::new(pool.clone());
    let (left, right) = tokio::join!(
        a.change_role(client_id, second, ClientRole::Owner, ClientRole::Viewer, first),
        b.remove(client_id, first, ClientRole::Owner, second),
    );

    assert_eq!(
        [left.is_ok(), right.is_ok()].iter().filter(|ok| **ok).count(),
        1,
        "exactly one change must win: {:?} / {:?}",
        left.err(),
        right.err()
    );
    assert_eq!(owner_count(&pool, client_id).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn stale_expected_role_is_rejected(pool: PgPool) {
    let (client_id, owner) = client(&pool).await;

    let result = MemberService::new(pool.clone())
        .remove(client_id, owner, ClientRole::Editor, owner)
        .await;
    assert!(matches!(result, Err(DatabaseError::Conflict(_))));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn board_move_maps_back_to_source_status(pool: PgPool) {
    let (client_id, owner) = client(&pool).await;
    let (id,): (i64,) =
        sqlx::query_as("INSERT INTO remediation_tasks (client_id, title, status) VALUES ($1, 'Patch VPN', 'closed') RETURNING id")
            .bind(client_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    let board = BoardService::new(pool.clone());

    // Already in done: the finer status survives and nothing is audited
    let kept = board
        .move_item(client_id, WorkItemKind::RemediationTask, id, KanbanStatus::Done, owner)
        .await
        .unwrap();
    assert_eq!(kept.to, "closed");
    assert_eq!(audit_count(&pool, client_id, "board_item_moved").await, 0);

    let moved = board
        .move_item(client_id, WorkItemKind::RemediationTask, id, KanbanStatus::Review, owner)
        .await
        .unwrap();
    assert_eq!(moved.from, "closed");
    assert_eq!(moved.to, "pending_verification");
    assert_eq!(audit_count(&pool, client_id, "board_item_moved").await, 1);

    let columns = board.board(client_id, &[WorkItemKind::RemediationTask]).await.unwrap();
    let review = columns.iter().find(|c| c.status == KanbanStatus::Review).unwrap();
    assert_eq!(review.items.len(), 1);

    let missing = board
        .move_item(client_id, WorkItemKind::Task, id, KanbanStatus::Done, owner)
        .await;
    assert!(matches!(missing, Err(DatabaseError::NotFound(_))));
}

async fn client_control(pool: &PgPool, client_id: ClientId) -> i64 {
    let (framework_id,): (i64,) =
        sqlx::query_as("INSERT INTO frameworks (code, name) VALUES ('soc2', 'SOC 2') RETURNING id")
            .fetch_one(pool)
            .await
            .unwrap();
    let (control_id,): (i64,) = sqlx::query_as(
        "INSERT INTO controls (framework_id, code, title) VALUES ($1, 'CC6.1', 'Logical access') RETURNING id",
    )
    .bind(framework_id)
    .fetch_one(pool)
    .await
    .unwrap();
    let (id,): (i64,) =
        sqlx::query_as("INSERT INTO client_controls (client_id, control_id) VALUES ($1, $2) RETURNING id")
            .bind(client_id)
            .bind(control_id)
            .fetch_one(pool)
            .await
            .unwrap();
    id
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn control_update_applies_patch_semantics(pool: PgPool) {
    let (client_id, owner) = client(&pool).await;
    let id = client_control(&pool, client_id).await;
    let controls = ControlService::new(pool.clone());

    let set = ControlUpdate {
        status: Some("in_progress".to_string()),
        notes: Patch::Set("waiting on IdP export".to_string()),
        owner_id: Patch::Set(owner),
    };
    let updated = controls.update(client_id, id, set, owner).await.unwrap();
    assert_eq!(updated.status, "in_progress");
    assert_eq!(updated.notes.as_deref(), Some("waiting on IdP export"));
    assert_eq!(updated.owner_id, Some(owner));
    assert_eq!(audit_count(&pool, client_id, "control_status_changed").await, 1);

    // Unchanged fields stay; Clear nulls; same status is not audited
    let clear = ControlUpdate {
        status: Some("in_progress".to_string()),
        notes: Patch::Clear,
        owner_id: Patch::Unchanged,
    };
    let updated = controls.update(client_id, id, clear, owner).await.unwrap();
    assert_eq!(updated.notes, None);
    assert_eq!(updated.owner_id, Some(owner));
    assert_eq!(audit_count(&pool, client_id, "control_status_changed").await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn control_owner_must_be_a_member(pool: PgPool) {
    let (client_id, owner) = client(&pool).await;
    let outsider = user(&pool, "outsider@example.com").await;
    let id = client_control(&pool, client_id).await;
    let controls = ControlService::new(pool.clone());

    for candidate in [outsider, Uuid::new_v4()] {
        let update = ControlUpdate {
            owner_id: Patch::Set(candidate),
            ..ControlUpdate::default()
        };
        let result = controls.update(client_id, id, update, owner).await;
        assert!(matches!(result, Err(DatabaseError::NotFound(_))));
    }

    let missing = controls.update(client_id, id + 1000, ControlUpdate::default(), owner).await;
    assert!(matches!(missing, Err(DatabaseError::NotFound(_))));
}
