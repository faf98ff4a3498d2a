//! Shared four-column board over heterogeneous work items.
//!
//! Each work item kind keeps its own status vocabulary. The tables below map
//! those statuses onto the board columns and back. Unknown statuses land in
//! `todo`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::access::UnknownVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KanbanStatus {
    Todo,
    InProgress,
    Review,
    Done,
}

impl KanbanStatus {
    pub const ALL: [KanbanStatus; 4] = [
        KanbanStatus::Todo,
        KanbanStatus::InProgress,
        KanbanStatus::Review,
        KanbanStatus::Done,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            KanbanStatus::Todo => "todo",
            KanbanStatus::InProgress => "in_progress",
            KanbanStatus::Review => "review",
            KanbanStatus::Done => "done",
        }
    }
}

/// Kinds of work item that appear on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemKind {
    Task,
    RemediationTask,
    RiskTreatment,
    Control,
    Policy,
}

type StatusTable = &'static [(&'static str, KanbanStatus)];

const TASK_STATUSES: StatusTable = &[
    ("todo", KanbanStatus::Todo),
    ("in_progress", KanbanStatus::InProgress),
    ("review", KanbanStatus::Review),
    ("done", KanbanStatus::Done),
];

const REMEDIATION_STATUSES: StatusTable = &[
    ("open", KanbanStatus::Todo),
    ("in_progress", KanbanStatus::InProgress),
    ("pending_verification", KanbanStatus::Review),
    ("resolved", KanbanStatus::Done),
    ("closed", KanbanStatus::Done),
];

const RISK_TREATMENT_STATUSES: StatusTable = &[
    ("planned", KanbanStatus::Todo),
    ("in_progress", KanbanStatus::InProgress),
    ("implemented", KanbanStatus::Review),
    ("verified", KanbanStatus::Done),
];

const CONTROL_STATUSES: StatusTable = &[
    ("not_started", KanbanStatus::Todo),
    ("in_progress", KanbanStatus::InProgress),
    ("under_review", KanbanStatus::Review),
    ("implemented", KanbanStatus::Done),
    ("not_applicable", KanbanStatus::Done),
];

const POLICY_STATUSES: StatusTable = &[
    ("draft", KanbanStatus::Todo),
    ("in_revision", KanbanStatus::InProgress),
    ("in_review", KanbanStatus::Review),
    ("approved", KanbanStatus::Done),
    ("published", KanbanStatus::Done),
];

impl WorkItemKind {
    pub const ALL: [WorkItemKind; 5] = [
        WorkItemKind::Task,
        WorkItemKind::RemediationTask,
        WorkItemKind::RiskTreatment,
        WorkItemKind::Control,
        WorkItemKind::Policy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WorkItemKind::Task => "task",
            WorkItemKind::RemediationTask => "remediation_task",
            WorkItemKind::RiskTreatment => "risk_treatment",
            WorkItemKind::Control => "control",
            WorkItemKind::Policy => "policy",
        }
    }

    fn table(self) -> StatusTable {
        match self {
            WorkItemKind::Task => TASK_STATUSES,
            WorkItemKind::RemediationTask => REMEDIATION_STATUSES,
            WorkItemKind::RiskTreatment => RISK_TREATMENT_STATUSES,
            WorkItemKind::Control => CONTROL_STATUSES,
            WorkItemKind::Policy => POLICY_STATUSES,
        }
    }

    /// Statuses this kind accepts, in board order
    pub fn statuses(self) -> impl Iterator<Item = &'static str> {
        self.table().iter().map(|(status, _)| *status)
    }

    pub fn is_known_status(self, status: &str) -> bool {
        self.statuses().any(|known| known == status)
    }

    /// Column a source status belongs in
    pub fn to_kanban(self, status: &str) -> KanbanStatus {
        self.table()
            .iter()
            .find(|(source, _)| *source == status)
            .map(|(_, column)| *column)
            .unwrap_or(KanbanStatus::Todo)
    }

    /// Source status written when an item is dropped into `column`.
    /// The first table entry for a column is its canonical status.
    pub fn from_kanban(self, column: KanbanStatus) -> &'static str {
        self.table()
            .iter()
            .find(|(_, mapped)| *mapped == column)
            .map(|(source, _)| *source)
            .unwrap_or_else(|| self.table()[0].0)
    }
}

impl fmt::Display for WorkItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkItemKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkItemKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "work item kind",
                value: s.to_string(),
            })
    }
}

/// One card on the board
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardItem {
    pub kind: WorkItemKind,
    pub id: i64,
    pub title: String,
    pub source_status: String,
    pub status: KanbanStatus,
    pub assignee_id: Option<uuid::Uuid>,
    pub due_date: Option<chrono::NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardColumn {
    pub status: KanbanStatus,
    pub items: Vec<BoardItem>,
}

/// Group cards into the four columns, preserving input order within a column
pub fn build_board(items: impl IntoIterator<Item = BoardItem>) -> Vec<BoardColumn> {
    let mut columns: Vec<BoardColumn> = KanbanStatus::ALL
        .into_iter()
        .map(|status| BoardColumn { status, items: Vec::new() })
        .collect();

    for item in items {
        if let Some(column) = columns.iter_mut().find(|c| c.status == item.status) {
            column.items.push(item);
        }
    }

    columns
}
