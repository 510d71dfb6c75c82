use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::OfficeflowError;

/// Backend project identifier; also the push subscription key.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub i64);

/// Backend agent identifier.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub i64);

/// Backend task identifier.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub i64);

macro_rules! display_id {
    ($($ty:ty),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )*
    };
}

display_id!(ProjectId, AgentId, TaskId);

/// Department an agent belongs to, and a node in the workflow graph.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleTag {
    Lead,
    Backend,
    Frontend,
    Qa,
    Docs,
    Security,
    Custom,
}

impl RoleTag {
    pub const ALL: [RoleTag; 7] = [
        RoleTag::Lead,
        RoleTag::Backend,
        RoleTag::Frontend,
        RoleTag::Qa,
        RoleTag::Docs,
        RoleTag::Security,
        RoleTag::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lead => "lead",
            Self::Backend => "backend",
            Self::Frontend => "frontend",
            Self::Qa => "qa",
            Self::Docs => "docs",
            Self::Security => "security",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for RoleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleTag {
    type Err = OfficeflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == needle)
            .ok_or_else(|| OfficeflowError::Config(format!("unknown role tag: {s}")))
    }
}

/// Runtime status of an agent as reported by the backend.
#[derive(Debug, Clone, Copy, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Idle,
    Working,
    Reviewing,
    Blocked,
    Stopped,
}

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Blocked,
    Review,
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub role: RoleTag,
    #[serde(default)]
    pub status: AgentStatus,
    #[serde(default)]
    pub is_lead: bool,
    #[serde(default)]
    pub team_name: Option<String>,
}

impl Agent {
    pub fn new(id: i64, name: impl Into<String>, role: RoleTag) -> Self {
        Self {
            id: AgentId(id),
            name: name.into(),
            role,
            status: AgentStatus::Idle,
            is_lead: role == RoleTag::Lead,
            team_name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    /// 0 = normal, 1 = high, 2 = critical.
    #[serde(default)]
    pub priority: i32,
    /// `None` means unassigned: the virtual step before the first department.
    #[serde(default)]
    pub assigned_agent_id: Option<AgentId>,
}

impl Task {
    pub fn new(id: i64, title: impl Into<String>) -> Self {
        Self {
            id: TaskId(id),
            title: title.into(),
            description: None,
            status: TaskStatus::Todo,
            priority: 0,
            assigned_agent_id: None,
        }
    }

    pub fn assigned_to(mut self, agent: AgentId) -> Self {
        self.assigned_agent_id = Some(agent);
        self
    }
}

/// Partial task update sent to the backend. Only set fields are serialized;
/// `assigned_agent_id: Some(None)` is written as an explicit `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_agent_id: Option<Option<AgentId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
}

impl TaskUpdate {
    pub fn assign(agent: Option<AgentId>) -> Self {
        Self {
            assigned_agent_id: Some(agent),
            status: None,
        }
    }
}

/// Canvas position of a department node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePayload {
    pub role: RoleTag,
    #[serde(rename = "agentCount", default)]
    pub agent_count: usize,
}

/// A department node as stored in `nodes_data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    pub id: String,
    #[serde(default)]
    pub position: Position,
    pub data: NodePayload,
}

/// A handoff edge as stored in `edges_data`; endpoints are node ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeData {
    pub id: String,
    pub source: String,
    pub target: String,
}

/// Workflow as persisted by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub steps: Vec<RoleTag>,
    #[serde(default)]
    pub nodes_data: Vec<NodeData>,
    #[serde(default)]
    pub edges_data: Vec<EdgeData>,
    #[serde(default)]
    pub is_active: bool,
}

/// Pick the workflow the router consults. At most one record per project is
/// active; if the backend ever reports several, the first wins.
pub fn active_workflow(records: &[WorkflowRecord]) -> Option<&WorkflowRecord> {
    records.iter().find(|r| r.is_active)
}

/// One line of the agent activity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default)]
    pub ts: Option<DateTime<Utc>>,
    pub level: String,
    #[serde(default)]
    pub agent_id: Option<AgentId>,
    pub message: String,
}

/// One line of the team chat transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    #[serde(default)]
    pub ts: Option<DateTime<Utc>>,
    #[serde(default)]
    pub agent_id: Option<AgentId>,
    pub from: String,
    pub message: String,
}

/// Push connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Closed,
    Cancelled,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Event broadcast to UI subscribers.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The push connection changed state.
    ConnectionState(ConnectionState),
    /// Transient user-visible notice.
    Notice { level: NoticeLevel, message: String },
    /// The agent roster was replaced by an authoritative fetch.
    RosterRefreshed { agents: usize },
    /// The active workflow's step order was recomputed.
    StepOrderChanged { steps: Vec<RoleTag> },
}

impl AppEvent {
    pub fn info(message: impl Into<String>) -> Self {
        Self::Notice {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::Notice {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Notice {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_tag_parses_case_insensitively() {
        assert_eq!("QA".parse::<RoleTag>().unwrap(), RoleTag::Qa);
        assert_eq!(" backend ".parse::<RoleTag>().unwrap(), RoleTag::Backend);
        assert!("marketing".parse::<RoleTag>().is_err());
    }

    #[test]
    fn task_update_serializes_only_set_fields() {
        let update = TaskUpdate::assign(Some(AgentId(7)));
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({"assigned_agent_id": 7})
        );

        let unassign = TaskUpdate::assign(None);
        assert_eq!(
            serde_json::to_value(&unassign).unwrap(),
            serde_json::json!({"assigned_agent_id": null})
        );

        let status_only = TaskUpdate {
            assigned_agent_id: None,
            status: Some(TaskStatus::InProgress),
        };
        assert_eq!(
            serde_json::to_value(&status_only).unwrap(),
            serde_json::json!({"status": "in_progress"})
        );
    }

    #[test]
    fn agent_ignores_unknown_backend_fields() {
        let json = serde_json::json!({
            "id": 3,
            "project_id": 1,
            "name": "Bolt",
            "role": "backend",
            "status": "working",
            "avatar_key": "default",
            "is_lead": false,
            "model": "some-model"
        });
        let agent: Agent = serde_json::from_value(json).unwrap();
        assert_eq!(agent.id, AgentId(3));
        assert_eq!(agent.role, RoleTag::Backend);
        assert_eq!(agent.status, AgentStatus::Working);
    }

    #[test]
    fn workflow_record_reads_backend_shape() {
        let json = serde_json::json!({
            "id": 4,
            "project_id": 1,
            "name": "Default",
            "steps": ["lead", "backend"],
            "nodes_data": [
                {"id": "dept-lead", "type": "department", "position": {"x": 0.0, "y": 10.5},
                 "data": {"role": "lead", "agentCount": 1}}
            ],
            "edges_data": [{"id": "e1", "source": "dept-lead", "target": "dept-backend"}],
            "is_active": true,
            "created_at": "2025-01-01T00:00:00Z"
        });
        let record: WorkflowRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.steps, vec![RoleTag::Lead, RoleTag::Backend]);
        assert_eq!(record.nodes_data[0].data.agent_count, 1);
        assert_eq!(record.nodes_data[0].position.y, 10.5);
        assert_eq!(record.edges_data[0].target, "dept-backend");
        assert!(active_workflow(std::slice::from_ref(&record)).is_some());
    }

    #[test]
    fn task_defaults_to_unassigned_todo() {
        let task: Task = serde_json::from_value(serde_json::json!({"id": 9})).unwrap();
        assert_eq!(task.status, TaskStatus::Todo);
        assert!(task.assigned_agent_id.is_none());
    }
}
