//! Push-channel wire format.
//!
//! Every frame is a JSON envelope `{"type": <tag>, "ts": <rfc3339>, "data": {..}}`.
//! Decoding is two-stage: the envelope first, then the payload according to
//! its tag, so an unknown tag is distinguishable from a broken payload.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use officeflow_core::error::{OfficeflowError, Result};
use officeflow_core::types::{AgentId, AgentStatus, ProjectId, TaskId, TaskStatus};

pub const CONNECTED: &str = "connected";
pub const AGENT_STATUS: &str = "agent.status";
pub const TASK_UPDATED: &str = "task.updated";
pub const LOG_APPEND: &str = "log.append";
pub const TOOL_EXECUTION: &str = "tool.execution";
pub const TEAM_MESSAGE: &str = "team.message";
pub const TEAM_TASK_DELEGATED: &str = "team.task_delegated";
pub const TEAM_AGENT_COMPLETED: &str = "team.agent_completed";

/// Tags whose only effect is an authoritative roster re-fetch.
pub const ROSTER_TAGS: &[&str] = &[
    "team.created",
    "team.agent_spawned",
    "team.stopped",
    "agent_created",
    "agent_deleted",
];

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    tag: String,
    #[serde(default)]
    ts: Option<DateTime<Utc>>,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConnectedPayload {
    #[serde(default)]
    pub project_id: Option<ProjectId>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AgentStatusPayload {
    pub agent_id: AgentId,
    pub status: AgentStatus,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TaskUpdatedPayload {
    pub task_id: TaskId,
    #[serde(default)]
    pub title: Option<String>,
    pub status: TaskStatus,
    /// `null` means the task is unassigned.
    #[serde(default)]
    pub assigned_agent_id: Option<AgentId>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LogAppendPayload {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub agent_id: Option<AgentId>,
    pub message: String,
}

fn default_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolExecutionPayload {
    #[serde(default)]
    pub agent_id: Option<AgentId>,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TeamMessagePayload {
    #[serde(default)]
    pub agent_id: Option<AgentId>,
    pub from: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TaskDelegatedPayload {
    pub to_agent_id: AgentId,
    pub to_agent_name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AgentCompletedPayload {
    pub agent_id: AgentId,
    #[serde(default)]
    pub name: String,
}

/// A decoded push event.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Connected(ConnectedPayload),
    AgentStatus(AgentStatusPayload),
    TaskUpdated(TaskUpdatedPayload),
    LogAppend(LogAppendPayload),
    ToolExecution(ToolExecutionPayload),
    TeamMessage(TeamMessagePayload),
    TaskDelegated(TaskDelegatedPayload),
    AgentCompleted(AgentCompletedPayload),
    /// The roster changed in a way only a re-fetch can reflect.
    RosterChanged { tag: String },
    /// A tag this client does not understand.
    Unknown { tag: String },
}

impl InboundEvent {
    pub fn tag(&self) -> &str {
        match self {
            Self::Connected(_) => CONNECTED,
            Self::AgentStatus(_) => AGENT_STATUS,
            Self::TaskUpdated(_) => TASK_UPDATED,
            Self::LogAppend(_) => LOG_APPEND,
            Self::ToolExecution(_) => TOOL_EXECUTION,
            Self::TeamMessage(_) => TEAM_MESSAGE,
            Self::TaskDelegated(_) => TEAM_TASK_DELEGATED,
            Self::AgentCompleted(_) => TEAM_AGENT_COMPLETED,
            Self::RosterChanged { tag } | Self::Unknown { tag } => tag,
        }
    }
}

/// An event plus its envelope timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub ts: Option<DateTime<Utc>>,
    pub event: InboundEvent,
}

/// Decode one text frame.
///
/// Unknown tags decode successfully to [`InboundEvent::Unknown`]. A frame that
/// is not an envelope, or whose payload does not fit its tag, is
/// `MalformedEvent`.
pub fn decode(frame: &str) -> Result<Inbound> {
    let envelope: Envelope = serde_json::from_str(frame)
        .map_err(|e| OfficeflowError::MalformedEvent(format!("bad envelope: {e}")))?;
    let Envelope { tag, ts, data } = envelope;

    let event = match tag.as_str() {
        CONNECTED => InboundEvent::Connected(payload(&tag, data)?),
        AGENT_STATUS => InboundEvent::AgentStatus(payload(&tag, data)?),
        TASK_UPDATED => InboundEvent::TaskUpdated(payload(&tag, data)?),
        LOG_APPEND => InboundEvent::LogAppend(payload(&tag, data)?),
        TOOL_EXECUTION => InboundEvent::ToolExecution(payload(&tag, data)?),
        TEAM_MESSAGE => InboundEvent::TeamMessage(payload(&tag, data)?),
        TEAM_TASK_DELEGATED => InboundEvent::TaskDelegated(payload(&tag, data)?),
        TEAM_AGENT_COMPLETED => InboundEvent::AgentCompleted(payload(&tag, data)?),
        t if ROSTER_TAGS.contains(&t) => InboundEvent::RosterChanged { tag },
        _ => InboundEvent::Unknown { tag },
    };

    Ok(Inbound { ts, event })
}

fn payload<T: DeserializeOwned>(tag: &str, data: Value) -> Result<T> {
    serde_json::from_value(data)
        .map_err(|e| OfficeflowError::MalformedEvent(format!("{tag}: {e}")))
}
