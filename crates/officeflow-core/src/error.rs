use thiserror::Error;

use crate::types::{AgentId, RoleTag, TaskId};

#[derive(Debug, Error)]
pub enum OfficeflowError {
    // Routing errors
    #[error("No agents in department: {role}")]
    NoAgentsInDepartment { role: RoleTag },

    #[error("Department is not part of the active workflow: {role}")]
    NotInWorkflow { role: RoleTag },

    #[error("Task is already at the final step ({role})")]
    AlreadyAtFinalStep { role: RoleTag },

    #[error("Workflow has no ordered departments")]
    EmptyWorkflow,

    #[error("Assignee is not on the roster: {0}")]
    UnknownAgent(AgentId),

    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("No active workflow")]
    NoActiveWorkflow,

    #[error("No project loaded")]
    NoProjectLoaded,

    // Graph editing errors
    #[error("Department already on the canvas: {0}")]
    DuplicateDepartment(RoleTag),

    #[error("Department not on the canvas: {0}")]
    UnknownDepartment(RoleTag),

    #[error("Department cannot hand off to itself: {0}")]
    SelfHandoff(RoleTag),

    // Sync errors
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    // Backend errors
    #[error("Backend request failed: {0}")]
    Backend(String),

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OfficeflowError {
    /// Routing outcomes that are shown as a transient notice rather than
    /// treated as failures.
    pub fn is_informational(&self) -> bool {
        matches!(
            self,
            Self::NoAgentsInDepartment { .. }
                | Self::NotInWorkflow { .. }
                | Self::AlreadyAtFinalStep { .. }
                | Self::EmptyWorkflow
                | Self::UnknownAgent(_)
                | Self::NoActiveWorkflow
        )
    }
}

pub type Result<T> = std::result::Result<T, OfficeflowError>;
