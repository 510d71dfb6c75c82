use futures::future::BoxFuture;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::types::*;

/// Backend data service. Persists projects, agents, tasks and workflows.
pub trait Backend: Send + Sync + 'static {
    /// Fetch the authoritative agent roster of a project.
    fn list_agents(&self, project: ProjectId) -> BoxFuture<'_, Result<Vec<Agent>>>;

    /// Fetch all tasks of a project.
    fn list_tasks(&self, project: ProjectId) -> BoxFuture<'_, Result<Vec<Task>>>;

    /// Apply a partial update to a task.
    fn update_task(&self, task: TaskId, update: TaskUpdate) -> BoxFuture<'_, Result<Task>>;

    /// Fetch the workflows of a project, active or not.
    fn list_workflows(&self, project: ProjectId) -> BoxFuture<'_, Result<Vec<WorkflowRecord>>>;

    /// Overwrite a workflow's steps and canvas data.
    fn save_workflow(&self, record: WorkflowRecord) -> BoxFuture<'_, Result<WorkflowRecord>>;

    /// Create an empty, inactive workflow in a project.
    fn create_workflow(
        &self,
        project: ProjectId,
        name: String,
    ) -> BoxFuture<'_, Result<WorkflowRecord>>;

    /// Toggle a workflow's active flag. Activating it deactivates the other
    /// workflows of its project; activating the active one deactivates it.
    fn activate_workflow(&self, workflow: i64) -> BoxFuture<'_, Result<WorkflowRecord>>;
}

/// Push connector. Opens the long-lived event channel of a project.
pub trait PushConnector: Send + Sync + 'static {
    /// Perform the handshake and return the stream of raw text frames.
    ///
    /// The stream ends when the remote closes; an `Err` item is a transport
    /// failure. Either way the connection epoch is over.
    fn connect(&self, project: ProjectId)
        -> BoxFuture<'_, Result<BoxStream<'static, Result<String>>>>;
}
