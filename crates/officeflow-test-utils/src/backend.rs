use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::mpsc;

use officeflow_core::error::{OfficeflowError, Result};
use officeflow_core::traits::Backend;
use officeflow_core::types::*;

/// A call observed by [`MemoryBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    ListAgents(ProjectId),
    ListTasks(ProjectId),
    UpdateTask(TaskId, TaskUpdate),
    ListWorkflows(ProjectId),
    SaveWorkflow(WorkflowRecord),
    CreateWorkflow(ProjectId, String),
    ActivateWorkflow(i64),
}

#[derive(Default)]
struct Data {
    agents: Vec<Agent>,
    tasks: Vec<Task>,
    workflows: Vec<WorkflowRecord>,
    fail_writes: bool,
    write_delays: VecDeque<Duration>,
    roster_delay: Option<Duration>,
    applied: Vec<(TaskId, TaskUpdate)>,
}

/// In-memory backend that records every call on a channel.
///
/// Calls are recorded when issued; writes take effect when their future
/// completes, after any configured delay.
pub struct MemoryBackend {
    data: Mutex<Data>,
    calls: mpsc::UnboundedSender<BackendCall>,
}

impl MemoryBackend {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BackendCall>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let backend = Self {
            data: Mutex::new(Data::default()),
            calls: tx,
        };
        (backend, rx)
    }

    pub fn with_agents(self, agents: Vec<Agent>) -> Self {
        self.data.lock().unwrap().agents = agents;
        self
    }

    pub fn with_tasks(self, tasks: Vec<Task>) -> Self {
        self.data.lock().unwrap().tasks = tasks;
        self
    }

    pub fn with_workflows(self, workflows: Vec<WorkflowRecord>) -> Self {
        self.data.lock().unwrap().workflows = workflows;
        self
    }

    /// Make every write fail with a backend error.
    pub fn failing_writes(self) -> Self {
        self.data.lock().unwrap().fail_writes = true;
        self
    }

    /// Delay the next writes, one entry per write, in issue order.
    pub fn with_write_delays(self, delays: impl IntoIterator<Item = Duration>) -> Self {
        self.data.lock().unwrap().write_delays = delays.into_iter().collect();
        self
    }

    /// Delay every roster fetch from now on.
    pub fn set_roster_delay(&self, delay: Duration) {
        self.data.lock().unwrap().roster_delay = Some(delay);
    }

    pub fn set_agents(&self, agents: Vec<Agent>) {
        self.data.lock().unwrap().agents = agents;
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.data.lock().unwrap().tasks.clone()
    }

    pub fn workflows(&self) -> Vec<WorkflowRecord> {
        self.data.lock().unwrap().workflows.clone()
    }

    /// Task updates in the order the backend applied them.
    pub fn applied_updates(&self) -> Vec<(TaskId, TaskUpdate)> {
        self.data.lock().unwrap().applied.clone()
    }

    fn record(&self, call: BackendCall) {
        let _ = self.calls.send(call);
    }

    fn next_write_delay(&self) -> Duration {
        self.data.lock().unwrap().write_delays.pop_front().unwrap_or_default()
    }

    fn write<T>(&self, f: impl FnOnce(&mut Data) -> Result<T>) -> Result<T> {
        let mut data = self.data.lock().unwrap();
        if data.fail_writes {
            return Err(OfficeflowError::Backend("HTTP 500: write rejected".into()));
        }
        f(&mut data)
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

impl Backend for MemoryBackend {
    fn list_agents(&self, project: ProjectId) -> BoxFuture<'_, Result<Vec<Agent>>> {
        self.record(BackendCall::ListAgents(project));
        let delay = self.data.lock().unwrap().roster_delay.unwrap_or_default();
        Box::pin(async move {
            pause(delay).await;
            Ok(self.data.lock().unwrap().agents.clone())
        })
    }

    fn list_tasks(&self, project: ProjectId) -> BoxFuture<'_, Result<Vec<Task>>> {
        self.record(BackendCall::ListTasks(project));
        let tasks = self.data.lock().unwrap().tasks.clone();
        Box::pin(async move { Ok(tasks) })
    }

    fn update_task(&self, task: TaskId, update: TaskUpdate) -> BoxFuture<'_, Result<Task>> {
        self.record(BackendCall::UpdateTask(task, update.clone()));
        let delay = self.next_write_delay();
        Box::pin(async move {
            pause(delay).await;
            self.write(|data| {
                let Some(t) = data.tasks.iter_mut().find(|t| t.id == task) else {
                    return Err(OfficeflowError::Backend(format!("HTTP 404: task {task}")));
                };
                if let Some(assignee) = update.assigned_agent_id {
                    t.assigned_agent_id = assignee;
                }
                if let Some(status) = update.status {
                    t.status = status;
                }
                let saved = t.clone();
                data.applied.push((task, update));
                Ok(saved)
            })
        })
    }

    fn list_workflows(&self, project: ProjectId) -> BoxFuture<'_, Result<Vec<WorkflowRecord>>> {
        self.record(BackendCall::ListWorkflows(project));
        let workflows = self.data.lock().unwrap().workflows.clone();
        Box::pin(async move { Ok(workflows) })
    }

    fn save_workflow(&self, record: WorkflowRecord) -> BoxFuture<'_, Result<WorkflowRecord>> {
        self.record(BackendCall::SaveWorkflow(record.clone()));
        let delay = self.next_write_delay();
        Box::pin(async move {
            pause(delay).await;
            self.write(|data| {
                match data.workflows.iter_mut().find(|w| w.id == record.id) {
                    Some(existing) => *existing = record.clone(),
                    None => data.workflows.push(record.clone()),
                }
                Ok(record)
            })
        })
    }

    fn create_workflow(
        &self,
        project: ProjectId,
        name: String,
    ) -> BoxFuture<'_, Result<WorkflowRecord>> {
        self.record(BackendCall::CreateWorkflow(project, name.clone()));
        Box::pin(async move {
            self.write(|data| {
                let id = data.workflows.iter().map(|w| w.id).max().unwrap_or(0) + 1;
                let record = WorkflowRecord {
                    id,
                    name,
                    steps: Vec::new(),
                    nodes_data: Vec::new(),
                    edges_data: Vec::new(),
                    is_active: false,
                };
                data.workflows.push(record.clone());
                Ok(record)
            })
        })
    }

    // Every stored workflow belongs to the one project under test.
    fn activate_workflow(&self, workflow: i64) -> BoxFuture<'_, Result<WorkflowRecord>> {
        self.record(BackendCall::ActivateWorkflow(workflow));
        Box::pin(async move {
            self.write(|data| {
                let Some(was_active) = data
                    .workflows
                    .iter()
                    .find(|w| w.id == workflow)
                    .map(|w| w.is_active)
                else {
                    return Err(OfficeflowError::Backend(format!(
                        "HTTP 404: workflow {workflow}"
                    )));
                };
                for w in &mut data.workflows {
                    w.is_active = w.id == workflow && !was_active;
                }
                Ok(data
                    .workflows
                    .iter()
                    .find(|w| w.id == workflow)
                    .cloned()
                    .unwrap())
            })
        })
    }
}
