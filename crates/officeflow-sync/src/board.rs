//! User actions on the task board and the workflow canvas.
//!
//! Every action applies to the [`Store`] first and persists in the
//! background. Writes go through one queue and reach the backend in the order
//! they were issued. A failed write is reported as a notice and not retried;
//! the push channel eventually delivers the authoritative state.
//!
//! The first write spawns the queue worker, so actions must be called from
//! within a runtime.

use std::sync::{Arc, OnceLock};

use officeflow_core::error::{OfficeflowError, Result};
use officeflow_core::event::EventBus;
use officeflow_core::traits::Backend;
use officeflow_core::types::*;
use officeflow_workflow::{advance_to_next_step, resolve_assignment, Workflow, WorkflowGraph};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::state::Store;

enum Write {
    Task(TaskId, TaskUpdate),
    Workflow(WorkflowRecord),
    Flush(oneshot::Sender<()>),
}

pub struct Board {
    store: Store,
    backend: Arc<dyn Backend>,
    event_bus: EventBus,
    writer: OnceLock<mpsc::UnboundedSender<Write>>,
}

impl Board {
    pub fn new(store: Store, backend: Arc<dyn Backend>, event_bus: EventBus) -> Self {
        Self {
            store,
            backend,
            event_bus,
            writer: OnceLock::new(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Replace the store contents with a fresh fetch of `project`.
    ///
    /// Switching projects clears the activity log and transcript. Reloading
    /// the current project keeps them, so events already applied by a running
    /// reconciler survive.
    pub async fn load_project(&self, project: ProjectId) -> Result<()> {
        let (agents, tasks, workflows) = futures::try_join!(
            self.backend.list_agents(project),
            self.backend.list_tasks(project),
            self.backend.list_workflows(project),
        )?;

        let workflow = active_workflow(&workflows).map(Workflow::from_record);
        let steps = workflow
            .as_ref()
            .map(|w| w.graph.step_order().to_vec())
            .unwrap_or_default();
        let agent_count = agents.len();
        info!(
            project = %project,
            agents = agent_count,
            tasks = tasks.len(),
            workflows = workflows.len(),
            "Project loaded"
        );

        self.store.with(|state| {
            if state.project != Some(project) {
                state.reset(Some(project));
            }
            state.replace_roster(agents);
            state.tasks = tasks;
            state.workflow = workflow;
        });
        self.event_bus.publish(AppEvent::RosterRefreshed { agents: agent_count });
        self.event_bus.publish(AppEvent::StepOrderChanged { steps });
        Ok(())
    }

    /// Drop a task on a department column, or on the unassigned column with
    /// `None`. Returns the resulting assignee.
    ///
    /// Dropping a task on the department it already sits in changes nothing.
    pub fn move_task(&self, task_id: TaskId, destination: Option<RoleTag>) -> Result<Option<AgentId>> {
        let outcome = self.store.with(|state| -> Result<(Option<AgentId>, bool)> {
            let task = state.task(task_id).ok_or(OfficeflowError::TaskNotFound(task_id))?;
            let unchanged = match (task.assigned_agent_id, destination) {
                (None, None) => true,
                (Some(agent), Some(role)) => state.agent(agent).is_some_and(|a| a.role == role),
                _ => false,
            };
            if unchanged {
                return Ok((task.assigned_agent_id, false));
            }
            let assignee = resolve_assignment(task, destination, &state.agents, &state.tasks)?;
            state.assign(task_id, assignee);
            Ok((assignee, true))
        });

        let (assignee, changed) = self.reported(outcome)?;
        if changed {
            debug!(task_id = %task_id, assignee = ?assignee, "Task moved");
            self.persist_task(task_id, TaskUpdate::assign(assignee));
        }
        Ok(assignee)
    }

    /// Hand a task to the next department of the active workflow.
    pub fn advance_task(&self, task_id: TaskId) -> Result<AgentId> {
        let outcome = self.store.with(|state| -> Result<AgentId> {
            let task = state.task(task_id).ok_or(OfficeflowError::TaskNotFound(task_id))?;
            let workflow = state.workflow.as_ref().ok_or(OfficeflowError::NoActiveWorkflow)?;
            let next = advance_to_next_step(
                task,
                workflow.graph.step_order(),
                &state.agents,
                &state.tasks,
            )?;
            state.assign(task_id, Some(next));
            Ok(next)
        });

        let assignee = self.reported(outcome)?;
        debug!(task_id = %task_id, assignee = %assignee, "Task advanced");
        self.persist_task(task_id, TaskUpdate::assign(Some(assignee)));
        Ok(assignee)
    }

    pub fn add_department(&self, role: RoleTag, position: Position) -> Result<()> {
        self.edit_workflow(|graph| graph.add_department(role, position))
    }

    pub fn remove_department(&self, role: RoleTag) -> Result<()> {
        self.edit_workflow(|graph| graph.remove_department(role).map(|_| ()))
    }

    pub fn move_department(&self, role: RoleTag, position: Position) -> Result<()> {
        self.edit_workflow(|graph| graph.move_department(role, position))
    }

    /// Add a handoff edge. Returns false if it already existed.
    pub fn connect(&self, source: RoleTag, target: RoleTag) -> Result<bool> {
        self.edit_workflow(|graph| graph.connect(source, target))
    }

    /// Remove a handoff edge. Returns false if it did not exist.
    pub fn disconnect(&self, source: RoleTag, target: RoleTag) -> Result<bool> {
        self.edit_workflow(|graph| Ok(graph.disconnect(source, target)))
    }

    /// Create an empty workflow in the loaded project. The canvas is left
    /// alone until the workflow is activated.
    pub async fn create_workflow(&self, name: &str) -> Result<WorkflowRecord> {
        let project = self.store.with(|state| state.project);
        let project = self.reported(project.ok_or(OfficeflowError::NoProjectLoaded))?;
        let record = self.reported(
            self.backend
                .create_workflow(project, name.to_string())
                .await,
        )?;
        info!(project = %project, workflow_id = record.id, "Workflow created");
        Ok(record)
    }

    /// Toggle a workflow's active flag and install the outcome: an activated
    /// workflow becomes the canvas, a deactivated canvas is cleared.
    ///
    /// Pending writes are flushed first so they land before the switch.
    pub async fn activate_workflow(&self, workflow_id: i64) -> Result<WorkflowRecord> {
        self.flush().await;
        let record = self.reported(self.backend.activate_workflow(workflow_id).await)?;

        let steps = self.store.with(|state| {
            if record.is_active {
                state.workflow = Some(Workflow::from_record(&record));
            } else if state.workflow.as_ref().is_some_and(|w| w.id == record.id) {
                state.workflow = None;
            }
            state.step_order().to_vec()
        });
        info!(workflow_id, active = record.is_active, steps = ?steps, "Workflow toggled");
        self.event_bus.publish(AppEvent::StepOrderChanged { steps });
        Ok(record)
    }

    fn edit_workflow<R>(&self, edit: impl FnOnce(&mut WorkflowGraph) -> Result<R>) -> Result<R> {
        let outcome = self.store.with(|state| -> Result<(R, Vec<RoleTag>, WorkflowRecord)> {
            let workflow = state.workflow.as_mut().ok_or(OfficeflowError::NoActiveWorkflow)?;
            let before = workflow.graph.step_order().to_vec();
            let value = edit(&mut workflow.graph)?;
            let record = workflow.to_record(&state.agents);
            Ok((value, before, record))
        });

        let (value, before, record) = self.reported(outcome)?;
        if record.steps != before {
            info!(workflow_id = record.id, steps = ?record.steps, "Step order changed");
            self.event_bus.publish(AppEvent::StepOrderChanged {
                steps: record.steps.clone(),
            });
        }
        self.persist_workflow(record);
        Ok(value)
    }

    /// Publish a notice for a failed action and pass the result through.
    fn reported<T>(&self, outcome: Result<T>) -> Result<T> {
        if let Err(ref e) = outcome {
            if e.is_informational() {
                debug!(error = %e, "Action declined");
                self.event_bus.publish(AppEvent::info(e.to_string()));
            } else {
                warn!(error = %e, "Action failed");
                self.event_bus.publish(AppEvent::warning(e.to_string()));
            }
        }
        outcome
    }

    /// Wait for every background write issued so far.
    pub async fn flush(&self) {
        let Some(writer) = self.writer.get() else {
            return;
        };
        let (done, wait) = oneshot::channel();
        if writer.send(Write::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }

    fn persist_task(&self, task_id: TaskId, update: TaskUpdate) {
        self.enqueue(Write::Task(task_id, update));
    }

    fn persist_workflow(&self, record: WorkflowRecord) {
        self.enqueue(Write::Workflow(record));
    }

    fn enqueue(&self, write: Write) {
        let writer = self.writer.get_or_init(|| {
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(drain_writes(self.backend.clone(), self.event_bus.clone(), rx));
            tx
        });
        if writer.send(write).is_err() {
            warn!("Write queue closed, change not saved");
        }
    }
}

/// Apply queued writes one at a time, in issue order.
async fn drain_writes(
    backend: Arc<dyn Backend>,
    event_bus: EventBus,
    mut queue: mpsc::UnboundedReceiver<Write>,
) {
    while let Some(write) = queue.recv().await {
        match write {
            Write::Task(task_id, update) => {
                if let Err(e) = backend.update_task(task_id, update).await {
                    warn!(task_id = %task_id, error = %e, "Task update not saved");
                    event_bus.publish(AppEvent::error(format!("Could not save task {task_id}: {e}")));
                }
            }
            Write::Workflow(record) => {
                let id = record.id;
                if let Err(e) = backend.save_workflow(record).await {
                    warn!(workflow_id = id, error = %e, "Workflow not saved");
                    event_bus.publish(AppEvent::error(format!("Could not save workflow {id}: {e}")));
                }
            }
            Write::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("Write queue closed");
}
