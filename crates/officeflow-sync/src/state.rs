use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use officeflow_core::config::SyncConfig;
use officeflow_core::types::*;
use officeflow_workflow::Workflow;

/// Client-side view of one project.
#[derive(Debug, Clone)]
pub struct AppState {
    pub project: Option<ProjectId>,
    pub agents: Vec<Agent>,
    pub agent_status: HashMap<AgentId, AgentStatus>,
    pub tasks: Vec<Task>,
    pub logs: VecDeque<LogEntry>,
    pub transcript: VecDeque<TranscriptEntry>,
    /// The active workflow, if the project has one.
    pub workflow: Option<Workflow>,
    log_tail: usize,
    transcript_tail: usize,
}

impl AppState {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            project: None,
            agents: Vec::new(),
            agent_status: HashMap::new(),
            tasks: Vec::new(),
            logs: VecDeque::new(),
            transcript: VecDeque::new(),
            workflow: None,
            log_tail: config.log_tail.max(1),
            transcript_tail: config.transcript_tail.max(1),
        }
    }

    /// Drop everything belonging to the previous project.
    pub fn reset(&mut self, project: Option<ProjectId>) {
        self.project = project;
        self.agents.clear();
        self.agent_status.clear();
        self.tasks.clear();
        self.logs.clear();
        self.transcript.clear();
        self.workflow = None;
    }

    /// Replace the roster with an authoritative fetch.
    pub fn replace_roster(&mut self, agents: Vec<Agent>) {
        self.agent_status = agents.iter().map(|a| (a.id, a.status)).collect();
        self.agents = agents;
    }

    /// Record a status change. Returns whether anything changed.
    pub fn set_agent_status(&mut self, agent: AgentId, status: AgentStatus) -> bool {
        let previous = self.agent_status.insert(agent, status);
        if let Some(entry) = self.agents.iter_mut().find(|a| a.id == agent) {
            entry.status = status;
        }
        previous != Some(status)
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Set a task's assignee. Returns false if the task is unknown.
    pub fn assign(&mut self, id: TaskId, agent: Option<AgentId>) -> bool {
        match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                task.assigned_agent_id = agent;
                true
            }
            None => false,
        }
    }

    /// Insert a task or overwrite the fields of the existing one.
    pub fn upsert_task(
        &mut self,
        id: TaskId,
        title: Option<&str>,
        status: TaskStatus,
        assignee: Option<AgentId>,
    ) {
        match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                if let Some(title) = title {
                    task.title = title.to_string();
                }
                task.status = status;
                task.assigned_agent_id = assignee;
            }
            None => {
                let mut task = Task::new(id.0, title.unwrap_or_default());
                task.status = status;
                task.assigned_agent_id = assignee;
                self.tasks.push(task);
            }
        }
    }

    /// Append to the log tail unless the same timestamped entry is already
    /// retained. Returns whether the entry was appended.
    pub fn push_log(&mut self, entry: LogEntry) -> bool {
        if entry.ts.is_some() && self.logs.contains(&entry) {
            return false;
        }
        push_capped(&mut self.logs, entry, self.log_tail);
        true
    }

    /// Transcript counterpart of [`push_log`](Self::push_log).
    pub fn push_transcript(&mut self, entry: TranscriptEntry) -> bool {
        if entry.ts.is_some() && self.transcript.contains(&entry) {
            return false;
        }
        push_capped(&mut self.transcript, entry, self.transcript_tail);
        true
    }

    /// Step order of the active workflow; empty without one.
    pub fn step_order(&self) -> &[RoleTag] {
        self.workflow
            .as_ref()
            .map(|w| w.graph.step_order())
            .unwrap_or_default()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(&SyncConfig::default())
    }
}

fn push_capped<T>(buf: &mut VecDeque<T>, item: T, cap: usize) {
    while buf.len() >= cap {
        buf.pop_front();
    }
    buf.push_back(item);
}

/// Shared handle to the [`AppState`].
///
/// Every read and write goes through [`Store::with`], so a closure observes
/// and mutates the state atomically with respect to other holders.
#[derive(Clone, Default)]
pub struct Store {
    inner: Arc<Mutex<AppState>>,
}

impl Store {
    pub fn new(state: AppState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut AppState) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> AppState {
        self.with(|state| state.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(message: &str, ts: bool) -> LogEntry {
        LogEntry {
            ts: ts.then_some(chrono::DateTime::<chrono::Utc>::UNIX_EPOCH),
            level: "info".into(),
            agent_id: None,
            message: message.into(),
        }
    }

    #[test]
    fn log_tail_is_capped() {
        let config = SyncConfig {
            log_tail: 2,
            ..SyncConfig::default()
        };
        let mut state = AppState::new(&config);
        for m in ["a", "b", "c"] {
            state.push_log(log(m, false));
        }
        let messages: Vec<_> = state.logs.iter().map(|l| l.message.as_str()).collect();
        assert_eq!(messages, ["b", "c"]);
    }

    #[test]
    fn redelivered_log_is_ignored() {
        let mut state = AppState::default();
        assert!(state.push_log(log("a", true)));
        assert!(!state.push_log(log("a", true)));
        assert_eq!(state.logs.len(), 1);
    }

    #[test]
    fn untimestamped_logs_are_never_deduplicated() {
        let mut state = AppState::default();
        assert!(state.push_log(log("a", false)));
        assert!(state.push_log(log("a", false)));
        assert_eq!(state.logs.len(), 2);
    }

    #[test]
    fn status_updates_map_and_roster() {
        let mut state = AppState::default();
        state.replace_roster(vec![Agent::new(1, "Ada", RoleTag::Lead)]);
        assert!(state.set_agent_status(AgentId(1), AgentStatus::Working));
        assert!(!state.set_agent_status(AgentId(1), AgentStatus::Working));
        assert_eq!(state.agent(AgentId(1)).unwrap().status, AgentStatus::Working);
        assert_eq!(state.agent_status[&AgentId(1)], AgentStatus::Working);
    }

    #[test]
    fn upsert_inserts_then_overwrites() {
        let mut state = AppState::default();
        state.upsert_task(TaskId(5), Some("Write docs"), TaskStatus::Todo, None);
        state.upsert_task(TaskId(5), None, TaskStatus::Review, Some(AgentId(2)));
        assert_eq!(state.tasks.len(), 1);
        let task = state.task(TaskId(5)).unwrap();
        assert_eq!(task.title, "Write docs");
        assert_eq!(task.status, TaskStatus::Review);
        assert_eq!(task.assigned_agent_id, Some(AgentId(2)));
    }

    #[test]
    fn reset_clears_project_data() {
        let mut state = AppState::default();
        state.upsert_task(TaskId(1), Some("t"), TaskStatus::Todo, None);
        state.push_log(log("a", false));
        state.reset(Some(ProjectId(9)));
        assert_eq!(state.project, Some(ProjectId(9)));
        assert!(state.tasks.is_empty());
        assert!(state.logs.is_empty());
        assert!(state.step_order().is_empty());
    }
}
