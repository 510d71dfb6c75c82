//! Least-load task routing.
//!
//! Both entry points are pure functions of their inputs, so they can drive
//! optimistic local updates and be tested without any runtime.

use std::collections::HashMap;

use officeflow_core::error::{OfficeflowError, Result};
use officeflow_core::types::{Agent, AgentId, RoleTag, Task};
use tracing::debug;

/// Number of tasks currently assigned to each agent.
pub fn agent_loads(all_tasks: &[Task]) -> HashMap<AgentId, usize> {
    let mut loads = HashMap::new();
    for agent in all_tasks.iter().filter_map(|t| t.assigned_agent_id) {
        *loads.entry(agent).or_insert(0) += 1;
    }
    loads
}

/// Pick the assignee for `task` when it is dropped on `target`.
///
/// `None` as target means the unassigned column: the result is `None` and
/// nothing else changes. Otherwise the agent of that department with the
/// fewest assigned tasks wins; ties go to the agent listed first in `roster`.
pub fn resolve_assignment(
    task: &Task,
    target: Option<RoleTag>,
    roster: &[Agent],
    all_tasks: &[Task],
) -> Result<Option<AgentId>> {
    let Some(role) = target else {
        debug!(task_id = %task.id, "Routing task to unassigned");
        return Ok(None);
    };

    let loads = agent_loads(all_tasks);
    let mut best: Option<(&Agent, usize)> = None;
    for agent in roster.iter().filter(|a| a.role == role) {
        let load = loads.get(&agent.id).copied().unwrap_or(0);
        // Strict comparison keeps the first-listed agent on ties.
        if best.map_or(true, |(_, min)| load < min) {
            best = Some((agent, load));
        }
    }

    let (agent, load) = best.ok_or(OfficeflowError::NoAgentsInDepartment { role })?;
    debug!(
        task_id = %task.id,
        role = %role,
        agent_id = %agent.id,
        load,
        "Routed task to least-loaded agent"
    );
    Ok(Some(agent.id))
}

/// Index of the task's current department in `step_order`.
///
/// `None` means unassigned (the virtual step before the first department).
/// An assignee outside the roster is `UnknownAgent`; one whose department is
/// not in the step order is `NotInWorkflow`.
pub fn current_step_index(
    task: &Task,
    step_order: &[RoleTag],
    roster: &[Agent],
) -> Result<Option<usize>> {
    let Some(agent_id) = task.assigned_agent_id else {
        return Ok(None);
    };
    let role = roster
        .iter()
        .find(|a| a.id == agent_id)
        .map(|a| a.role)
        .ok_or(OfficeflowError::UnknownAgent(agent_id))?;
    step_order
        .iter()
        .position(|r| *r == role)
        .map(Some)
        .ok_or(OfficeflowError::NotInWorkflow { role })
}

/// Move `task` to the next department of `step_order` and pick its agent.
pub fn advance_to_next_step(
    task: &Task,
    step_order: &[RoleTag],
    roster: &[Agent],
    all_tasks: &[Task],
) -> Result<AgentId> {
    let next = match current_step_index(task, step_order, roster)? {
        None => 0,
        Some(idx) => idx + 1,
    };

    let Some(role) = step_order.get(next).copied() else {
        return Err(match step_order.last().copied() {
            Some(role) => OfficeflowError::AlreadyAtFinalStep { role },
            None => OfficeflowError::EmptyWorkflow,
        });
    };

    resolve_assignment(task, Some(role), roster, all_tasks)?
        .ok_or(OfficeflowError::NoAgentsInDepartment { role })
}
