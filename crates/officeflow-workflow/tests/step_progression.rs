use officeflow_core::error::OfficeflowError;
use officeflow_core::types::{Agent, Position, RoleTag, Task};
use officeflow_workflow::{advance_to_next_step, resolve_assignment, WorkflowGraph};

fn roster() -> Vec<Agent> {
    vec![
        Agent::new(1, "Ada", RoleTag::Lead),
        Agent::new(2, "Bo", RoleTag::Backend),
        Agent::new(3, "Cy", RoleTag::Qa),
    ]
}

#[test]
fn task_walks_lead_backend_qa_then_stops() {
    let graph = WorkflowGraph::linear(&[RoleTag::Lead, RoleTag::Backend, RoleTag::Qa]);
    let roster = roster();
    let mut task = Task::new(1, "Ship login page");
    let role_of = |task: &Task| {
        let id = task.assigned_agent_id.unwrap();
        roster.iter().find(|a| a.id == id).unwrap().role
    };

    let mut visited = Vec::new();
    for _ in 0..3 {
        let all = vec![task.clone()];
        let next = advance_to_next_step(&task, graph.step_order(), &roster, &all).unwrap();
        task.assigned_agent_id = Some(next);
        visited.push(role_of(&task));
    }
    assert_eq!(visited, vec![RoleTag::Lead, RoleTag::Backend, RoleTag::Qa]);

    let before = task.clone();
    let err = advance_to_next_step(&task, graph.step_order(), &roster, &[task.clone()]).unwrap_err();
    assert!(matches!(err, OfficeflowError::AlreadyAtFinalStep { role: RoleTag::Qa }));
    assert_eq!(task, before);
}

#[test]
fn graph_edits_are_visible_to_the_next_routing_call() {
    let mut graph = WorkflowGraph::linear(&[RoleTag::Lead, RoleTag::Qa]);
    let roster = roster();
    let task = Task::new(1, "t").assigned_to(roster[0].id);

    let next = advance_to_next_step(&task, graph.step_order(), &roster, &[]).unwrap();
    assert_eq!(next, roster[2].id);

    // Insert backend between lead and qa.
    graph.add_department(RoleTag::Backend, Position::default()).unwrap();
    graph.disconnect(RoleTag::Lead, RoleTag::Qa);
    graph.connect(RoleTag::Lead, RoleTag::Backend).unwrap();
    graph.connect(RoleTag::Backend, RoleTag::Qa).unwrap();

    let next = advance_to_next_step(&task, graph.step_order(), &roster, &[]).unwrap();
    assert_eq!(next, roster[1].id);
}

#[test]
fn cyclic_departments_are_not_routable_by_advance() {
    let mut graph = WorkflowGraph::linear(&[RoleTag::Lead, RoleTag::Backend, RoleTag::Qa]);
    graph.connect(RoleTag::Qa, RoleTag::Backend).unwrap();
    let roster = roster();

    // Backend sits on the cycle, so a backend task cannot advance.
    let task = Task::new(1, "t").assigned_to(roster[1].id);
    let err = advance_to_next_step(&task, graph.step_order(), &roster, &[]).unwrap_err();
    assert!(matches!(err, OfficeflowError::NotInWorkflow { role: RoleTag::Backend }));

    // Lead is the only ordered step, so lead is also the final one.
    let task = Task::new(2, "t").assigned_to(roster[0].id);
    let err = advance_to_next_step(&task, graph.step_order(), &roster, &[]).unwrap_err();
    assert!(matches!(err, OfficeflowError::AlreadyAtFinalStep { role: RoleTag::Lead }));

    // Direct drops still work for excluded departments.
    let got = resolve_assignment(&task, Some(RoleTag::Backend), &roster, &[]).unwrap();
    assert_eq!(got, Some(roster[1].id));
}
