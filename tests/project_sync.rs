use std::sync::Arc;
use std::time::Duration;

use officeflow_core::config::SyncConfig;
use officeflow_core::event::EventBus;
use officeflow_core::types::*;
use officeflow_sync::{AppState, Board, Store, Subscription};
use officeflow_test_utils::{fixtures, MemoryBackend, ScriptedConnector};
use officeflow_workflow::{Workflow, WorkflowGraph};

const PROJECT: ProjectId = ProjectId(3);

async fn until(store: &Store, check: impl Fn(&AppState) -> bool) {
    for _ in 0..200 {
        if store.with(|s| check(s)) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

#[tokio::test(start_paused = true)]
async fn live_updates_and_board_actions_share_one_store() {
    let mut workflow = Workflow::new(
        1,
        "Delivery",
        WorkflowGraph::linear(&[RoleTag::Lead, RoleTag::Backend, RoleTag::Qa]),
    );
    workflow.is_active = true;

    let (backend, _calls) = MemoryBackend::new();
    let backend = Arc::new(
        backend
            .with_agents(fixtures::roster())
            .with_tasks(vec![Task::new(1, "Draft plan")])
            .with_workflows(vec![workflow.to_record(&fixtures::roster())]),
    );
    let connector = Arc::new(ScriptedConnector::new());
    let feed = connector.accept();

    let config = SyncConfig::default();
    let bus = EventBus::new(64);
    let store = Store::new(AppState::new(&config));
    let board = Board::new(store.clone(), backend.clone(), bus.clone());
    board.load_project(PROJECT).await.unwrap();

    let mut subscription = Subscription::new(connector, backend.clone(), store.clone(), bus, config);
    subscription.set_key(Some(PROJECT));

    // A task created upstream arrives over the push channel.
    feed.unbounded_send(Ok(fixtures::task_updated(1, 2, "todo", None)))
        .unwrap();
    until(&store, |s| s.task(TaskId(2)).is_some()).await;

    // Both tasks walk the pipeline; the second backend hop balances load.
    assert_eq!(board.advance_task(TaskId(1)).unwrap(), AgentId(1));
    assert_eq!(board.advance_task(TaskId(1)).unwrap(), AgentId(2));
    assert_eq!(board.advance_task(TaskId(2)).unwrap(), AgentId(1));
    assert_eq!(board.advance_task(TaskId(2)).unwrap(), AgentId(3));
    board.flush().await;

    let saved = backend.tasks();
    assert_eq!(saved[0].assigned_agent_id, Some(AgentId(2)));

    // The backend later confirms a different assignee: last write wins.
    feed.unbounded_send(Ok(fixtures::task_updated(2, 1, "review", Some(4))))
        .unwrap();
    until(&store, |s| s.task(TaskId(1)).unwrap().status == TaskStatus::Review).await;
    assert_eq!(
        store.with(|s| s.task(TaskId(1)).unwrap().assigned_agent_id),
        Some(AgentId(4))
    );

    subscription.shutdown().await;
    assert_eq!(subscription.state(), ConnectionState::Idle);
}
