use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

use officeflow_core::types::{Agent, RoleTag};

/// Lead, two backend agents, one QA agent.
pub fn roster() -> Vec<Agent> {
    vec![
        Agent::new(1, "Ada", RoleTag::Lead),
        Agent::new(2, "Bo", RoleTag::Backend),
        Agent::new(3, "Cy", RoleTag::Backend),
        Agent::new(4, "Di", RoleTag::Qa),
    ]
}

/// Serialized push envelope with a fixed timestamp `seq` seconds after a
/// common epoch, so repeated calls with the same arguments are identical.
pub fn envelope(tag: &str, seq: u32, data: Value) -> String {
    let ts = Utc
        .with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
        .single()
        .map(|t| t + chrono::Duration::seconds(i64::from(seq)))
        .map(|t| t.to_rfc3339())
        .unwrap_or_default();
    json!({ "type": tag, "ts": ts, "data": data }).to_string()
}

pub fn log_append(seq: u32, agent_id: i64, message: &str) -> String {
    envelope(
        "log.append",
        seq,
        json!({ "level": "info", "agent_id": agent_id, "message": message }),
    )
}

pub fn agent_status(seq: u32, agent_id: i64, status: &str) -> String {
    envelope(
        "agent.status",
        seq,
        json!({ "agent_id": agent_id, "status": status, "message": "" }),
    )
}

pub fn task_updated(seq: u32, task_id: i64, status: &str, assigned: Option<i64>) -> String {
    envelope(
        "task.updated",
        seq,
        json!({
            "task_id": task_id,
            "title": format!("Task {task_id}"),
            "status": status,
            "assigned_agent_id": assigned,
        }),
    )
}
