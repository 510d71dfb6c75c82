//! Applies decoded push events to the [`AppState`].
//!
//! Every reducer is idempotent: applying the same event twice leaves the
//! state as applying it once.

use officeflow_core::types::{AgentStatus, LogEntry, TranscriptEntry};
use tracing::debug;

use crate::protocol::{Inbound, InboundEvent};
use crate::state::AppState;

/// Follow-up work an event asks of the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Replace the roster with an authoritative fetch.
    RefetchRoster,
}

pub fn apply(state: &mut AppState, inbound: &Inbound) -> Effect {
    let ts = inbound.ts;
    match &inbound.event {
        InboundEvent::Connected(p) => {
            debug!(project_id = ?p.project_id, "Push channel acknowledged");
        }
        InboundEvent::AgentStatus(p) => {
            state.set_agent_status(p.agent_id, p.status);
        }
        InboundEvent::TaskUpdated(p) => {
            state.upsert_task(p.task_id, p.title.as_deref(), p.status, p.assigned_agent_id);
        }
        InboundEvent::LogAppend(p) => {
            state.push_log(LogEntry {
                ts,
                level: p.level.clone(),
                agent_id: p.agent_id,
                message: p.message.clone(),
            });
        }
        InboundEvent::ToolExecution(p) => {
            let message = match &p.event_type {
                Some(kind) => format!("[{kind}] {}", p.content),
                None => p.content.clone(),
            };
            state.push_log(LogEntry {
                ts,
                level: "tool".to_string(),
                agent_id: p.agent_id,
                message,
            });
        }
        InboundEvent::TeamMessage(p) => {
            state.push_transcript(TranscriptEntry {
                ts,
                agent_id: p.agent_id,
                from: p.from.clone(),
                message: p.message.clone(),
            });
        }
        InboundEvent::TaskDelegated(p) => {
            state.push_transcript(TranscriptEntry {
                ts,
                agent_id: Some(p.to_agent_id),
                from: "lead".to_string(),
                message: format!("delegated to {}: {}", p.to_agent_name, p.description),
            });
        }
        InboundEvent::AgentCompleted(p) => {
            state.set_agent_status(p.agent_id, AgentStatus::Stopped);
        }
        InboundEvent::RosterChanged { tag } => {
            debug!(tag = %tag, "Roster changed upstream");
            return Effect::RefetchRoster;
        }
        InboundEvent::Unknown { tag } => {
            debug!(tag = %tag, "Ignoring unknown event");
        }
    }
    Effect::None
}
