pub mod graph;
pub mod router;

pub use graph::{compute_step_order, Department, HandoffEdge, Workflow, WorkflowGraph};
pub use router::{advance_to_next_step, agent_loads, current_step_index, resolve_assignment};
