use std::collections::HashMap;

use officeflow_core::types::{
    Agent, EdgeData, NodeData, NodePayload, RoleTag, WorkflowRecord,
};
use tracing::debug;

use super::department::Department;
use super::edge::HandoffEdge;
use super::WorkflowGraph;

/// A project workflow: record metadata plus the editable graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Workflow {
    pub id: i64,
    pub name: String,
    /// The workflow the router consults.
    pub is_active: bool,
    pub graph: WorkflowGraph,
}

impl Workflow {
    pub fn new(id: i64, name: impl Into<String>, graph: WorkflowGraph) -> Self {
        Self {
            id,
            name: name.into(),
            is_active: false,
            graph,
        }
    }

    /// Rebuild a workflow from its persisted shape.
    ///
    /// Edge endpoints are node ids; edges whose endpoints do not resolve to a
    /// department node are dropped. The stored `steps` are ignored in favour
    /// of a fresh ordering of the graph.
    pub fn from_record(record: &WorkflowRecord) -> Self {
        let mut roles_by_node: HashMap<&str, RoleTag> = HashMap::new();
        let mut departments = Vec::with_capacity(record.nodes_data.len());
        for node in &record.nodes_data {
            roles_by_node.entry(node.id.as_str()).or_insert(node.data.role);
            departments.push(Department::new(node.data.role).at(node.position));
        }

        let edges = record
            .edges_data
            .iter()
            .filter_map(|e| {
                let source = roles_by_node.get(e.source.as_str());
                let target = roles_by_node.get(e.target.as_str());
                match (source, target) {
                    (Some(s), Some(t)) => Some(HandoffEdge::new(*s, *t)),
                    _ => {
                        debug!(edge_id = %e.id, "Dropping edge with unknown endpoint");
                        None
                    }
                }
            })
            .collect();

        let graph = WorkflowGraph::from_parts(departments, edges);
        if graph.step_order() != record.steps.as_slice() {
            debug!(
                workflow_id = record.id,
                stored = ?record.steps,
                computed = ?graph.step_order(),
                "Stored steps differ from graph order"
            );
        }

        Self {
            id: record.id,
            name: record.name.clone(),
            is_active: record.is_active,
            graph,
        }
    }

    /// Persisted shape of this workflow, with `agentCount` per node taken
    /// from `roster` and `steps` set to the current step order.
    pub fn to_record(&self, roster: &[Agent]) -> WorkflowRecord {
        let nodes_data = self
            .graph
            .departments()
            .iter()
            .map(|d| NodeData {
                id: d.node_id(),
                position: d.position,
                data: NodePayload {
                    role: d.role,
                    agent_count: roster.iter().filter(|a| a.role == d.role).count(),
                },
            })
            .collect();

        let edges_data = self
            .graph
            .edges()
            .iter()
            .map(|e| EdgeData {
                id: e.edge_id(),
                source: super::department::node_id_for(e.source),
                target: super::department::node_id_for(e.target),
            })
            .collect();

        WorkflowRecord {
            id: self.id,
            name: self.name.clone(),
            steps: self.graph.step_order().to_vec(),
            nodes_data,
            edges_data,
            is_active: self.is_active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use officeflow_core::types::Position;
    use RoleTag::*;

    fn record() -> WorkflowRecord {
        serde_json::from_value(serde_json::json!({
            "id": 1,
            "name": "Ship it",
            "steps": ["lead", "backend", "qa"],
            "nodes_data": [
                {"id": "n1", "position": {"x": 0.0, "y": 0.0}, "data": {"role": "lead", "agentCount": 1}},
                {"id": "n2", "position": {"x": 250.0, "y": 0.0}, "data": {"role": "backend", "agentCount": 2}},
                {"id": "n3", "position": {"x": 500.0, "y": 0.0}, "data": {"role": "qa", "agentCount": 1}}
            ],
            "edges_data": [
                {"id": "a", "source": "n1", "target": "n2"},
                {"id": "b", "source": "n2", "target": "n3"},
                {"id": "c", "source": "n3", "target": "ghost"}
            ],
            "is_active": true
        }))
        .unwrap()
    }

    #[test]
    fn from_record_resolves_node_ids() {
        let wf = Workflow::from_record(&record());
        assert!(wf.is_active);
        assert_eq!(wf.graph.step_order(), &[Lead, Backend, Qa]);
        assert_eq!(wf.graph.edges().len(), 2);
        assert_eq!(
            wf.graph.department(Backend).unwrap().position,
            Position { x: 250.0, y: 0.0 }
        );
    }

    #[test]
    fn round_trip_preserves_nodes_and_edges() {
        let wf = Workflow::from_record(&record());
        let roster = vec![
            Agent::new(1, "Ada", Lead),
            Agent::new(2, "Bo", Backend),
            Agent::new(3, "Cy", Backend),
        ];
        let out = wf.to_record(&roster);
        assert_eq!(out.steps, vec![Lead, Backend, Qa]);
        assert_eq!(out.nodes_data.len(), 3);
        assert_eq!(out.nodes_data[1].id, "dept-backend");
        assert_eq!(out.nodes_data[1].data.agent_count, 2);
        assert_eq!(out.nodes_data[2].data.agent_count, 0);
        assert_eq!(out.edges_data[0].source, "dept-lead");
        assert_eq!(out.edges_data[0].target, "dept-backend");

        let again = Workflow::from_record(&out);
        assert_eq!(again.graph, wf.graph);
    }

    #[test]
    fn empty_record_gives_empty_graph() {
        let rec = WorkflowRecord {
            id: 2,
            name: "blank".into(),
            steps: vec![],
            nodes_data: vec![],
            edges_data: vec![],
            is_active: false,
        };
        let wf = Workflow::from_record(&rec);
        assert!(wf.graph.step_order().is_empty());
        assert!(!wf.is_active);
    }
}
