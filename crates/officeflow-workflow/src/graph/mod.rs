//! Workflow graph: the editable department canvas.
//!
//! A workflow is a directed graph of `Department` nodes (one per role tag)
//! connected by `HandoffEdge`s. The derived step order is a Kahn
//! topological sort of that graph; departments on or downstream of a cycle
//! never reach in-degree zero and are left out of the order.
//!
//! `WorkflowGraph` owns the nodes, edges and step order of the workflow
//! being edited and recomputes the order on every mutation. `Workflow`
//! pairs a graph with the persisted record metadata.

pub mod department;
pub mod edge;
pub mod order;
pub mod persisted;

use officeflow_core::error::{OfficeflowError, Result};
use officeflow_core::types::{Position, RoleTag};
use tracing::debug;

pub use department::Department;
pub use edge::HandoffEdge;
pub use order::compute_step_order;
pub use persisted::Workflow;

/// Departments, handoff edges and the step order derived from them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowGraph {
    departments: Vec<Department>,
    edges: Vec<HandoffEdge>,
    step_order: Vec<RoleTag>,
}

impl WorkflowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from raw parts. Duplicate roles after the first, edges
    /// with unknown endpoints, self-handoffs and repeated edges are skipped.
    pub fn from_parts(departments: Vec<Department>, edges: Vec<HandoffEdge>) -> Self {
        let mut graph = Self::new();
        for dept in departments {
            if graph.contains(dept.role) {
                debug!(role = %dept.role, "Skipping duplicate department");
                continue;
            }
            graph.departments.push(dept);
        }
        for edge in edges {
            let known = graph.contains(edge.source) && graph.contains(edge.target);
            if !known || edge.is_self_loop() || graph.edges.contains(&edge) {
                debug!(source = %edge.source, target = %edge.target, "Skipping invalid handoff edge");
                continue;
            }
            graph.edges.push(edge);
        }
        graph.recompute();
        graph
    }

    /// Build a straight pipeline `roles[0] → roles[1] → ...`.
    pub fn linear(roles: &[RoleTag]) -> Self {
        let departments = roles
            .iter()
            .enumerate()
            .map(|(i, role)| Department::new(*role).at(Position { x: 250.0 * i as f64, y: 0.0 }))
            .collect();
        let edges = roles
            .windows(2)
            .map(|pair| HandoffEdge::new(pair[0], pair[1]))
            .collect();
        Self::from_parts(departments, edges)
    }

    pub fn departments(&self) -> &[Department] {
        &self.departments
    }

    pub fn edges(&self) -> &[HandoffEdge] {
        &self.edges
    }

    /// The canonical progression of departments a task walks through.
    pub fn step_order(&self) -> &[RoleTag] {
        &self.step_order
    }

    pub fn contains(&self, role: RoleTag) -> bool {
        self.departments.iter().any(|d| d.role == role)
    }

    pub fn department(&self, role: RoleTag) -> Option<&Department> {
        self.departments.iter().find(|d| d.role == role)
    }

    /// Departments present on the canvas but absent from the step order
    /// because they sit on or downstream of a cycle.
    pub fn excluded_departments(&self) -> Vec<RoleTag> {
        self.departments
            .iter()
            .map(|d| d.role)
            .filter(|role| !self.step_order.contains(role))
            .collect()
    }

    pub fn has_cycle(&self) -> bool {
        self.step_order.len() < self.departments.len()
    }

    /// Add a department node to the canvas.
    pub fn add_department(&mut self, role: RoleTag, position: Position) -> Result<()> {
        if self.contains(role) {
            return Err(OfficeflowError::DuplicateDepartment(role));
        }
        self.departments.push(Department::new(role).at(position));
        self.recompute();
        Ok(())
    }

    /// Remove a department and every edge touching it.
    pub fn remove_department(&mut self, role: RoleTag) -> Result<Department> {
        let idx = self
            .departments
            .iter()
            .position(|d| d.role == role)
            .ok_or(OfficeflowError::UnknownDepartment(role))?;
        let removed = self.departments.remove(idx);
        self.edges.retain(|e| !e.touches(role));
        self.recompute();
        Ok(removed)
    }

    /// Move a department on the canvas. Does not affect the step order.
    pub fn move_department(&mut self, role: RoleTag, position: Position) -> Result<()> {
        let dept = self
            .departments
            .iter_mut()
            .find(|d| d.role == role)
            .ok_or(OfficeflowError::UnknownDepartment(role))?;
        dept.position = position;
        Ok(())
    }

    /// Add a handoff edge. Returns `false` if the edge already existed.
    pub fn connect(&mut self, source: RoleTag, target: RoleTag) -> Result<bool> {
        for role in [source, target] {
            if !self.contains(role) {
                return Err(OfficeflowError::UnknownDepartment(role));
            }
        }
        if source == target {
            return Err(OfficeflowError::SelfHandoff(source));
        }
        let edge = HandoffEdge::new(source, target);
        if self.edges.contains(&edge) {
            return Ok(false);
        }
        self.edges.push(edge);
        self.recompute();
        Ok(true)
    }

    /// Remove a handoff edge. Returns `false` if there was none.
    pub fn disconnect(&mut self, source: RoleTag, target: RoleTag) -> bool {
        let before = self.edges.len();
        self.edges.retain(|e| !(e.source == source && e.target == target));
        let removed = self.edges.len() != before;
        if removed {
            self.recompute();
        }
        removed
    }

    fn recompute(&mut self) {
        let roles: Vec<RoleTag> = self.departments.iter().map(|d| d.role).collect();
        self.step_order = compute_step_order(&roles, &self.edges);
        debug!(steps = ?self.step_order, "Step order recomputed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use RoleTag::*;

    fn origin() -> Position {
        Position::default()
    }

    #[test]
    fn add_and_connect_recomputes_order() {
        let mut graph = WorkflowGraph::new();
        graph.add_department(Qa, origin()).unwrap();
        graph.add_department(Lead, origin()).unwrap();
        assert_eq!(graph.step_order(), &[Qa, Lead]);

        assert!(graph.connect(Lead, Qa).unwrap());
        assert_eq!(graph.step_order(), &[Lead, Qa]);
    }

    #[test]
    fn duplicate_department_is_rejected() {
        let mut graph = WorkflowGraph::new();
        graph.add_department(Backend, origin()).unwrap();
        let err = graph.add_department(Backend, origin()).unwrap_err();
        assert!(matches!(err, OfficeflowError::DuplicateDepartment(Backend)));
        assert_eq!(graph.departments().len(), 1);
    }

    #[test]
    fn remove_department_cascades_edges() {
        let mut graph = WorkflowGraph::linear(&[Lead, Backend, Qa]);
        let removed = graph.remove_department(Backend).unwrap();
        assert_eq!(removed.role, Backend);
        assert!(graph.edges().is_empty());
        assert_eq!(graph.step_order(), &[Lead, Qa]);
    }

    #[test]
    fn remove_unknown_department_fails() {
        let mut graph = WorkflowGraph::new();
        assert!(matches!(
            graph.remove_department(Docs),
            Err(OfficeflowError::UnknownDepartment(Docs))
        ));
    }

    #[test]
    fn connect_validates_endpoints() {
        let mut graph = WorkflowGraph::linear(&[Lead]);
        assert!(matches!(
            graph.connect(Lead, Qa),
            Err(OfficeflowError::UnknownDepartment(Qa))
        ));
        assert!(matches!(
            graph.connect(Lead, Lead),
            Err(OfficeflowError::SelfHandoff(Lead))
        ));
    }

    #[test]
    fn connect_twice_is_noop() {
        let mut graph = WorkflowGraph::linear(&[Lead, Backend]);
        assert!(!graph.connect(Lead, Backend).unwrap());
        assert_eq!(graph.edges().len(), 1);
    }

    #[test]
    fn disconnect_restores_independent_order() {
        let mut graph = WorkflowGraph::linear(&[Qa, Lead]);
        graph.disconnect(Qa, Lead);
        graph.connect(Lead, Qa).unwrap();
        assert_eq!(graph.step_order(), &[Lead, Qa]);
        assert!(!graph.disconnect(Backend, Qa));
    }

    #[test]
    fn cycle_members_are_reported_as_excluded() {
        let mut graph = WorkflowGraph::linear(&[Lead, Backend, Qa]);
        graph.connect(Qa, Backend).unwrap();
        assert!(graph.has_cycle());
        assert_eq!(graph.step_order(), &[Lead]);
        assert_eq!(graph.excluded_departments(), vec![Backend, Qa]);
    }

    #[test]
    fn from_parts_skips_invalid_input() {
        let graph = WorkflowGraph::from_parts(
            vec![Department::new(Lead), Department::new(Lead), Department::new(Qa)],
            vec![
                HandoffEdge::new(Lead, Qa),
                HandoffEdge::new(Lead, Qa),
                HandoffEdge::new(Lead, Docs),
                HandoffEdge::new(Qa, Qa),
            ],
        );
        assert_eq!(graph.departments().len(), 2);
        assert_eq!(graph.edges(), &[HandoffEdge::new(Lead, Qa)]);
    }

    #[test]
    fn move_department_keeps_order() {
        let mut graph = WorkflowGraph::linear(&[Lead, Qa]);
        graph.move_department(Qa, Position { x: 5.0, y: 6.0 }).unwrap();
        assert_eq!(graph.department(Qa).unwrap().position, Position { x: 5.0, y: 6.0 });
        assert_eq!(graph.step_order(), &[Lead, Qa]);
    }
}
