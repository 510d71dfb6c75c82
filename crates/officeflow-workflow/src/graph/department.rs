use officeflow_core::types::{Position, RoleTag};

/// A department node on the workflow canvas.
///
/// The role tag is the node's identity: a workflow holds at most one
/// department per role.
#[derive(Debug, Clone, PartialEq)]
pub struct Department {
    pub role: RoleTag,
    /// Where the node sits on the canvas. Not part of routing.
    pub position: Position,
}

impl Department {
    pub fn new(role: RoleTag) -> Self {
        Self {
            role,
            position: Position::default(),
        }
    }

    /// Set the canvas position.
    pub fn at(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// Node id used in persisted `nodes_data`.
    pub fn node_id(&self) -> String {
        node_id_for(self.role)
    }
}

pub(crate) fn node_id_for(role: RoleTag) -> String {
    format!("dept-{}", role)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_department_builder() {
        let dept = Department::new(RoleTag::Qa).at(Position { x: 1.0, y: 2.0 });
        assert_eq!(dept.role, RoleTag::Qa);
        assert_eq!(dept.position.x, 1.0);
        assert_eq!(dept.node_id(), "dept-qa");
    }
}
