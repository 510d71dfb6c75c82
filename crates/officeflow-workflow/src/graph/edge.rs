use officeflow_core::types::RoleTag;

/// A handoff from one department to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandoffEdge {
    /// Department handing the task off.
    pub source: RoleTag,
    /// Department receiving it.
    pub target: RoleTag,
}

impl HandoffEdge {
    pub fn new(source: RoleTag, target: RoleTag) -> Self {
        Self { source, target }
    }

    pub fn touches(&self, role: RoleTag) -> bool {
        self.source == role || self.target == role
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }

    /// Edge id used in persisted `edges_data`.
    pub fn edge_id(&self) -> String {
        format!("e-{}-{}", self.source, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_helpers() {
        let e = HandoffEdge::new(RoleTag::Lead, RoleTag::Backend);
        assert!(e.touches(RoleTag::Lead));
        assert!(e.touches(RoleTag::Backend));
        assert!(!e.touches(RoleTag::Qa));
        assert!(!e.is_self_loop());
        assert_eq!(e.edge_id(), "e-lead-backend");
    }
}
