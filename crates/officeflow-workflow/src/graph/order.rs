use std::collections::{HashMap, HashSet, VecDeque};

use officeflow_core::types::RoleTag;

use super::edge::HandoffEdge;

/// Kahn topological sort of departments into a step order.
///
/// Zero in-degree departments are seeded in the order they appear in
/// `departments`; successors are released in edge order. Departments on or
/// downstream of a cycle never reach in-degree zero and are left out.
/// Edges naming a department not in `departments` are ignored.
pub fn compute_step_order(departments: &[RoleTag], edges: &[HandoffEdge]) -> Vec<RoleTag> {
    let mut seen = HashSet::new();
    let nodes: Vec<RoleTag> = departments
        .iter()
        .copied()
        .filter(|role| seen.insert(*role))
        .collect();

    let mut in_degree: HashMap<RoleTag, usize> = nodes.iter().map(|r| (*r, 0)).collect();
    let mut successors: HashMap<RoleTag, Vec<RoleTag>> = HashMap::new();

    for edge in edges {
        if !in_degree.contains_key(&edge.source) {
            continue;
        }
        if let Some(degree) = in_degree.get_mut(&edge.target) {
            *degree += 1;
            successors.entry(edge.source).or_default().push(edge.target);
        }
    }

    let mut queue: VecDeque<RoleTag> = nodes
        .iter()
        .copied()
        .filter(|r| in_degree.get(r) == Some(&0))
        .collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(role) = queue.pop_front() {
        order.push(role);
        let Some(next) = successors.get(&role) else {
            continue;
        };
        for target in next {
            if let Some(degree) = in_degree.get_mut(target) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(*target);
                }
            }
        }
    }

    order
}
