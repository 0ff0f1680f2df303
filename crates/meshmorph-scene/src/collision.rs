use crate::graph::{NodeGraph, NodeId};
use std::collections::BTreeMap;

/// Name prefixes that mark a node as a collision proxy.
pub const COLLISION_PREFIXES: [&str; 5] = ["UCX_", "UBX_", "USP_", "UCP_", "MCDCX_"];

/// Drops everything up to and including the last `:` namespace separator.
pub fn strip_namespace(name: &str) -> &str {
    match name.rfind(':') {
        Some(i) => &name[i + 1..],
        None => name,
    }
}

pub fn is_collision_name(name: &str) -> bool {
    let name = strip_namespace(name);
    COLLISION_PREFIXES.iter().any(|p| name.starts_with(p))
}

/// Upper case names of the render meshes a collision proxy may belong to.
///
/// `UCX_Body_01` yields `BODY` (between the first and last underscore) and
/// `BODY_01` (everything after the first underscore).
pub fn collision_mesh_keys(name: &str) -> Vec<String> {
    let name = strip_namespace(name);
    let start = match name.find('_') {
        Some(i) => i + 1,
        None => return Vec::new(),
    };
    let rest = &name[start..];

    let mut keys = Vec::with_capacity(2);
    match rest.rfind('_') {
        Some(end) => {
            keys.push(rest[..end].to_uppercase());
            keys.push(rest.to_uppercase());
        }
        None => keys.push(rest.to_uppercase()),
    }

    keys.retain(|k| !k.is_empty());
    keys.dedup();
    keys
}

/// Collision proxies grouped by the upper case name of the mesh they belong to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollisionModels {
    models: BTreeMap<String, Vec<NodeId>>,
}

impl CollisionModels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `node` when its name marks it as a collision proxy and returns
    /// whether it did.
    pub fn register(&mut self, graph: &NodeGraph, node: NodeId) -> bool {
        let name = match graph.get(node) {
            Some(n) => n.name.as_str(),
            None => return false,
        };
        if !is_collision_name(name) {
            return false;
        }

        for key in collision_mesh_keys(name) {
            let record = self.models.entry(key).or_insert_with(Vec::new);
            if !record.contains(&node) {
                record.push(node);
            }
        }

        true
    }

    pub fn get(&self, mesh_name: &str) -> Option<&[NodeId]> {
        self.models
            .get(&mesh_name.to_uppercase())
            .map(|v| v.as_slice())
    }

    pub fn contains_node(&self, node: NodeId) -> bool {
        self.models.values().any(|v| v.contains(&node))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<NodeId>)> {
        self.models.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Node;

    #[test]
    fn prefixes_are_detected_after_namespace() {
        assert!(is_collision_name("UCX_Body_01"));
        assert!(is_collision_name("rig:MCDCX_Wheel"));
        assert!(is_collision_name("USP_Ball"));
        assert!(!is_collision_name("Body"));
        assert!(!is_collision_name("ucx_body"));
        assert_eq!(strip_namespace("a:b:UBX_Box"), "UBX_Box");
    }

    #[test]
    fn keys_follow_underscore_rules() {
        assert_eq!(collision_mesh_keys("UCX_Body_01"), vec!["BODY", "BODY_01"]);
        assert_eq!(collision_mesh_keys("UCX_Body"), vec!["BODY"]);
        assert_eq!(collision_mesh_keys("UCP_Left_Arm_02"), vec!["LEFT_ARM", "LEFT_ARM_02"]);
        assert!(collision_mesh_keys("UCX_").is_empty());
    }

    #[test]
    fn register_groups_by_key_once() {
        let mut graph = NodeGraph::new();
        let body = graph.add_child(graph.root(), Node::new("Body")).unwrap();
        let proxy = graph.add_child(body, Node::new("UCX_Body_01")).unwrap();

        let mut models = CollisionModels::new();
        assert!(!models.register(&graph, body));
        assert!(models.register(&graph, proxy));
        assert!(models.register(&graph, proxy));

        assert_eq!(models.get("body"), Some(&[proxy][..]));
        assert_eq!(models.get("BODY_01"), Some(&[proxy][..]));
        assert!(models.contains_node(proxy));
        assert!(!models.contains_node(body));
    }
}
