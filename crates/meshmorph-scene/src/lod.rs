use crate::{
    collision::CollisionModels,
    graph::{NodeGraph, NodeId},
    objects::SceneMesh,
};
use meshmorph_utils::log::debug;
use std::collections::HashSet;

/// First child of the first LOD group (depth first from `start`) that has
/// children. LOD groups are not searched for nested groups.
pub fn find_lod_group_child(graph: &NodeGraph, start: NodeId) -> Option<NodeId> {
    let node = graph.get(start)?;
    if node.is_lod_group() {
        if let Some(first) = node.child_nodes.first() {
            return Some(*first);
        }
    }

    node.child_nodes
        .iter()
        .find_map(|child| find_lod_group_child(graph, *child))
}

/// Mesh node with the most control points below `start`, ignoring collision
/// proxies and meshes without polygons. Collision proxies met on the way are
/// registered in `collisions`. Ties keep the first node found.
pub fn find_largest_mesh_node(
    graph: &NodeGraph,
    meshes: &[SceneMesh],
    start: NodeId,
    collisions: &mut CollisionModels,
) -> Option<NodeId> {
    let mut seen = HashSet::new();
    let mut found: Option<NodeId> = None;
    let mut max_count = 0;

    for id in graph.depth_first(start) {
        let node = &graph[id];
        let mesh = match node.mesh().and_then(|m| meshes.get(m.0)) {
            Some(mesh) => mesh,
            None => continue,
        };
        if collisions.register(graph, id) || mesh.polygon_vertex_count() == 0 {
            continue;
        }
        if !seen.insert(node.unique_id) {
            continue;
        }

        let count = mesh.control_point_count();
        if count > max_count {
            max_count = count;
            found = Some(id);
        }
    }

    found
}

/// Node that replaces the scene root for the rest of an import: the first LOD
/// level when the scene has LOD groups, otherwise the largest mesh node.
pub fn resolve_lod_root(
    graph: &NodeGraph,
    meshes: &[SceneMesh],
    collisions: &mut CollisionModels,
) -> Option<NodeId> {
    if let Some(lod) = find_lod_group_child(graph, graph.root()) {
        debug!("using first level of LOD group: \"{}\"", graph[lod].name);
        return Some(lod);
    }

    let largest = find_largest_mesh_node(graph, meshes, graph.root(), collisions);
    if let Some(id) = largest {
        debug!("using largest mesh node: \"{}\"", graph[id].name);
    }
    largest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MeshId, Node, NodeAttribute};
    use meshmorph_math::*;

    fn mesh_with_points(name: &str, points: usize) -> SceneMesh {
        SceneMesh::new(
            name,
            vec![DVec3::ZERO; points.max(3)],
            vec![vec![0, 1, 2]],
        )
    }

    #[test]
    fn lod_group_yields_first_child() {
        let mut graph = NodeGraph::new();
        let group = graph
            .add_child(graph.root(), Node::new("LOD").with_attribute(NodeAttribute::LodGroup))
            .unwrap();
        let lod0 = graph.add_child(group, Node::new("LOD0")).unwrap();
        graph.add_child(group, Node::new("LOD1")).unwrap();

        let mut collisions = CollisionModels::new();
        assert_eq!(resolve_lod_root(&graph, &[], &mut collisions), Some(lod0));
    }

    #[test]
    fn empty_lod_group_is_skipped() {
        let mut graph = NodeGraph::new();
        graph
            .add_child(graph.root(), Node::new("LOD").with_attribute(NodeAttribute::LodGroup))
            .unwrap();
        assert_eq!(find_lod_group_child(&graph, graph.root()), None);
    }

    #[test]
    fn largest_mesh_wins_and_ties_keep_first() {
        let meshes = vec![
            mesh_with_points("small", 4),
            mesh_with_points("big", 8),
            mesh_with_points("big_too", 8),
            mesh_with_points("collision", 100),
        ];
        let mut graph = NodeGraph::new();
        let root = graph.root();
        graph
            .add_child(root, Node::new("small").with_attribute(NodeAttribute::Mesh(MeshId(0))))
            .unwrap();
        let big = graph
            .add_child(root, Node::new("big").with_attribute(NodeAttribute::Mesh(MeshId(1))))
            .unwrap();
        graph
            .add_child(root, Node::new("big_too").with_attribute(NodeAttribute::Mesh(MeshId(2))))
            .unwrap();
        let proxy = graph
            .add_child(root, Node::new("UCX_big_01").with_attribute(NodeAttribute::Mesh(MeshId(3))))
            .unwrap();

        let mut collisions = CollisionModels::new();
        assert_eq!(resolve_lod_root(&graph, &meshes, &mut collisions), Some(big));
        assert_eq!(collisions.get("BIG"), Some(&[proxy][..]));
    }

    #[test]
    fn no_meshes_means_no_root() {
        let graph = NodeGraph::new();
        let mut collisions = CollisionModels::new();
        assert_eq!(resolve_lod_root(&graph, &[], &mut collisions), None);
    }
}
