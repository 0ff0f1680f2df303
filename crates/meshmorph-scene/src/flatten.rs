use crate::{
    animation::PoseTime,
    collision::CollisionModels,
    graph::{normalize_pivots, NodeGraph, NodeId},
    objects::{FlattenedMesh, SceneMesh},
    skin::{deform_control_points, ScenePose, SkinnedMeshNode},
    Scene,
};
use meshmorph_math::*;
use meshmorph_utils::log::{debug, trace};
use std::collections::HashMap;

/// Where the total transform of a mesh node comes from while flattening.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TransformSource {
    /// The scene evaluator, after the scene was converted to the target axes.
    Evaluator,
    /// The global transforms resolved from the effective root.
    GlobalTransformMap,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FlattenOptions {
    pub transform_source: TransformSource,
    /// Pose used to evaluate skin deformation.
    pub pose_time: PoseTime,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            transform_source: TransformSource::Evaluator,
            pose_time: PoseTime::Infinite,
        }
    }
}

/// Depth first collection of all renderable mesh nodes below `start`. Collision
/// proxies are registered in `collisions` instead. Accepted nodes get their
/// pivots normalized.
pub fn collect_mesh_nodes(
    graph: &mut NodeGraph,
    meshes: &[SceneMesh],
    start: NodeId,
    collisions: &mut CollisionModels,
) -> Vec<NodeId> {
    let mut nodes = Vec::new();

    for id in graph.depth_first(start) {
        let has_mesh = graph[id].mesh().and_then(|m| meshes.get(m.0));
        let mesh = match has_mesh {
            Some(mesh) => mesh,
            None => continue,
        };
        if collisions.register(graph, id) || mesh.polygon_vertex_count() == 0 {
            continue;
        }

        normalize_pivots(&mut graph[id]);
        nodes.push(id);
    }

    nodes
}

/// Converts a scene space position to the output convention.
#[inline]
pub fn convert_position(p: DVec3) -> Vec3 {
    Vec3::new(p.x as f32, -p.y as f32, p.z as f32)
}

/// Builds one indexed triangle mesh from `mesh_nodes`. Triangles carry the
/// ordinal of their node in `mesh_nodes` as group id. Vertices are shared per
/// node through the control point they come from. Quads are split along the
/// 0-2 diagonal; other polygon sizes are skipped.
pub fn flatten_mesh_nodes(
    scene: &mut Scene,
    mesh_nodes: &[NodeId],
    global_transforms: &HashMap<NodeId, AffineMatrix>,
    options: &FlattenOptions,
) -> FlattenedMesh {
    let Scene {
        graph,
        meshes,
        evaluator,
        ..
    } = scene;

    let mut output = FlattenedMesh::new();

    for (ordinal, id) in mesh_nodes.iter().enumerate() {
        let mesh_id = match graph.get(*id).and_then(|n| n.mesh()) {
            Some(mesh_id) => mesh_id,
            None => continue,
        };
        let mesh = match meshes.get_mut(mesh_id.0) {
            Some(mesh) => mesh,
            None => continue,
        };

        let total = match options.transform_source {
            TransformSource::Evaluator => {
                evaluator.global_transform(graph, *id, PoseTime::Infinite)
            }
            TransformSource::GlobalTransformMap => match global_transforms.get(id) {
                Some(m) => *m,
                None => {
                    debug!("no global transform for \"{}\", using identity", graph[*id].name);
                    AffineMatrix::IDENTITY
                }
            },
        };

        let removed = mesh.remove_bad_polygons();
        if removed > 0 {
            debug!("removed {} bad polygons from \"{}\"", removed, mesh.name);
        }

        let points = if mesh.cluster_count() > 0 {
            let skinned = SkinnedMeshNode {
                node: *id,
                global: evaluator.global_transform(graph, *id, PoseTime::Infinite),
            };
            let mut pose = ScenePose {
                graph,
                evaluator,
                time: options.pose_time,
            };
            deform_control_points(&mesh.control_points, &mesh.skins, &skinned, &mut pose)
        } else {
            mesh.control_points.clone()
        };

        let group = ordinal as u32;
        let mut index_map: HashMap<u32, u32> = HashMap::new();
        let mut vertex = |output: &mut FlattenedMesh, control_point: u32| -> u32 {
            *index_map.entry(control_point).or_insert_with(|| {
                let p = total.transform_point(points[control_point as usize]);
                output.append_vertex(convert_position(p))
            })
        };

        for polygon in mesh.polygons.iter() {
            match polygon.len() {
                3 => {
                    let t = [
                        vertex(&mut output, polygon[0]),
                        vertex(&mut output, polygon[1]),
                        vertex(&mut output, polygon[2]),
                    ];
                    output.append_triangle(t, group);
                }
                4 => {
                    let q = [
                        vertex(&mut output, polygon[0]),
                        vertex(&mut output, polygon[1]),
                        vertex(&mut output, polygon[2]),
                        vertex(&mut output, polygon[3]),
                    ];
                    output.append_triangle([q[0], q[1], q[2]], group);
                    output.append_triangle([q[0], q[2], q[3]], group);
                }
                n => trace!("skipping polygon with {} corners in \"{}\"", n, mesh.name),
            }
        }
    }

    output.compute_normals();
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Cluster, LinkMode, MeshId, Node, NodeAttribute, Skin};

    fn quad_scene() -> (Scene, NodeId) {
        let mut scene = Scene::new("quad");
        let mesh = scene.add_mesh(SceneMesh::new(
            "quad",
            vec![
                DVec3::new(0.0, 0.0, 0.0),
                DVec3::new(1.0, 0.0, 0.0),
                DVec3::new(1.0, 1.0, 0.0),
                DVec3::new(0.0, 1.0, 0.0),
            ],
            vec![vec![0, 1, 2, 3]],
        ));
        let node = scene
            .graph
            .add_child(
                scene.graph.root(),
                Node::new("quad").with_attribute(NodeAttribute::Mesh(mesh)),
            )
            .unwrap();
        (scene, node)
    }

    #[test]
    fn quad_is_split_along_first_diagonal() {
        let (mut scene, node) = quad_scene();
        let options = FlattenOptions::default();
        let out = flatten_mesh_nodes(&mut scene, &[node], &HashMap::new(), &options);

        assert_eq!(out.triangles, vec![[0, 1, 2], [0, 2, 3]]);
        assert_eq!(out.triangle_groups, vec![0, 0]);
        assert_eq!(out.positions[2], Vec3::new(1.0, -1.0, 0.0));
        assert_eq!(out.normals.len(), 4);
    }

    #[test]
    fn shared_control_points_are_welded_per_node() {
        let mut scene = Scene::new("strip");
        let points = vec![DVec3::ZERO, DVec3::X, DVec3::Y, DVec3::new(1.0, 1.0, 0.0)];
        let mesh = scene.add_mesh(SceneMesh::new(
            "strip",
            points,
            vec![vec![0, 1, 2], vec![2, 1, 3], vec![0, 1], vec![0, 1, 2, 3, 0]],
        ));
        let root = scene.graph.root();
        let a = scene
            .graph
            .add_child(root, Node::new("a").with_attribute(NodeAttribute::Mesh(mesh)))
            .unwrap();
        let b = scene
            .graph
            .add_child(
                root,
                Node::new("b")
                    .with_attribute(NodeAttribute::Mesh(mesh))
                    .with_trs(DVec3::Z, DVec3::ZERO, DVec3::ONE),
            )
            .unwrap();

        let options = FlattenOptions::default();
        let out = flatten_mesh_nodes(&mut scene, &[a, b], &HashMap::new(), &options);

        // Four unique control points per node, nothing shared between nodes.
        assert_eq!(out.vertex_count(), 8);
        assert_eq!(out.triangle_count(), 4);
        assert_eq!(out.triangle_groups, vec![0, 0, 1, 1]);
        assert_eq!(out.triangles[1], [2, 1, 3]);
        assert_eq!(out.triangles[2], [4, 5, 6]);
        assert_eq!(out.positions[4], Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn global_transform_map_is_used_without_conversion() {
        let (mut scene, node) = quad_scene();
        let mut map = HashMap::new();
        map.insert(node, AffineMatrix::from_translation(DVec3::new(10.0, 0.0, 0.0)));
        let options = FlattenOptions {
            transform_source: TransformSource::GlobalTransformMap,
            pose_time: PoseTime::Infinite,
        };

        let out = flatten_mesh_nodes(&mut scene, &[node], &map, &options);
        assert_eq!(out.positions[0], Vec3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn collision_nodes_are_excluded() {
        let mut scene = Scene::new("collision");
        let tri = SceneMesh::new("tri", vec![DVec3::ZERO, DVec3::X, DVec3::Y], vec![vec![0, 1, 2]]);
        let body_mesh = scene.add_mesh(tri.clone());
        let proxy_mesh = scene.add_mesh(tri);
        let root = scene.graph.root();
        let body = scene
            .graph
            .add_child(root, Node::new("Body").with_attribute(NodeAttribute::Mesh(body_mesh)))
            .unwrap();
        let proxy = scene
            .graph
            .add_child(
                root,
                Node::new("UCX_Body_01").with_attribute(NodeAttribute::Mesh(proxy_mesh)),
            )
            .unwrap();

        let mut collisions = CollisionModels::new();
        let nodes = collect_mesh_nodes(&mut scene.graph, &scene.meshes, root, &mut collisions);

        assert_eq!(nodes, vec![body]);
        assert_eq!(collisions.get("BODY"), Some(&[proxy][..]));
        assert!(scene.graph[body].destination_pivots.pivot_state == crate::PivotState::Active);

        let options = FlattenOptions::default();
        let out = flatten_mesh_nodes(&mut scene, &nodes, &HashMap::new(), &options);
        assert_eq!(out.triangle_count(), 1);
    }

    #[test]
    fn skinned_points_are_deformed_and_stale_indices_ignored() {
        let (mut scene, node) = quad_scene();
        let root = scene.graph.root();
        let bone = scene
            .graph
            .add_child(
                root,
                Node::new("bone").with_trs(DVec3::new(0.0, 0.0, 2.0), DVec3::ZERO, DVec3::ONE),
            )
            .unwrap();

        let mesh = &mut scene.meshes[0];
        mesh.skins.push(Skin {
            name: "skin".into(),
            clusters: vec![Cluster {
                link: Some(bone),
                link_mode: LinkMode::Normalize,
                indices: vec![0, 1, 2, 3, 42],
                weights: vec![1.0; 5],
                ..Default::default()
            }],
        });
        assert_eq!(scene.graph[node].mesh(), Some(MeshId(0)));

        let options = FlattenOptions::default();
        let out = flatten_mesh_nodes(&mut scene, &[node], &HashMap::new(), &options);
        assert_eq!(out.vertex_count(), 4);
        assert!(out.positions.iter().all(|p| (p.z - 2.0).abs() < 1e-6));
    }
}
