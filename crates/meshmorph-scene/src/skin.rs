use crate::{
    animation::PoseTime,
    graph::{NodeGraph, NodeId, SceneEvaluator},
};
use meshmorph_math::*;
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How the influences of several clusters on one control point are combined.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum LinkMode {
    /// Weighted sum divided by the total weight.
    Normalize,
    /// Weighted sum, the remaining weight keeps the rest position.
    TotalOne,
    /// Influences are multiplied onto each other.
    Additive,
}

impl Default for LinkMode {
    fn default() -> Self {
        LinkMode::Normalize
    }
}

impl LinkMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Normalize" => Some(Self::Normalize),
            "Total1" | "TotalOne" => Some(Self::TotalOne),
            "Additive" => Some(Self::Additive),
            _ => None,
        }
    }
}

/// Binding of a set of control points to a link node.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default)]
pub struct Cluster {
    pub name: String,
    pub link: Option<NodeId>,
    pub link_mode: LinkMode,
    pub indices: Vec<i32>,
    pub weights: Vec<f64>,
    /// Global transform of the mesh at bind time.
    pub transform: AffineMatrix,
    /// Global transform of the link at bind time.
    pub transform_link: AffineMatrix,
    pub associate_model: Option<NodeId>,
    pub transform_associate_model: AffineMatrix,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default)]
pub struct Skin {
    pub name: String,
    pub clusters: Vec<Cluster>,
}

/// Scene state the deformation is evaluated against.
pub trait SkinPose {
    /// Scene space transform of `node` at the pose time.
    fn global_transform(&mut self, node: NodeId) -> AffineMatrix;
    /// Geometric transform of `node`.
    fn geometry(&self, node: NodeId) -> AffineMatrix;
}

/// [SkinPose] backed by a node graph and its evaluator.
pub struct ScenePose<'a> {
    pub graph: &'a NodeGraph,
    pub evaluator: &'a mut SceneEvaluator,
    pub time: PoseTime,
}

impl<'a> SkinPose for ScenePose<'a> {
    fn global_transform(&mut self, node: NodeId) -> AffineMatrix {
        self.evaluator.global_transform(self.graph, node, self.time)
    }

    fn geometry(&self, node: NodeId) -> AffineMatrix {
        self.graph
            .get(node)
            .map(|n| n.source_pivots.geometry())
            .unwrap_or(AffineMatrix::IDENTITY)
    }
}

/// Mesh node context needed by the deformation.
#[derive(Debug, Copy, Clone)]
pub struct SkinnedMeshNode {
    pub node: NodeId,
    /// Total transform of the mesh node.
    pub global: AffineMatrix,
}

/// Transform that moves a control point bound to `cluster` from its bind
/// position to its current position:
/// `(reference_current^-1 * link_current) * (link_init^-1 * reference_init)`.
pub fn cluster_vertex_transform<P: SkinPose>(
    cluster: &Cluster,
    link: NodeId,
    mode: LinkMode,
    mesh: &SkinnedMeshNode,
    pose: &mut P,
) -> AffineMatrix {
    let (reference_init, reference_current) = match (mode, cluster.associate_model) {
        (LinkMode::Additive, Some(associate)) => (
            cluster.transform_associate_model,
            pose.global_transform(associate) * pose.geometry(associate),
        ),
        _ => (cluster.transform * pose.geometry(mesh.node), mesh.global),
    };

    let link_init = cluster.transform_link;
    let link_current = pose.global_transform(link);

    let relative_init = link_init.inverse() * reference_init;
    let relative_current_inverse = reference_current.inverse() * link_current;
    relative_current_inverse * relative_init
}

/// Applies all skin clusters to `points`. The first cluster decides the link
/// mode. Indices outside `points`, zero weights and clusters without a link
/// are skipped. Without clusters the points are returned unchanged.
pub fn deform_control_points<P: SkinPose>(
    points: &[DVec3],
    skins: &[Skin],
    mesh: &SkinnedMeshNode,
    pose: &mut P,
) -> Vec<DVec3> {
    let mut clusters = skins.iter().flat_map(|s| s.clusters.iter()).peekable();
    let mode = match clusters.peek() {
        Some(c) => c.link_mode,
        None => return points.to_vec(),
    };

    let count = points.len();
    let mut deformations = match mode {
        LinkMode::Additive => vec![AffineMatrix::IDENTITY; count],
        _ => vec![AffineMatrix::IDENTITY.scaled(0.0); count],
    };
    let mut weights = vec![0.0_f64; count];

    for cluster in clusters {
        let link = match cluster.link {
            Some(link) => link,
            None => continue,
        };

        let vertex_transform = cluster_vertex_transform(cluster, link, mode, mesh, pose);

        for (index, weight) in cluster.indices.iter().zip(cluster.weights.iter()) {
            if *index < 0 || *index as usize >= count {
                continue;
            }
            if *weight == 0.0 {
                continue;
            }

            let i = *index as usize;
            let influence = vertex_transform.scaled(*weight);

            if mode == LinkMode::Additive {
                let influence = influence.add_to_diagonal(1.0 - *weight);
                deformations[i] = influence * deformations[i];
                weights[i] = 1.0;
            } else {
                deformations[i] = deformations[i].added(&influence);
                weights[i] += *weight;
            }
        }
    }

    points
        .par_iter()
        .zip(deformations.par_iter())
        .zip(weights.par_iter())
        .map(|((source, deformation), weight)| {
            let weight = *weight;
            if weight == 0.0 {
                return *source;
            }

            let deformed = deformation.transform_point(*source);
            match mode {
                LinkMode::Normalize => deformed / weight,
                LinkMode::TotalOne => deformed + *source * (1.0 - weight),
                LinkMode::Additive => deformed,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FixedPose {
        globals: HashMap<NodeId, AffineMatrix>,
        geometry: HashMap<NodeId, AffineMatrix>,
    }

    impl SkinPose for FixedPose {
        fn global_transform(&mut self, node: NodeId) -> AffineMatrix {
            self.globals.get(&node).copied().unwrap_or(AffineMatrix::IDENTITY)
        }

        fn geometry(&self, node: NodeId) -> AffineMatrix {
            self.geometry.get(&node).copied().unwrap_or(AffineMatrix::IDENTITY)
        }
    }

    const MESH: NodeId = NodeId(1);
    const BONE_A: NodeId = NodeId(2);
    const BONE_B: NodeId = NodeId(3);

    fn mesh_node() -> SkinnedMeshNode {
        SkinnedMeshNode {
            node: MESH,
            global: AffineMatrix::IDENTITY,
        }
    }

    fn cluster(link: NodeId, mode: LinkMode, indices: Vec<i32>, weights: Vec<f64>) -> Cluster {
        Cluster {
            name: format!("cluster{}", link.0),
            link: Some(link),
            link_mode: mode,
            indices,
            weights,
            ..Default::default()
        }
    }

    fn posed() -> FixedPose {
        let mut pose = FixedPose::default();
        pose.globals
            .insert(BONE_A, AffineMatrix::from_translation(DVec3::new(1.0, 0.0, 0.0)));
        pose.globals
            .insert(BONE_B, AffineMatrix::from_translation(DVec3::new(0.0, 2.0, 0.0)));
        pose
    }

    fn skin(clusters: Vec<Cluster>) -> Vec<Skin> {
        vec![Skin {
            name: "skin".into(),
            clusters,
        }]
    }

    #[test]
    fn no_clusters_returns_points() {
        let points = vec![DVec3::X, DVec3::Y];
        let out = deform_control_points(&points, &[], &mesh_node(), &mut posed());
        assert_eq!(out, points);
    }

    #[test]
    fn normalize_divides_by_total_weight() {
        let points = vec![DVec3::ZERO];
        let skins = skin(vec![
            cluster(BONE_A, LinkMode::Normalize, vec![0], vec![0.5]),
            cluster(BONE_B, LinkMode::Normalize, vec![0], vec![0.5]),
        ]);
        let out = deform_control_points(&points, &skins, &mesh_node(), &mut posed());
        assert!(out[0].abs_diff_eq(DVec3::new(0.5, 1.0, 0.0), 1e-12));

        // Weights that do not sum to one are still normalized.
        let skins = skin(vec![cluster(BONE_A, LinkMode::Normalize, vec![0], vec![0.25])]);
        let out = deform_control_points(&points, &skins, &mesh_node(), &mut posed());
        assert!(out[0].abs_diff_eq(DVec3::new(1.0, 0.0, 0.0), 1e-12));
    }

    #[test]
    fn total_one_keeps_remaining_rest_weight() {
        let points = vec![DVec3::new(0.0, 0.0, 4.0)];
        let skins = skin(vec![cluster(BONE_A, LinkMode::TotalOne, vec![0], vec![0.25])]);
        let out = deform_control_points(&points, &skins, &mesh_node(), &mut posed());
        // 0.25 * (p + (1, 0, 0)) + 0.75 * p
        assert!(out[0].abs_diff_eq(DVec3::new(0.25, 0.0, 4.0), 1e-12));
    }

    #[test]
    fn additive_multiplies_influences() {
        let points = vec![DVec3::ZERO];
        let skins = skin(vec![
            cluster(BONE_A, LinkMode::Additive, vec![0], vec![1.0]),
            cluster(BONE_B, LinkMode::Additive, vec![0], vec![0.5]),
        ]);
        let out = deform_control_points(&points, &skins, &mesh_node(), &mut posed());
        // (0.5 * T(0, 2, 0) + 0.5 * I) * T(1, 0, 0)
        assert!(out[0].abs_diff_eq(DVec3::new(1.0, 1.0, 0.0), 1e-12));
    }

    #[test]
    fn additive_uses_associate_model() {
        let associate = NodeId(4);
        let mut pose = posed();
        pose.globals
            .insert(associate, AffineMatrix::from_translation(DVec3::new(0.0, 0.0, 1.0)));

        let mut c = cluster(BONE_A, LinkMode::Additive, vec![0], vec![1.0]);
        c.associate_model = Some(associate);
        let skins = skin(vec![c]);

        let out = deform_control_points(&[DVec3::ZERO], &skins, &mesh_node(), &mut pose);
        // reference_current^-1 * link_current = T(1, 0, -1)
        assert!(out[0].abs_diff_eq(DVec3::new(1.0, 0.0, -1.0), 1e-12));
    }

    #[test]
    fn bind_pose_and_geometry_are_respected() {
        let mut pose = posed();
        pose.geometry
            .insert(MESH, AffineMatrix::from_translation(DVec3::new(0.0, 0.0, 5.0)));

        let mut c = cluster(BONE_A, LinkMode::Normalize, vec![0], vec![1.0]);
        c.transform_link = AffineMatrix::from_translation(DVec3::new(1.0, 0.0, 0.0));
        let skins = skin(vec![c]);

        let out = deform_control_points(&[DVec3::ZERO], &skins, &mesh_node(), &mut pose);
        // Link did not move relative to its bind pose, only the geometry offset remains.
        assert!(out[0].abs_diff_eq(DVec3::new(0.0, 0.0, 5.0), 1e-12));
    }

    #[test]
    fn stale_indices_and_missing_links_are_skipped() {
        let points = vec![DVec3::ZERO, DVec3::ONE];
        let mut unlinked = cluster(BONE_B, LinkMode::Normalize, vec![0], vec![1.0]);
        unlinked.link = None;
        let skins = skin(vec![
            cluster(BONE_A, LinkMode::Normalize, vec![1, 7, -1], vec![1.0, 1.0, 1.0]),
            unlinked,
            cluster(BONE_B, LinkMode::Normalize, vec![0], vec![0.0]),
        ]);

        let out = deform_control_points(&points, &skins, &mesh_node(), &mut posed());
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], DVec3::ZERO);
        assert!(out[1].abs_diff_eq(DVec3::new(2.0, 1.0, 1.0), 1e-12));
    }
}
