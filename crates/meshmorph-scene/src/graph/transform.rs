use super::{InheritType, Node, NodeGraph, NodeId};
use crate::{animation::PoseTime, SceneMesh};
use meshmorph_math::*;
use std::collections::HashMap;

/// Local matrices of a node, evaluated once per transform computation.
#[derive(Debug, Copy, Clone)]
pub struct LocalMatrices {
    pub translation: AffineMatrix,
    pub rotation: AffineMatrix,
    pub pre_rotation: AffineMatrix,
    pub post_rotation: AffineMatrix,
    pub scaling: AffineMatrix,
    pub rotation_offset: AffineMatrix,
    pub rotation_pivot: AffineMatrix,
    pub scaling_offset: AffineMatrix,
    pub scaling_pivot: AffineMatrix,
}

impl LocalMatrices {
    pub fn new(node: &Node, time: PoseTime) -> Self {
        Self::at(node, time.seconds())
    }

    pub fn at(node: &Node, seconds: Option<f64>) -> Self {
        let (t, r, s) = node.local_trs(seconds);
        let pivots = &node.source_pivots;

        Self {
            translation: AffineMatrix::from_translation(t),
            rotation: AffineMatrix::from_rotation_ordered(pivots.rotation_order, r),
            pre_rotation: AffineMatrix::from_rotation(pivots.pre_rotation),
            post_rotation: AffineMatrix::from_rotation(pivots.post_rotation),
            scaling: AffineMatrix::from_scale(s),
            rotation_offset: AffineMatrix::from_translation(pivots.rotation_offset),
            rotation_pivot: AffineMatrix::from_translation(pivots.rotation_pivot),
            scaling_offset: AffineMatrix::from_translation(pivots.scaling_offset),
            scaling_pivot: AffineMatrix::from_translation(pivots.scaling_pivot),
        }
    }

    /// `Pre * R * Post`
    pub fn local_rotation(&self) -> AffineMatrix {
        self.pre_rotation * self.rotation * self.post_rotation
    }

    /// `T * Roff * Rp * Pre * R * Post * Rp^-1 * Soff * Sp * S * Sp^-1`
    pub fn pivot_chain(&self) -> AffineMatrix {
        self.translation
            * self.rotation_offset
            * self.rotation_pivot
            * self.local_rotation()
            * self.rotation_pivot.inverse()
            * self.scaling_offset
            * self.scaling_pivot
            * self.scaling
            * self.scaling_pivot.inverse()
    }
}

/// Global rotation and scale of `node` following its inherit type.
pub fn global_rotation_scale(
    graph: &NodeGraph,
    node: &Node,
    local: &LocalMatrices,
    parent_global: &AffineMatrix,
    time: PoseTime,
) -> AffineMatrix {
    let parent_grm = parent_global.rotation();
    let parent_tm = AffineMatrix::from_translation(parent_global.translation());
    let parent_grsm = parent_tm.inverse() * *parent_global;
    let parent_gsm = parent_grm.inverse() * parent_grsm;

    let lrm = local.local_rotation();
    let lsm = local.scaling;

    match node.inherit_type {
        InheritType::RrSs => parent_grm * lrm * parent_gsm * lsm,
        InheritType::RSrs => parent_grm * parent_gsm * lrm * lsm,
        InheritType::Rrs => {
            let parent_lsm = node
                .parent
                .and_then(|p| graph.get(p))
                .map(|p| AffineMatrix::from_scale(p.local_trs(time.seconds()).2))
                .unwrap_or(AffineMatrix::IDENTITY);

            let parent_gsm_no_local = parent_gsm * parent_lsm.inverse();
            parent_grm * lrm * parent_gsm_no_local * lsm
        }
    }
}

/// Global transform of `node` given the already resolved global transform of
/// its parent. Only the translation of the local pivot chain is used for the
/// result's translation. A missing node yields the identity.
pub fn calculate_global_transform(
    graph: &NodeGraph,
    node: Option<NodeId>,
    parent_global: &AffineMatrix,
    time: PoseTime,
) -> AffineMatrix {
    let node = match node.and_then(|id| graph.get(id)) {
        Some(node) => node,
        None => return AffineMatrix::IDENTITY,
    };

    let local = LocalMatrices::new(node, time);
    let global_rs = global_rotation_scale(graph, node, &local, parent_global, time);
    let global_t = AffineMatrix::from_translation(local.pivot_chain().translation());

    global_t * global_rs
}

/// Walks the subtree at `start` parent first and records the global transform of
/// every node that carries a mesh with at least one polygon.
pub fn resolve_global_transforms(
    graph: &NodeGraph,
    meshes: &[SceneMesh],
    start: NodeId,
    parent_global: &AffineMatrix,
    time: PoseTime,
) -> HashMap<NodeId, AffineMatrix> {
    let mut map = HashMap::new();
    resolve_recursive(graph, meshes, start, parent_global, time, &mut map);
    map
}

fn resolve_recursive(
    graph: &NodeGraph,
    meshes: &[SceneMesh],
    current: NodeId,
    parent_global: &AffineMatrix,
    time: PoseTime,
    map: &mut HashMap<NodeId, AffineMatrix>,
) {
    let node = match graph.get(current) {
        Some(node) => node,
        None => return,
    };

    let global = calculate_global_transform(graph, Some(current), parent_global, time);
    let has_polygons = node
        .mesh()
        .and_then(|m| meshes.get(m.0))
        .map_or(false, |m| m.polygon_vertex_count() > 0);
    if has_polygons {
        map.insert(current, global);
    }

    for child in node.child_nodes.iter() {
        resolve_recursive(graph, meshes, *child, &global, time, map);
    }
}
