use super::{global_rotation_scale, LocalMatrices, NodeGraph, NodeId};
use crate::animation::PoseTime;
use meshmorph_math::*;
use std::collections::HashMap;

/// Evaluates scene space transforms starting from the real scene root and
/// caches the results per node and pose time.
///
/// Unlike [super::calculate_global_transform], the local translation is placed
/// through the parent's global matrix. The cache must be [reset](Self::reset)
/// whenever local transforms change.
#[derive(Debug, Clone, Default)]
pub struct SceneEvaluator {
    cache: HashMap<(NodeId, PoseTime), AffineMatrix>,
}

impl SceneEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.cache.clear();
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn global_transform(
        &mut self,
        graph: &NodeGraph,
        node: NodeId,
        time: PoseTime,
    ) -> AffineMatrix {
        if let Some(m) = self.cache.get(&(node, time)) {
            return *m;
        }

        let n = match graph.get(node) {
            Some(n) => n,
            None => return AffineMatrix::IDENTITY,
        };

        let parent_global = match n.parent {
            Some(parent) => self.global_transform(graph, parent, time),
            None => AffineMatrix::IDENTITY,
        };

        let local = LocalMatrices::new(n, time);
        let global_rs = global_rotation_scale(graph, n, &local, &parent_global, time);
        let translation = parent_global.transform_point(local.pivot_chain().translation());
        let global = AffineMatrix::from_translation(translation) * global_rs;

        self.cache.insert((node, time), global);
        global
    }
}
