use super::{LocalMatrices, Node, NodeGraph, NodeId, PivotState};
use crate::animation::{AnimationCurve, ChannelCurves, NodeAnimation};
use meshmorph_math::*;

/// Sampling rate used when animation curves are rebuilt by [bake_pivots].
pub const PIVOT_BAKE_FRAME_RATE: f64 = 30.0;

/// Prepares a node's destination pivot set so that baking removes every pivot
/// related component while keeping rotation order and geometric transform.
pub fn normalize_pivots(node: &mut Node) {
    node.source_pivots.pivot_state = PivotState::Active;
    node.destination_pivots.pivot_state = PivotState::Active;

    let source = node.source_pivots;
    let destination = &mut node.destination_pivots;
    destination.post_rotation = DVec3::ZERO;
    destination.pre_rotation = DVec3::ZERO;
    destination.rotation_offset = DVec3::ZERO;
    destination.scaling_offset = DVec3::ZERO;
    destination.rotation_pivot = DVec3::ZERO;
    destination.scaling_pivot = DVec3::ZERO;

    destination.rotation_order = source.rotation_order;
    destination.geometric_translation = source.geometric_translation;
    destination.geometric_rotation = source.geometric_rotation;
    destination.geometric_scaling = source.geometric_scaling;
    destination.quaternion_interpolation = source.quaternion_interpolation;

    destination.reset();
}

/// Collapses pivots, offsets and pre/post rotation of every node below `start`
/// into plain local translation, rotation and scaling, expressed in the
/// destination rotation order. Animated nodes are resampled at `frame_rate`.
///
/// Returns the number of nodes that changed.
pub fn bake_pivots(graph: &mut NodeGraph, start: NodeId, frame_rate: f64) -> usize {
    let mut baked = 0;
    for id in graph.depth_first(start) {
        if bake_node(&mut graph[id], frame_rate) {
            baked += 1;
        }
    }
    baked
}

fn bake_node(node: &mut Node, frame_rate: f64) -> bool {
    let order = node.destination_pivots.rotation_order;
    if !node.source_pivots.has_pivots() && node.source_pivots.rotation_order == order {
        return false;
    }

    rewrite_local(node, &AffineMatrix::IDENTITY, order, frame_rate);
    true
}

/// Replaces the local transform of `node` by `pre * pivot_chain`, decomposed in
/// `order`, and clears pivots, offsets and pre/post rotation. Animation curves
/// are resampled at `frame_rate`.
pub(crate) fn rewrite_local(
    node: &mut Node,
    pre: &AffineMatrix,
    order: EulerOrder,
    frame_rate: f64,
) {
    let (t, r, s) = (*pre * LocalMatrices::at(node, None).pivot_chain()).decompose_ordered(order);

    let animation = if node.animation.is_empty() {
        None
    } else {
        resample(node, pre, order, frame_rate)
    };

    node.translation = t;
    node.rotation = r;
    node.scaling = s;
    node.source_pivots.reset();
    node.source_pivots.rotation_order = order;
    if let Some(animation) = animation {
        node.animation = animation;
    }
}

fn resample(
    node: &Node,
    pre: &AffineMatrix,
    order: EulerOrder,
    frame_rate: f64,
) -> Option<NodeAnimation> {
    let (start, end) = node.animation.time_range()?;
    let frame_rate = frame_rate.max(1.0);
    let step = 1.0 / frame_rate;
    let frames = ((end - start) * frame_rate - 1e-9).ceil().max(0.0) as usize + 1;

    let mut times = Vec::with_capacity(frames);
    let mut samples: [Vec<f64>; 9] = Default::default();
    let mut previous_rotation: Option<DVec3> = None;

    for frame in 0..frames {
        let time = (start + frame as f64 * step).min(end);
        let local = *pre * LocalMatrices::at(node, Some(time)).pivot_chain();
        let (t, mut r, s) = local.decompose_ordered(order);

        if let Some(prev) = previous_rotation {
            r = unwrap_angles(prev, r);
        }
        previous_rotation = Some(r);

        times.push(time);
        for (i, v) in [t, r, s].iter().flat_map(|v| v.to_array()).enumerate() {
            samples[i].push(v);
        }
    }

    let mut channel = |offset: usize| {
        let mut curves = ChannelCurves::default();
        for (i, curve) in curves.curves.iter_mut().enumerate() {
            *curve = Some(AnimationCurve::new(
                times.clone(),
                std::mem::take(&mut samples[offset + i]),
            ));
        }
        curves
    };

    Some(NodeAnimation {
        translation: channel(0),
        rotation: channel(3),
        scaling: channel(6),
    })
}

/// Shifts each angle by multiples of 360 degrees to stay close to `previous`.
fn unwrap_angles(previous: DVec3, current: DVec3) -> DVec3 {
    let mut out = current.to_array();
    for (v, p) in out.iter_mut().zip(previous.to_array().iter()) {
        *v -= ((*v - *p) / 360.0).round() * 360.0;
    }
    DVec3::from(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{calculate_global_transform, PoseTime};

    fn pivoted_node() -> Node {
        let mut node = Node::new("pivoted").with_trs(
            DVec3::new(1.0, 2.0, 3.0),
            DVec3::new(0.0, 30.0, 0.0),
            DVec3::new(2.0, 2.0, 2.0),
        );
        node.source_pivots.pre_rotation = DVec3::new(-90.0, 0.0, 0.0);
        node.source_pivots.post_rotation = DVec3::new(0.0, 0.0, 15.0);
        node.source_pivots.rotation_pivot = DVec3::new(0.5, 0.0, 0.0);
        node.source_pivots.scaling_pivot = DVec3::new(0.0, 1.0, 0.0);
        node.source_pivots.geometric_translation = DVec3::new(0.0, 0.0, 9.0);
        node
    }

    #[test]
    fn normalize_copies_order_and_geometry() {
        let mut node = pivoted_node();
        node.source_pivots.rotation_order = EulerOrder::YZX;
        normalize_pivots(&mut node);

        let destination = node.destination_pivots;
        assert_eq!(destination.pivot_state, PivotState::Active);
        assert_eq!(node.source_pivots.pivot_state, PivotState::Active);
        assert!(!destination.has_pivots());
        assert_eq!(destination.rotation_order, EulerOrder::YZX);
        assert_eq!(destination.geometric_translation, DVec3::new(0.0, 0.0, 9.0));
    }

    #[test]
    fn baking_preserves_global_transform() {
        let mut graph = NodeGraph::new();
        let mut node = pivoted_node();
        normalize_pivots(&mut node);
        let id = graph.add_child(graph.root(), node).unwrap();

        let identity = AffineMatrix::IDENTITY;
        let before = calculate_global_transform(&graph, Some(id), &identity, PoseTime::Infinite);
        assert_eq!(bake_pivots(&mut graph, NodeGraph::ROOT, PIVOT_BAKE_FRAME_RATE), 1);
        let after = calculate_global_transform(&graph, Some(id), &identity, PoseTime::Infinite);

        assert!(!graph[id].source_pivots.has_pivots());
        assert_eq!(graph[id].source_pivots.geometric_translation, DVec3::new(0.0, 0.0, 9.0));
        assert!(before.abs_diff_eq(&after, 1e-9));
    }

    #[test]
    fn baking_resamples_animation() {
        let mut graph = NodeGraph::new();
        let mut node = pivoted_node();
        node.animation.rotation.curves[1] =
            Some(AnimationCurve::new(vec![0.0, 1.0], vec![0.0, 90.0]));
        normalize_pivots(&mut node);
        let id = graph.add_child(graph.root(), node).unwrap();

        let before = LocalMatrices::at(&graph[id], Some(0.5)).pivot_chain();
        bake_pivots(&mut graph, NodeGraph::ROOT, PIVOT_BAKE_FRAME_RATE);
        let after = LocalMatrices::at(&graph[id], Some(0.5)).pivot_chain();

        let curve = graph[id].animation.translation.curves[0].as_ref().unwrap();
        assert_eq!(curve.times.len(), 31);
        assert!(before.abs_diff_eq(&after, 1e-6));
    }

    #[test]
    fn nodes_without_pivots_are_untouched() {
        let mut graph = NodeGraph::new();
        let id = graph
            .add_child(graph.root(), Node::new("plain").with_trs(DVec3::X, DVec3::Y, DVec3::ONE))
            .unwrap();
        assert_eq!(bake_pivots(&mut graph, NodeGraph::ROOT, PIVOT_BAKE_FRAME_RATE), 0);
        assert_eq!(graph[id].rotation, DVec3::Y);
    }

    #[test]
    fn unwrap_keeps_angles_continuous() {
        let r = unwrap_angles(DVec3::new(170.0, 0.0, -175.0), DVec3::new(-175.0, 10.0, 179.0));
        assert!(r.abs_diff_eq(DVec3::new(185.0, 10.0, -181.0), 1e-12));
    }
}
