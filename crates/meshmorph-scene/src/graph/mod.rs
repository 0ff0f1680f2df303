use crate::{animation::NodeAnimation, MeshId, SceneError};
use meshmorph_math::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

mod evaluator;
mod pivot;
mod transform;

pub use evaluator::*;
pub use pivot::*;
pub(crate) use pivot::rewrite_local;
pub use transform::*;

/// Index of a node inside a [NodeGraph].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NodeId(pub usize);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// How a node combines its parent's rotation and scale.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum InheritType {
    /// Parent rotation, child rotation, parent scale, child scale.
    RrSs = 0,
    /// Parent rotation and scale before child rotation and scale.
    RSrs = 1,
    /// Like `RrSs`, without the parent's own local scale.
    Rrs = 2,
}

impl Default for InheritType {
    fn default() -> Self {
        InheritType::RSrs
    }
}

impl InheritType {
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(Self::RrSs),
            1 => Some(Self::RSrs),
            2 => Some(Self::Rrs),
            _ => None,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PivotState {
    Active,
    Reference,
}

impl Default for PivotState {
    fn default() -> Self {
        PivotState::Reference
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum QuaternionInterpolation {
    Off = 0,
    Classic = 1,
    Slerp = 2,
    Cubic = 3,
    TangentDependent = 4,
}

impl Default for QuaternionInterpolation {
    fn default() -> Self {
        QuaternionInterpolation::Off
    }
}

impl QuaternionInterpolation {
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(Self::Off),
            1 => Some(Self::Classic),
            2 => Some(Self::Slerp),
            3 => Some(Self::Cubic),
            4 => Some(Self::TangentDependent),
            _ => None,
        }
    }
}

/// Pivot related transform components of a node.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PivotSet {
    pub pre_rotation: DVec3,
    pub post_rotation: DVec3,
    pub rotation_offset: DVec3,
    pub rotation_pivot: DVec3,
    pub scaling_offset: DVec3,
    pub scaling_pivot: DVec3,
    pub geometric_translation: DVec3,
    pub geometric_rotation: DVec3,
    pub geometric_scaling: DVec3,
    pub rotation_order: EulerOrder,
    pub pivot_state: PivotState,
    pub quaternion_interpolation: QuaternionInterpolation,
}

impl Default for PivotSet {
    fn default() -> Self {
        Self {
            pre_rotation: DVec3::ZERO,
            post_rotation: DVec3::ZERO,
            rotation_offset: DVec3::ZERO,
            rotation_pivot: DVec3::ZERO,
            scaling_offset: DVec3::ZERO,
            scaling_pivot: DVec3::ZERO,
            geometric_translation: DVec3::ZERO,
            geometric_rotation: DVec3::ZERO,
            geometric_scaling: DVec3::ONE,
            rotation_order: EulerOrder::XYZ,
            pivot_state: PivotState::Reference,
            quaternion_interpolation: QuaternionInterpolation::Off,
        }
    }
}

impl PivotSet {
    /// Zeroes offsets, pivots and pre/post rotation. Rotation order, geometric
    /// transform and interpolation mode are kept.
    pub fn reset(&mut self) {
        self.pre_rotation = DVec3::ZERO;
        self.post_rotation = DVec3::ZERO;
        self.rotation_offset = DVec3::ZERO;
        self.rotation_pivot = DVec3::ZERO;
        self.scaling_offset = DVec3::ZERO;
        self.scaling_pivot = DVec3::ZERO;
    }

    pub fn has_pivots(&self) -> bool {
        [
            self.pre_rotation,
            self.post_rotation,
            self.rotation_offset,
            self.rotation_pivot,
            self.scaling_offset,
            self.scaling_pivot,
        ]
        .iter()
        .any(|v| *v != DVec3::ZERO)
    }

    /// Geometric transform, applied to the node's own geometry only.
    pub fn geometry(&self) -> AffineMatrix {
        AffineMatrix::from_trs(
            self.geometric_translation,
            self.geometric_rotation,
            self.geometric_scaling,
        )
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum NodeAttribute {
    None,
    Null,
    Mesh(MeshId),
    LodGroup,
    Skeleton,
}

impl Default for NodeAttribute {
    fn default() -> Self {
        NodeAttribute::None
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub unique_id: u64,
    pub parent: Option<NodeId>,
    pub child_nodes: Vec<NodeId>,
    pub attribute: NodeAttribute,

    pub translation: DVec3,
    /// Euler angles in degrees.
    pub rotation: DVec3,
    pub scaling: DVec3,
    pub inherit_type: InheritType,

    pub source_pivots: PivotSet,
    pub destination_pivots: PivotSet,
    pub animation: NodeAnimation,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            name: String::new(),
            unique_id: 0,
            parent: None,
            child_nodes: Vec::new(),
            attribute: NodeAttribute::None,
            translation: DVec3::ZERO,
            rotation: DVec3::ZERO,
            scaling: DVec3::ONE,
            inherit_type: InheritType::RSrs,
            source_pivots: PivotSet::default(),
            destination_pivots: PivotSet::default(),
            animation: NodeAnimation::default(),
        }
    }
}

impl Node {
    pub fn new<T: Into<String>>(name: T) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_unique_id(mut self, id: u64) -> Self {
        self.unique_id = id;
        self
    }

    pub fn with_attribute(mut self, attribute: NodeAttribute) -> Self {
        self.attribute = attribute;
        self
    }

    pub fn with_trs(mut self, translation: DVec3, rotation: DVec3, scaling: DVec3) -> Self {
        self.translation = translation;
        self.rotation = rotation;
        self.scaling = scaling;
        self
    }

    pub fn with_inherit_type(mut self, inherit_type: InheritType) -> Self {
        self.inherit_type = inherit_type;
        self
    }

    pub fn mesh(&self) -> Option<MeshId> {
        match self.attribute {
            NodeAttribute::Mesh(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_lod_group(&self) -> bool {
        self.attribute == NodeAttribute::LodGroup
    }

    /// Local translation, rotation and scaling at `time` in seconds, or the
    /// static values when `time` is `None`.
    pub fn local_trs(&self, time: Option<f64>) -> (DVec3, DVec3, DVec3) {
        match time {
            Some(t) if !self.animation.is_empty() => (
                self.animation.translation.evaluate(self.translation, t),
                self.animation.rotation.evaluate(self.rotation, t),
                self.animation.scaling.evaluate(self.scaling, t),
            ),
            _ => (self.translation, self.rotation, self.scaling),
        }
    }
}

/// Arena of scene nodes. Index 0 always holds the scene root.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct NodeGraph {
    nodes: Vec<Node>,
}

impl Default for NodeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeGraph {
    pub const ROOT: NodeId = NodeId(0);

    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new("RootNode")],
        }
    }

    pub fn root(&self) -> NodeId {
        Self::ROOT
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Adds a detached node. A node without unique id receives its index.
    pub fn add_node(&mut self, mut node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        if node.unique_id == 0 {
            node.unique_id = id.0 as u64;
        }
        self.nodes.push(node);
        id
    }

    /// Adds a node as the last child of `parent`.
    pub fn add_child(&mut self, parent: NodeId, node: Node) -> Result<NodeId, SceneError> {
        let id = self.add_node(node);
        self.attach(parent, id)?;
        Ok(id)
    }

    /// Moves `child` below `parent`, detaching it from its previous parent.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        if parent.0 >= self.nodes.len() {
            return Err(SceneError::InvalidNodeId(parent.0));
        }
        if child.0 >= self.nodes.len() || child == Self::ROOT {
            return Err(SceneError::InvalidNodeId(child.0));
        }
        if self.is_ancestor(child, parent) {
            return Err(SceneError::CyclicHierarchy(child.0));
        }

        if let Some(old) = self.nodes[child.0].parent.take() {
            self.nodes[old.0].child_nodes.retain(|c| *c != child);
        }

        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].child_nodes.push(child);
        Ok(())
    }

    /// Whether `ancestor` is `node` or lies on its parent chain.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.get(id).and_then(|n| n.parent);
        }
        false
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.get(id) {
            Some(node) => node.child_nodes.as_slice(),
            None => &[],
        }
    }

    /// Pre-order depth first walk starting at `start`.
    pub fn depth_first(&self, start: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        if self.get(start).is_none() {
            return order;
        }

        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        order
    }

    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.iter().find(|(_, n)| n.name == name).map(|(id, _)| id)
    }
}

impl Index<NodeId> for NodeGraph {
    type Output = Node;

    fn index(&self, index: NodeId) -> &Self::Output {
        &self.nodes[index.0]
    }
}

impl IndexMut<NodeId> for NodeGraph {
    fn index_mut(&mut self, index: NodeId) -> &mut Self::Output {
        &mut self.nodes[index.0]
    }
}
