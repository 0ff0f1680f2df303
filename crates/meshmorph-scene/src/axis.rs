use crate::{
    graph::{rewrite_local, NodeGraph, PIVOT_BAKE_FRAME_RATE},
    SceneError,
};
use meshmorph_math::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(Axis::X),
            1 => Some(Axis::Y),
            2 => Some(Axis::Z),
            _ => None,
        }
    }

    pub fn unit(self) -> DVec3 {
        match self {
            Axis::X => DVec3::X,
            Axis::Y => DVec3::Y,
            Axis::Z => DVec3::Z,
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "x" => Ok(Axis::X),
            "y" => Ok(Axis::Y),
            "z" => Ok(Axis::Z),
            other => Err(format!("unknown axis \"{}\"", other)),
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SignedAxis {
    pub axis: Axis,
    pub positive: bool,
}

impl SignedAxis {
    pub fn positive(axis: Axis) -> Self {
        Self {
            axis,
            positive: true,
        }
    }

    pub fn negative(axis: Axis) -> Self {
        Self {
            axis,
            positive: false,
        }
    }

    pub fn vector(self) -> DVec3 {
        if self.positive {
            self.axis.unit()
        } else {
            -self.axis.unit()
        }
    }

    fn from_vector(v: DVec3) -> Option<Self> {
        [Axis::X, Axis::Y, Axis::Z].iter().find_map(|axis| {
            let d = v.dot(axis.unit());
            if (d - 1.0).abs() < 1e-9 {
                Some(Self::positive(*axis))
            } else if (d + 1.0).abs() < 1e-9 {
                Some(Self::negative(*axis))
            } else {
                None
            }
        })
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Handedness {
    RightHanded,
    LeftHanded,
}

impl Default for Handedness {
    fn default() -> Self {
        Handedness::RightHanded
    }
}

impl std::str::FromStr for Handedness {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "right" | "righthanded" | "right-handed" => Ok(Handedness::RightHanded),
            "left" | "lefthanded" | "left-handed" => Ok(Handedness::LeftHanded),
            other => Err(format!("unknown handedness \"{}\"", other)),
        }
    }
}

/// Orientation convention of a scene: up and front vectors plus handedness,
/// which determines the remaining coordinate axis.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct AxisSystem {
    pub up: SignedAxis,
    pub front: SignedAxis,
    pub handedness: Handedness,
}

impl Default for AxisSystem {
    /// Y up, Z front, right handed.
    fn default() -> Self {
        Self {
            up: SignedAxis::positive(Axis::Y),
            front: SignedAxis::positive(Axis::Z),
            handedness: Handedness::RightHanded,
        }
    }
}

impl std::fmt::Display for AxisSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = |a: SignedAxis| if a.positive { "+" } else { "-" };
        write!(
            f,
            "up {}{}, front {}{}, {:?}",
            sign(self.up),
            self.up.axis,
            sign(self.front),
            self.front.axis,
            self.handedness
        )
    }
}

impl AxisSystem {
    /// Axis system requested by an import: `up` points up and the front vector
    /// looks down the negative `front` axis.
    pub fn target(handedness: Handedness, front: Axis, up: Axis) -> Self {
        Self {
            up: SignedAxis::positive(up),
            front: SignedAxis::negative(front),
            handedness,
        }
    }

    /// Axis system as described by the FBX global settings, where the
    /// coordinate axis decides the handedness.
    pub fn from_global_settings(up: SignedAxis, front: SignedAxis, coord: SignedAxis) -> Self {
        let handedness = if coord.vector().cross(up.vector()).dot(front.vector()) >= 0.0 {
            Handedness::RightHanded
        } else {
            Handedness::LeftHanded
        };

        Self {
            up,
            front,
            handedness,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.up.axis != self.front.axis
    }

    /// Remaining axis, completing up and front to a right or left handed basis.
    pub fn coord(&self) -> DVec3 {
        match self.handedness {
            Handedness::RightHanded => self.up.vector().cross(self.front.vector()),
            Handedness::LeftHanded => self.front.vector().cross(self.up.vector()),
        }
    }

    pub fn coord_axis(&self) -> Option<SignedAxis> {
        SignedAxis::from_vector(self.coord())
    }

    /// Basis with coordinate, up and front vectors as columns.
    pub fn matrix(&self) -> AffineMatrix {
        AffineMatrix::from(DMat4::from_cols(
            self.coord().extend(0.0),
            self.up.vector().extend(0.0),
            self.front.vector().extend(0.0),
            DVec4::W,
        ))
    }

    /// Matrix mapping directions expressed in `self` to `target`.
    pub fn conversion_to(&self, target: &AxisSystem) -> Result<AffineMatrix, SceneError> {
        if !self.is_valid() {
            return Err(SceneError::InvalidAxisSystem(self.to_string()));
        }
        if !target.is_valid() {
            return Err(SceneError::InvalidAxisSystem(target.to_string()));
        }

        Ok(target.matrix() * self.matrix().inverse())
    }
}

/// Rewrites the local transform of every top level node of `graph` so the scene
/// is expressed in `target`. Returns the applied conversion matrix, which is
/// the identity when `source` already equals `target`.
pub fn convert_scene(
    graph: &mut NodeGraph,
    source: &AxisSystem,
    target: &AxisSystem,
) -> Result<AffineMatrix, SceneError> {
    if source == target {
        return Ok(AffineMatrix::IDENTITY);
    }

    let conversion = source.conversion_to(target)?;
    if conversion.is_identity() {
        return Ok(AffineMatrix::IDENTITY);
    }

    let root = graph.root();
    let top_level = graph.children(root).to_vec();
    for id in top_level {
        let node = &mut graph[id];
        let order = node.source_pivots.rotation_order;
        rewrite_local(node, &conversion, order, PIVOT_BAKE_FRAME_RATE);
    }

    Ok(conversion)
}
