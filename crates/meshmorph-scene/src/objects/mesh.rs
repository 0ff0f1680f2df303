use crate::skin::Skin;
use meshmorph_math::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Index of a mesh inside a [crate::Scene].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MeshId(pub usize);

impl std::fmt::Display for MeshId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MeshId({})", self.0)
    }
}

/// Polygon mesh as stored in the source file: control points and polygons that
/// index them, plus the skin deformers attached to it.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default)]
pub struct SceneMesh {
    pub name: String,
    pub unique_id: u64,
    pub control_points: Vec<DVec3>,
    pub polygons: Vec<Vec<u32>>,
    pub skins: Vec<Skin>,
}

impl std::fmt::Display for SceneMesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SceneMesh {{ name: {}, control_points: {}, polygons: {}, skins: {} }}",
            self.name,
            self.control_points.len(),
            self.polygons.len(),
            self.skins.len()
        )
    }
}

impl SceneMesh {
    pub fn new<T: Into<String>>(
        name: T,
        control_points: Vec<DVec3>,
        polygons: Vec<Vec<u32>>,
    ) -> Self {
        Self {
            name: name.into(),
            control_points,
            polygons,
            ..Default::default()
        }
    }

    pub fn control_point_count(&self) -> usize {
        self.control_points.len()
    }

    /// Total number of polygon corners.
    pub fn polygon_vertex_count(&self) -> usize {
        self.polygons.iter().map(|p| p.len()).sum()
    }

    pub fn cluster_count(&self) -> usize {
        self.skins.iter().map(|s| s.clusters.len()).sum()
    }

    /// Removes polygons with fewer than three corners or with corners that do
    /// not reference an existing control point. Returns the number removed.
    pub fn remove_bad_polygons(&mut self) -> usize {
        let count = self.control_points.len();
        let before = self.polygons.len();
        self.polygons
            .retain(|p| p.len() >= 3 && p.iter().all(|i| (*i as usize) < count));
        before - self.polygons.len()
    }

    /// Splits a flat FBX polygon index list, where a negative value `v` marks the
    /// last corner `!v` of a polygon, into polygons.
    pub fn polygons_from_fbx_indices(indices: &[i32]) -> Vec<Vec<u32>> {
        let mut polygons = Vec::new();
        let mut current = Vec::new();

        for index in indices.iter() {
            if *index < 0 {
                current.push(!*index as u32);
                polygons.push(std::mem::take(&mut current));
            } else {
                current.push(*index as u32);
            }
        }

        if !current.is_empty() {
            polygons.push(current);
        }

        polygons
    }
}
