use meshmorph_math::*;
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Indexed triangle mesh produced by flattening a scene.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlattenedMesh {
    pub positions: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
    /// Ordinal of the source mesh node, one entry per triangle.
    pub triangle_groups: Vec<u32>,
    /// Area weighted vertex normals, filled by [FlattenedMesh::compute_normals].
    pub normals: Vec<Vec3>,
}

impl std::fmt::Display for FlattenedMesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "FlattenedMesh {{ vertices: {}, triangles: {}, groups: {} }}",
            self.positions.len(),
            self.triangles.len(),
            self.group_count()
        )
    }
}

impl FlattenedMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Number of distinct group ids.
    pub fn group_count(&self) -> usize {
        let mut groups = self.triangle_groups.clone();
        groups.sort_unstable();
        groups.dedup();
        groups.len()
    }

    pub fn append_vertex(&mut self, position: Vec3) -> u32 {
        self.positions.push(position);
        (self.positions.len() - 1) as u32
    }

    pub fn append_triangle(&mut self, triangle: [u32; 3], group: u32) {
        self.triangles.push(triangle);
        self.triangle_groups.push(group);
    }

    /// Recomputes per vertex normals as the area weighted average of the
    /// normals of all incident triangles.
    pub fn compute_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];

        for triangle in self.triangles.iter() {
            let [i0, i1, i2] = *triangle;
            let v0 = self.positions[i0 as usize];
            let v1 = self.positions[i1 as usize];
            let v2 = self.positions[i2 as usize];

            let e1 = v1 - v0;
            let e2 = v2 - v0;
            let normal = e1.cross(e2);
            let area = normal.length() * 0.5;
            let normal = normal.normalize_or_zero() * area;

            normals[i0 as usize] += normal;
            normals[i1 as usize] += normal;
            normals[i2 as usize] += normal;
        }

        normals.par_iter_mut().for_each(|n| *n = n.normalize_or_zero());
        self.normals = normals;
    }

    /// Axis aligned bounds of all positions.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.positions.first()?;
        Some(
            self.positions
                .iter()
                .fold((first, first), |(min, max), p| (min.min(*p), max.max(*p))),
        )
    }
}
