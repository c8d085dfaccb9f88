//! Voxel records to a combined cube mesh
//!
//! Every voxel becomes an independent axis-aligned cube: 8 corners and 12
//! triangles, no vertices shared with neighbours and no face culling.

use crate::types::{Rgba, VoxelRecord};
use glam::Vec3;

/// Unit cube corners, scaled by the half extent
const CUBE_CORNERS: [[f32; 3]; 8] = [
    [-1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0],
    [1.0, 1.0, -1.0],
    [-1.0, 1.0, -1.0],
    [-1.0, -1.0, 1.0],
    [1.0, -1.0, 1.0],
    [1.0, 1.0, 1.0],
    [-1.0, 1.0, 1.0],
];

/// Cube triangles wound counter-clockwise seen from outside
const CUBE_TRIANGLES: [[u32; 3]; 12] = [
    // Back (-Z)
    [0, 2, 1],
    [0, 3, 2],
    // Front (+Z)
    [4, 5, 6],
    [4, 6, 7],
    // Bottom (-Y)
    [0, 1, 5],
    [0, 5, 4],
    // Top (+Y)
    [3, 6, 2],
    [3, 7, 6],
    // Left (-X)
    [0, 4, 7],
    [0, 7, 3],
    // Right (+X)
    [1, 2, 6],
    [1, 6, 5],
];

pub const VERTICES_PER_CUBE: usize = CUBE_CORNERS.len();
pub const TRIANGLES_PER_CUBE: usize = CUBE_TRIANGLES.len();

/// Flat vertex-colored triangle mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombinedMesh {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub colors: Vec<Rgba>,
    pub indices: Vec<[u32; 3]>,
}

impl CombinedMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.is_empty()
    }

    /// Component-wise min and max over all positions
    pub fn position_bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        let mut iter = self.positions.iter().map(|p| Vec3::from_array(*p));
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some((min.to_array(), max.to_array()))
    }

    /// Recompute per-vertex normals from the triangles
    ///
    /// Each vertex gets the normalized sum of its incident face normals,
    /// weighted by the corner angle the face makes at that vertex.
    pub fn compute_normals(&mut self) {
        let mut accum = vec![Vec3::ZERO; self.positions.len()];

        for tri in &self.indices {
            let p = tri.map(|i| Vec3::from_array(self.positions[i as usize]));
            let normal = (p[1] - p[0]).cross(p[2] - p[0]).normalize_or_zero();
            if normal == Vec3::ZERO {
                continue;
            }

            for corner in 0..3 {
                let here = p[corner];
                let next = p[(corner + 1) % 3];
                let prev = p[(corner + 2) % 3];
                let angle = (next - here).angle_between(prev - here);
                if angle.is_finite() {
                    accum[tri[corner] as usize] += normal * angle;
                }
            }
        }

        self.normals = accum
            .into_iter()
            .map(|n| n.normalize_or_zero().to_array())
            .collect();
    }
}

/// Corners of one cube centered at `center` with the given half extent
pub fn cube_corners(center: Vec3, half_extent: f32) -> [[f32; 3]; 8] {
    CUBE_CORNERS.map(|c| (Vec3::from_array(c) * half_extent + center).to_array())
}

/// Expand voxel records into one combined cube mesh
///
/// Each cube has half extent `voxel_size * (0.5 - gap / 2)`, so `gap = 0`
/// makes neighbouring cubes share faces exactly. Returns `None` when there
/// are no voxels.
pub fn build_mesh(voxels: &[VoxelRecord], voxel_size: f32, gap: f32) -> Option<CombinedMesh> {
    if voxels.is_empty() {
        return None;
    }

    let half_extent = voxel_size * (0.5 - gap / 2.0);
    let count = voxels.len();

    let mut mesh = CombinedMesh {
        positions: Vec::with_capacity(count * VERTICES_PER_CUBE),
        normals: Vec::new(),
        colors: Vec::with_capacity(count * VERTICES_PER_CUBE),
        indices: Vec::with_capacity(count * TRIANGLES_PER_CUBE),
    };

    for (i, voxel) in voxels.iter().enumerate() {
        let base = (i * VERTICES_PER_CUBE) as u32;

        mesh.positions.extend_from_slice(&cube_corners(voxel.center, half_extent));
        mesh.colors.extend(std::iter::repeat(voxel.color).take(VERTICES_PER_CUBE));
        mesh.indices.extend(CUBE_TRIANGLES.iter().map(|tri| tri.map(|v| v + base)));
    }

    mesh.compute_normals();
    Some(mesh)
}
