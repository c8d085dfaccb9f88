//! Surface voxelization on a grid shared by every input mesh
//!
//! All meshes of one conversion are rasterized into a single isotropic grid
//! whose origin and pitch come from the union of their bounds. Cell centers
//! are always derived from the grid itself, so cells contributed by
//! different meshes line up exactly.
//!
//! ## Algorithm
//!
//! 1. Union the bounds of all meshes and pad them on every side
//! 2. `voxel_size = longest padded axis / resolution`
//! 3. For each mesh, register every face in each cell its surface overlaps
//! 4. For each occupied cell, find the closest surface point to the cell
//!    center among faces registered in the surrounding 3x3x3 block
//! 5. Resolve the color at that point; the first mesh to claim a cell keeps it

use crate::color::ColorResolver;
use crate::config::ConvertConfig;
use crate::geometry::{closest_point_on_triangle, triangle_intersects_box, Aabb};
use crate::mesh::Mesh;
use crate::types::{Result, VoxelArtError, VoxelRecord};
use glam::{IVec3, Vec3};
use std::collections::HashMap;
use tracing::{debug, info, warn};

// =============================================================================
// Grid Definition
// =============================================================================

/// Relative slack on cell half extents so faces lying exactly on a cell
/// boundary still register despite rounding
const TOUCH_EPSILON: f32 = 1e-4;

/// Isotropic voxel grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelGrid {
    /// Minimum corner of cell (0, 0, 0)
    pub origin: Vec3,
    /// Edge length of one cell
    pub voxel_size: f32,
    /// Number of cells along each axis
    pub dims: IVec3,
}

impl VoxelGrid {
    /// Create a grid from an origin, a strictly positive pitch and a cell count
    pub fn new(origin: Vec3, voxel_size: f32, dims: IVec3) -> Result<Self> {
        if !(voxel_size.is_finite() && voxel_size > 0.0) || !origin.is_finite() {
            return Err(VoxelArtError::DegenerateBounds(voxel_size));
        }
        if dims.min_element() < 1 {
            return Err(VoxelArtError::InvalidConfig(format!(
                "grid needs at least one cell per axis, got {}",
                dims
            )));
        }
        Ok(Self {
            origin,
            voxel_size,
            dims,
        })
    }

    /// Fit a grid to `bounds` padded by `padding_ratio` of its longest axis
    ///
    /// `resolution` is the number of cells along the longest padded axis.
    pub fn from_bounds(bounds: &Aabb, resolution: u32, padding_ratio: f32) -> Result<Self> {
        if resolution == 0 {
            return Err(VoxelArtError::InvalidConfig(
                "resolution must be at least 1".to_string(),
            ));
        }

        let padding = bounds.max_extent() * padding_ratio;
        let padded = bounds.expanded(padding);
        let extent = padded.max_extent();
        if !(extent.is_finite() && extent > 0.0) {
            return Err(VoxelArtError::DegenerateBounds(extent));
        }

        let voxel_size = extent / resolution as f32;
        let mut dims = (padded.size() / voxel_size - Vec3::splat(TOUCH_EPSILON))
            .ceil()
            .max(Vec3::ONE)
            .as_ivec3();
        // The longest axis spans exactly `resolution` cells
        let size = padded.size();
        let longest = (0..3)
            .reduce(|best, axis| if size[axis] > size[best] { axis } else { best })
            .unwrap_or(0);
        dims[longest] = resolution as i32;

        Self::new(padded.min, voxel_size, dims)
    }

    /// Fit a grid to the union of all non-empty meshes
    pub fn for_meshes<'a>(
        meshes: impl IntoIterator<Item = &'a Mesh>,
        resolution: u32,
        padding_ratio: f32,
    ) -> Result<Self> {
        let bounds = meshes
            .into_iter()
            .filter_map(Mesh::bounds)
            .reduce(|acc, b| acc.union(&b))
            .ok_or(VoxelArtError::EmptyVoxelization)?;

        Self::from_bounds(&bounds, resolution, padding_ratio)
    }

    /// Integer key of the cell containing `point`
    pub fn key(&self, point: Vec3) -> IVec3 {
        ((point - self.origin) / self.voxel_size).floor().as_ivec3()
    }

    /// Key of the last cell whose interior reaches `point`
    ///
    /// Same as [`VoxelGrid::key`] except on a cell boundary, where it returns
    /// the cell below instead of the one that is only touched.
    pub fn upper_key(&self, point: Vec3) -> IVec3 {
        (((point - self.origin) / self.voxel_size).ceil() - Vec3::ONE).as_ivec3()
    }

    /// Clamp a key into the cells covered by the grid
    pub fn clamp_key(&self, key: IVec3) -> IVec3 {
        key.clamp(IVec3::ZERO, self.dims - IVec3::ONE)
    }

    /// World-space center of a cell
    pub fn center(&self, key: IVec3) -> Vec3 {
        self.origin + key.as_vec3() * self.voxel_size + Vec3::splat(self.voxel_size * 0.5)
    }

    /// World-space bounds of a cell
    pub fn cell_bounds(&self, key: IVec3) -> Aabb {
        let min = self.origin + key.as_vec3() * self.voxel_size;
        Aabb::new(min, min + Vec3::splat(self.voxel_size))
    }
}

// =============================================================================
// Surface Sampling
// =============================================================================

/// Output of [`voxelize`]
#[derive(Debug, Clone)]
pub struct Voxelization {
    /// Unique occupied cells in insertion order
    pub voxels: Vec<VoxelRecord>,
    pub grid: VoxelGrid,
    /// Meshes skipped because they failed validation
    pub skipped_meshes: usize,
}

impl Voxelization {
    pub fn voxel_size(&self) -> f32 {
        self.grid.voxel_size
    }

    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }
}

/// Cells overlapped by a mesh surface, each with the faces crossing it
///
/// Face lists are in ascending face order.
pub fn surface_cells(mesh: &Mesh, grid: &VoxelGrid) -> HashMap<IVec3, Vec<u32>> {
    let half_extent = Vec3::splat(grid.voxel_size * 0.5 * (1.0 + TOUCH_EPSILON));
    let mut cells: HashMap<IVec3, Vec<u32>> = HashMap::new();

    for face_id in 0..mesh.faces.len() {
        let Some(triangle) = mesh.triangle(face_id) else {
            continue;
        };

        let lo = grid.clamp_key(grid.key(triangle[0].min(triangle[1]).min(triangle[2])));
        let hi = grid
            .clamp_key(grid.upper_key(triangle[0].max(triangle[1]).max(triangle[2])))
            .max(lo);

        for z in lo.z..=hi.z {
            for y in lo.y..=hi.y {
                for x in lo.x..=hi.x {
                    let key = IVec3::new(x, y, z);
                    if triangle_intersects_box(grid.center(key), half_extent, triangle) {
                        cells.entry(key).or_default().push(face_id as u32);
                    }
                }
            }
        }
    }

    cells
}

/// Closest surface point to `point` among faces registered around `key`
///
/// Any face overlapping cell `key` is within half a cell diagonal of the
/// center, while faces outside the 3x3x3 block are at least 1.5 cells away,
/// so the search is exact for cell centers.
fn nearest_surface_point(
    mesh: &Mesh,
    cells: &HashMap<IVec3, Vec<u32>>,
    key: IVec3,
    point: Vec3,
) -> Option<(Vec3, usize)> {
    let mut best: Option<(Vec3, usize, f32)> = None;

    for dz in -1..=1 {
        for dy in -1..=1 {
            for dx in -1..=1 {
                let Some(faces) = cells.get(&(key + IVec3::new(dx, dy, dz))) else {
                    continue;
                };
                for &face_id in faces {
                    let Some([a, b, c]) = mesh.triangle(face_id as usize) else {
                        continue;
                    };
                    let candidate = closest_point_on_triangle(point, a, b, c);
                    let distance = point.distance_squared(candidate);
                    if best.map_or(true, |(_, _, d)| distance < d) {
                        best = Some((candidate, face_id as usize, distance));
                    }
                }
            }
        }
    }

    best.map(|(p, face_id, _)| (p, face_id))
}

/// Voxelize one mesh into `voxels`, skipping cells already claimed
///
/// Returns the number of new cells inserted.
fn voxelize_mesh_into(
    mesh: &Mesh,
    grid: &VoxelGrid,
    quantization: u32,
    index: &mut HashMap<IVec3, usize>,
    voxels: &mut Vec<VoxelRecord>,
) -> usize {
    let cells = surface_cells(mesh, grid);
    let resolver = ColorResolver::new(mesh).with_quantization(quantization);

    let mut keys: Vec<IVec3> = cells.keys().copied().collect();
    keys.sort_unstable_by_key(|k| (k.z, k.y, k.x));

    let mut inserted = 0;
    for key in keys {
        if index.contains_key(&key) {
            continue;
        }

        let center = grid.center(key);
        let color = match nearest_surface_point(mesh, &cells, key, center) {
            Some((point, face_id)) => resolver.resolve(point, face_id),
            None => resolver.resolve(center, usize::MAX),
        };

        index.insert(key, voxels.len());
        voxels.push(VoxelRecord {
            grid_key: key,
            center,
            color,
        });
        inserted += 1;
    }

    inserted
}

// =============================================================================
// Multi-Mesh Voxelization
// =============================================================================

/// Voxelize meshes into one shared grid
///
/// Meshes are processed in input order and the first mesh to occupy a cell
/// owns it. Meshes that fail validation are logged and skipped. An empty
/// result is an error.
pub fn voxelize(meshes: &[Mesh], config: &ConvertConfig) -> Result<Voxelization> {
    config.validate()?;

    let mut skipped_meshes = 0;
    let valid: Vec<(usize, &Mesh)> = meshes
        .iter()
        .enumerate()
        .filter(|(i, mesh)| match mesh.validate() {
            Ok(()) => true,
            Err(e) => {
                warn!("Mesh {} failed voxelization: {}", i + 1, e);
                skipped_meshes += 1;
                false
            }
        })
        .collect();

    let grid = VoxelGrid::for_meshes(
        valid.iter().map(|(_, mesh)| *mesh),
        config.resolution,
        config.padding_ratio,
    )?;
    info!("Voxel size: {:.6}", grid.voxel_size);

    let mut index: HashMap<IVec3, usize> = HashMap::new();
    let mut voxels = Vec::new();

    for (i, mesh) in valid {
        let inserted = voxelize_mesh_into(
            mesh,
            &grid,
            config.color_quantization,
            &mut index,
            &mut voxels,
        );
        debug!(
            "Mesh {} ({}): {} verts, {} faces, {} new voxels",
            i + 1,
            mesh.name.as_deref().unwrap_or("unnamed"),
            mesh.vertex_count(),
            mesh.face_count(),
            inserted
        );
    }

    if voxels.is_empty() {
        return Err(VoxelArtError::EmptyVoxelization);
    }
    info!("Generated {} unique voxels", voxels.len());

    Ok(Voxelization {
        voxels,
        grid,
        skipped_meshes,
    })
}
