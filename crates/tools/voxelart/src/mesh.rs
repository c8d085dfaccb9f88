//! Source mesh model consumed by the voxelizer
//!
//! A [`Mesh`] is a triangle soup with optional appearance attributes. Which
//! attributes are actually usable is decided once per mesh by
//! [`Mesh::attributes`], so the color resolver only branches on plain flags.

use crate::geometry::Aabb;
use crate::types::{Result, Rgba, VoxelArtError};
use glam::{Mat4, Vec2, Vec3};
use image::DynamicImage;
use std::sync::Arc;

/// Surface material of a source mesh
#[derive(Debug, Clone, Default)]
pub struct Material {
    /// Material name from the source file
    pub name: Option<String>,
    /// PBR base color factor (RGBA, normalized or 0-255)
    pub base_color_factor: Option<[f32; 4]>,
    /// Diffuse color (RGB, normalized or 0-255)
    pub diffuse_factor: Option<[f32; 3]>,
    /// Base color texture, shared between meshes using the same material
    pub base_color_texture: Option<Arc<DynamicImage>>,
}

impl Material {
    /// Create an empty material
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the material name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the PBR base color factor
    pub fn with_base_color(mut self, factor: [f32; 4]) -> Self {
        self.base_color_factor = Some(factor);
        self
    }

    /// Set the diffuse color
    pub fn with_diffuse(mut self, factor: [f32; 3]) -> Self {
        self.diffuse_factor = Some(factor);
        self
    }

    /// Bind a base color texture
    pub fn with_texture(mut self, image: impl Into<Arc<DynamicImage>>) -> Self {
        self.base_color_texture = Some(image.into());
        self
    }

    /// Texture if it has at least one pixel
    pub fn texture(&self) -> Option<&DynamicImage> {
        self.base_color_texture
            .as_deref()
            .filter(|img| img.width() > 0 && img.height() > 0)
    }
}

/// Which appearance attributes of a mesh are present and consistent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeshAttributes {
    pub has_uv: bool,
    pub has_texture: bool,
    pub has_vertex_colors: bool,
    pub has_face_colors: bool,
    pub has_material_color: bool,
}

/// Triangle mesh with optional UVs, colors and material
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub name: Option<String>,
    pub vertices: Vec<Vec3>,
    pub faces: Vec<[u32; 3]>,
    pub uvs: Option<Vec<Vec2>>,
    pub vertex_colors: Option<Vec<Rgba>>,
    pub face_colors: Option<Vec<Rgba>>,
    pub material: Option<Material>,
}

impl Mesh {
    /// Create a mesh from positions and triangle indices
    pub fn new(vertices: Vec<Vec3>, faces: Vec<[u32; 3]>) -> Self {
        Self {
            vertices,
            faces,
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach per-vertex texture coordinates
    pub fn with_uvs(mut self, uvs: Vec<Vec2>) -> Self {
        self.uvs = Some(uvs);
        self
    }

    /// Attach per-vertex RGBA colors
    pub fn with_vertex_colors(mut self, colors: Vec<Rgba>) -> Self {
        self.vertex_colors = Some(colors);
        self
    }

    /// Attach per-face RGBA colors
    pub fn with_face_colors(mut self, colors: Vec<Rgba>) -> Self {
        self.face_colors = Some(colors);
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = Some(material);
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Detect the appearance attributes once
    ///
    /// Per-vertex and per-face arrays only count when their length matches
    /// the geometry they annotate.
    pub fn attributes(&self) -> MeshAttributes {
        let vertex_count = self.vertices.len();
        let material = self.material.as_ref();

        MeshAttributes {
            has_uv: self
                .uvs
                .as_ref()
                .is_some_and(|uvs| !uvs.is_empty() && uvs.len() == vertex_count),
            has_texture: material.and_then(Material::texture).is_some(),
            has_vertex_colors: self
                .vertex_colors
                .as_ref()
                .is_some_and(|c| !c.is_empty() && c.len() == vertex_count),
            has_face_colors: self
                .face_colors
                .as_ref()
                .is_some_and(|c| !c.is_empty() && c.len() == self.faces.len()),
            has_material_color: material
                .is_some_and(|m| m.base_color_factor.is_some() || m.diffuse_factor.is_some()),
        }
    }

    /// Check that every face index is in range and every vertex is finite
    pub fn validate(&self) -> Result<()> {
        if let Some(i) = self.vertices.iter().position(|v| !v.is_finite()) {
            return Err(VoxelArtError::InvalidMesh(format!(
                "vertex {} is not finite",
                i
            )));
        }

        let vertex_count = self.vertices.len();
        for (face_id, face) in self.faces.iter().enumerate() {
            if let Some(&index) = face.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(VoxelArtError::InvalidMesh(format!(
                    "face {} references vertex {} but mesh has {} vertices",
                    face_id, index, vertex_count
                )));
            }
        }

        Ok(())
    }

    /// Axis-aligned bounds of all vertices, `None` for an empty mesh
    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(self.vertices.iter().copied())
    }

    /// The three corner positions of a face, `None` if out of range
    pub fn triangle(&self, face_id: usize) -> Option<[Vec3; 3]> {
        let [a, b, c] = *self.faces.get(face_id)?;
        Some([
            *self.vertices.get(a as usize)?,
            *self.vertices.get(b as usize)?,
            *self.vertices.get(c as usize)?,
        ])
    }

    /// Copy of this mesh with `transform` applied to every vertex
    pub fn transformed(&self, transform: &Mat4) -> Mesh {
        let mut mesh = self.clone();
        for vertex in &mut mesh.vertices {
            *vertex = transform.transform_point3(*vertex);
        }
        mesh
    }
}

/// A mesh placed in a scene graph by a world transform
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub mesh: Mesh,
    pub transform: Mat4,
}

impl SceneNode {
    pub fn new(mesh: Mesh, transform: Mat4) -> Self {
        Self { mesh, transform }
    }
}

/// Bake node transforms into independent meshes
///
/// Meshes are kept separate rather than concatenated so each keeps its own
/// material and texture.
pub fn flatten_scene(nodes: &[SceneNode]) -> Vec<Mesh> {
    nodes
        .iter()
        .map(|node| node.mesh.transformed(&node.transform))
        .collect()
}
