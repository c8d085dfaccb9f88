//! Surface color resolution
//!
//! Given a point on a mesh face, resolve an RGBA color from the richest
//! attribute the mesh carries. Tiers are tried in order and the first one
//! that yields a color wins:
//!
//! 1. Base color texture sampled at the interpolated UV
//! 2. Interpolated vertex colors
//! 3. Face color
//! 4. Material base color or diffuse factor
//! 5. [`DEFAULT_COLOR`]
//!
//! Every tier returns `Option<Rgba>`; a missing or malformed attribute just
//! moves resolution on to the next tier, so resolving never fails.

use crate::mesh::{Material, Mesh, MeshAttributes};
use crate::types::Rgba;
use glam::{DVec3, Vec2, Vec3};
use image::{DynamicImage, GenericImageView};

/// Neutral gray used when a mesh carries no usable color source
pub const DEFAULT_COLOR: Rgba = [180, 180, 180, 255];

/// Denominator threshold below which a triangle counts as degenerate
const DEGENERATE_EPSILON: f64 = 1e-10;

/// Barycentric weights `(w, u, v)` of `point` against triangle `a, b, c`
///
/// `w` weighs `a`, `u` weighs `b` and `v` weighs `c`; the three always sum
/// to 1. Degenerate triangles yield equal weights.
pub fn barycentric(point: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let a = a.as_dvec3();
    let ab = b.as_dvec3() - a;
    let ac = c.as_dvec3() - a;
    let ap = point.as_dvec3() - a;

    let dot00 = ab.dot(ab);
    let dot01 = ab.dot(ac);
    let dot02 = ab.dot(ap);
    let dot11 = ac.dot(ac);
    let dot12 = ac.dot(ap);

    let denom = dot00 * dot11 - dot01 * dot01;
    if denom.abs() < DEGENERATE_EPSILON {
        return Vec3::splat(1.0 / 3.0);
    }

    let inv_denom = 1.0 / denom;
    let u = (dot11 * dot02 - dot01 * dot12) * inv_denom;
    let v = (dot00 * dot12 - dot01 * dot02) * inv_denom;
    DVec3::new(1.0 - u - v, u, v).as_vec3()
}

/// Clamp weights into [0, 1] and rescale them to sum to 1
fn normalize_weights(weights: Vec3) -> Vec3 {
    let clamped = weights.clamp(Vec3::ZERO, Vec3::ONE);
    let sum = clamped.element_sum();
    if sum <= f32::EPSILON {
        Vec3::splat(1.0 / 3.0)
    } else {
        clamped / sum
    }
}

/// Posterize the RGB channels to multiples of `level`
///
/// Levels of 0 or 1 leave the color unchanged. Alpha is never touched.
pub fn quantize(color: Rgba, level: u32) -> Rgba {
    if level <= 1 {
        return color;
    }
    let band = |c: u8| ((c as u32 / level) * level) as u8;
    [band(color[0]), band(color[1]), band(color[2]), color[3]]
}

/// Convert a color factor to RGBA bytes
///
/// Factors whose components are all within [0, 1] are treated as normalized
/// and scaled by 255; anything else is taken as already being in byte range.
/// Missing alpha is opaque.
pub fn factor_to_rgba(factor: &[f32]) -> Option<Rgba> {
    if factor.len() < 3 || factor.iter().any(|c| !c.is_finite()) {
        return None;
    }
    let normalized = factor.iter().all(|&c| c <= 1.0);
    let scale = if normalized { 255.0 } else { 1.0 };
    let channel = |c: f32| (c * scale).clamp(0.0, 255.0) as u8;

    Some([
        channel(factor[0]),
        channel(factor[1]),
        channel(factor[2]),
        factor.get(3).map_or(255, |&a| channel(a)),
    ])
}

/// Read a pixel at UV coordinates
///
/// UVs wrap (tiling) and V is flipped so that `v = 1` addresses the top row
/// of the image.
pub fn sample_image(image: &DynamicImage, uv: Vec2) -> Option<Rgba> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 || !uv.is_finite() {
        return None;
    }

    let u = uv.x.rem_euclid(1.0);
    let v = uv.y.rem_euclid(1.0);

    let px = ((u * (width - 1) as f32) as u32).min(width - 1);
    let py = (((1.0 - v) * (height - 1) as f32) as u32).min(height - 1);

    Some(image.get_pixel(px, py).0)
}

/// Color resolver bound to a single mesh
///
/// Attribute flags are detected once on construction and reused for every
/// query against the same mesh.
#[derive(Debug, Clone, Copy)]
pub struct ColorResolver<'a> {
    mesh: &'a Mesh,
    attributes: MeshAttributes,
    quantization: u32,
}

impl<'a> ColorResolver<'a> {
    pub fn new(mesh: &'a Mesh) -> Self {
        Self {
            mesh,
            attributes: mesh.attributes(),
            quantization: 1,
        }
    }

    /// Set the channel banding divisor applied after resolution
    pub fn with_quantization(mut self, level: u32) -> Self {
        self.quantization = level;
        self
    }

    /// Resolve the color of `point` lying on face `face_id`
    pub fn resolve(&self, point: Vec3, face_id: usize) -> Rgba {
        let color = self.resolve_unquantized(point, face_id);
        quantize(color, self.quantization)
    }

    fn resolve_unquantized(&self, point: Vec3, face_id: usize) -> Rgba {
        let Some(face) = self.mesh.faces.get(face_id).copied() else {
            return DEFAULT_COLOR;
        };
        let Some([a, b, c]) = self.mesh.triangle(face_id) else {
            return DEFAULT_COLOR;
        };
        let weights = barycentric(point, a, b, c);

        self.texture_color(face, weights)
            .or_else(|| self.vertex_color(face, weights))
            .or_else(|| self.face_color(face_id))
            .or_else(|| self.material_color())
            .unwrap_or(DEFAULT_COLOR)
    }

    fn texture_color(&self, face: [u32; 3], weights: Vec3) -> Option<Rgba> {
        if !self.attributes.has_uv || !self.attributes.has_texture {
            return None;
        }
        let image = self.mesh.material.as_ref().and_then(Material::texture)?;
        let uvs = self.mesh.uvs.as_ref()?;

        let weights = normalize_weights(weights);
        let uv = *uvs.get(face[0] as usize)? * weights.x
            + *uvs.get(face[1] as usize)? * weights.y
            + *uvs.get(face[2] as usize)? * weights.z;

        sample_image(image, uv)
    }

    fn vertex_color(&self, face: [u32; 3], weights: Vec3) -> Option<Rgba> {
        if !self.attributes.has_vertex_colors {
            return None;
        }
        let colors = self.mesh.vertex_colors.as_ref()?;
        let c0 = colors.get(face[0] as usize)?;
        let c1 = colors.get(face[1] as usize)?;
        let c2 = colors.get(face[2] as usize)?;

        let mut out = [0u8; 4];
        for (i, channel) in out.iter_mut().enumerate() {
            let value = c0[i] as f32 * weights.x
                + c1[i] as f32 * weights.y
                + c2[i] as f32 * weights.z;
            *channel = value.round().clamp(0.0, 255.0) as u8;
        }
        Some(out)
    }

    fn face_color(&self, face_id: usize) -> Option<Rgba> {
        if !self.attributes.has_face_colors {
            return None;
        }
        self.mesh.face_colors.as_ref()?.get(face_id).copied()
    }

    fn material_color(&self) -> Option<Rgba> {
        if !self.attributes.has_material_color {
            return None;
        }
        let material = self.mesh.material.as_ref()?;
        material
            .base_color_factor
            .as_ref()
            .and_then(|f| factor_to_rgba(f))
            .or_else(|| material.diffuse_factor.as_ref().and_then(|f| factor_to_rgba(f)))
    }
}

/// Resolve a single color without quantization
pub fn resolve_color(mesh: &Mesh, point: Vec3, face_id: usize) -> Rgba {
    ColorResolver::new(mesh).resolve(point, face_id)
}
