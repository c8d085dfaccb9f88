//! glTF / GLB scene loading
//!
//! The default scene is walked from its root nodes, accumulating world
//! transforms down the hierarchy. Every triangle primitive becomes its own
//! [`SceneNode`] carrying the PBR base color factor and base color texture of
//! its material. [`load_gltf`] bakes the transforms with [`flatten_scene`].

use crate::mesh::{flatten_scene, Material, Mesh, SceneNode};
use crate::types::{Result, Rgba, VoxelArtError};
use glam::{Mat4, Vec2, Vec3};
use gltf::image::Format;
use gltf::mesh::Mode;
use image::{DynamicImage, GrayAlphaImage, GrayImage, RgbImage, RgbaImage};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

type Textures = [Option<Arc<DynamicImage>>];

/// Load the default scene of a `.gltf` or `.glb` file as placed meshes
pub fn load_gltf_scene(path: impl AsRef<Path>) -> Result<Vec<SceneNode>> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(VoxelArtError::Load(format!(
            "file not found: {}",
            path.display()
        )));
    }

    let (document, buffers, images) = gltf::import(path)?;
    let textures: Vec<_> = images.into_iter().map(convert_image).collect();

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| VoxelArtError::Load(format!("no scene in {}", path.display())))?;

    let mut nodes = Vec::new();
    for node in scene.nodes() {
        collect_node(&node, Mat4::IDENTITY, &buffers, &textures, &mut nodes);
    }

    info!(
        "Loaded {} primitives ({} textures) from {}",
        nodes.len(),
        textures.iter().flatten().count(),
        path.display()
    );

    Ok(nodes)
}

/// Load a `.gltf` or `.glb` file with node transforms baked into the meshes
pub fn load_gltf(path: impl AsRef<Path>) -> Result<Vec<Mesh>> {
    Ok(flatten_scene(&load_gltf_scene(path)?))
}

fn collect_node(
    node: &gltf::Node,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    textures: &Textures,
    out: &mut Vec<SceneNode>,
) {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        let mesh_name = mesh.name().or(node.name()).unwrap_or("mesh").to_string();
        for primitive in mesh.primitives() {
            let name = format!("{}.{}", mesh_name, primitive.index());
            match convert_primitive(&primitive, buffers, textures) {
                Some(converted) => out.push(SceneNode::new(converted.with_name(name), world)),
                None => warn!("Skipping primitive {}: not a readable triangle list", name),
            }
        }
    }

    for child in node.children() {
        collect_node(&child, world, buffers, textures, out);
    }
}

fn convert_primitive(
    primitive: &gltf::Primitive,
    buffers: &[gltf::buffer::Data],
    textures: &Textures,
) -> Option<Mesh> {
    if primitive.mode() != Mode::Triangles {
        return None;
    }

    let reader =
        primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));

    let vertices: Vec<Vec3> = reader.read_positions()?.map(Vec3::from_array).collect();
    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..vertices.len() as u32).collect(),
    };
    let faces: Vec<[u32; 3]> = indices
        .chunks_exact(3)
        .map(|f| [f[0], f[1], f[2]])
        .collect();

    let mut mesh = Mesh::new(vertices, faces);
    let mut uv_set = 0;

    let material = primitive.material();
    if material.index().is_some() {
        let pbr = material.pbr_metallic_roughness();
        let mut converted = Material::new().with_base_color(pbr.base_color_factor());
        if let Some(name) = material.name() {
            converted = converted.with_name(name);
        }
        if let Some(info) = pbr.base_color_texture() {
            uv_set = info.tex_coord();
            let source = info.texture().source().index();
            if let Some(Some(texture)) = textures.get(source) {
                converted = converted.with_texture(Arc::clone(texture));
            }
        }
        mesh = mesh.with_material(converted);
    }

    if let Some(uvs) = reader.read_tex_coords(uv_set) {
        mesh = mesh.with_uvs(uvs.into_f32().map(Vec2::from_array).collect());
    }
    if let Some(colors) = reader.read_colors(0) {
        let colors: Vec<Rgba> = colors.into_rgba_u8().collect();
        mesh = mesh.with_vertex_colors(colors);
    }

    debug!(
        "Primitive {}: {} vertices, {} faces",
        primitive.index(),
        mesh.vertex_count(),
        mesh.face_count()
    );

    Some(mesh)
}

fn convert_image(data: gltf::image::Data) -> Option<Arc<DynamicImage>> {
    let (width, height) = (data.width, data.height);
    let pixels = data.pixels;

    let image = match data.format {
        Format::R8 => GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8),
        Format::R8G8 => {
            GrayAlphaImage::from_raw(width, height, pixels).map(DynamicImage::ImageLumaA8)
        }
        Format::R8G8B8 => RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8),
        Format::R8G8B8A8 => {
            RgbaImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgba8)
        }
        other => {
            warn!("Unsupported texture format {:?}", other);
            return None;
        }
    };

    if image.is_none() {
        warn!("Texture data does not match its {}x{} size", width, height);
    }
    image.map(Arc::new)
}
